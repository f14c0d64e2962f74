// Method dispatcher: one case-folded table from Bot-API method name to
// handler. Handlers parse their arguments, transform them into native-client
// functions and attach the continuation that answers the HTTP query.

/// The parse-then-answer shape every handler follows: extractors return
/// `Result`, the first error answers the query and bails out.
macro_rules! try_parse {
    ($query:ident, $expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(error) => {
                let mut $query = $query;
                $query.answer_error(&error);
                return;
            }
        }
    };
}
pub(crate) use try_parse;

pub(crate) mod args;
mod chats;
mod files;
mod inline;
mod messages;
mod settings_api;
mod stickers;
mod updates_api;

use crate::client::Client;
use crate::error::ApiError;
use crate::query::Query;
use crate::td;

pub type Handler = fn(&mut Client, Query);

/// Generic response translation for passthrough methods.
pub(crate) fn object_to_value(
    client: &mut Client,
    object: td::Object,
) -> Result<serde_json::Value, ApiError> {
    Ok(match object {
        td::Object::Ok => serde_json::Value::Bool(true),
        td::Object::Message(message) => {
            let info = crate::models::MessageInfo::from_td(&message);
            crate::render::message_json(client, &info)
        }
        td::Object::Messages(messages) => serde_json::Value::Array(
            messages
                .into_iter()
                .flatten()
                .map(|message| {
                    let info = crate::models::MessageInfo::from_td(&message);
                    crate::render::message_json(client, &info)
                })
                .collect(),
        ),
        td::Object::User(user) => crate::render::td_user_json(&user),
        td::Object::Chat(chat) => crate::render::chat_full_json(client, chat.id),
        td::Object::StickerSet(set) => crate::render::sticker_set_json(client, &set),
        td::Object::File(file) => {
            crate::render::file_json(&client.settings, client.bot_user_id, &file)
        }
        td::Object::BusinessConnection(connection) => {
            crate::render::business_connection_json(&connection)
        }
        td::Object::Text(text) => serde_json::Value::String(text),
        td::Object::HttpUrl(url) => serde_json::Value::String(url),
        td::Object::Count(count) => serde_json::json!(count),
        td::Object::Raw(value) => value,
    })
}

/// Methods that never load the native client and therefore bypass flood
/// admission and the authorization gate.
pub fn is_local_method(method: &str) -> bool {
    matches!(
        method,
        "close"
            | "logout"
            | "getme"
            | "getupdates"
            | "setwebhook"
            | "deletewebhook"
            | "getwebhookinfo"
    )
}

pub fn dispatch(client: &mut Client, query: Query) {
    match handler_for(&query.method) {
        Some(handler) => handler(client, query),
        None => {
            let mut query = query;
            query.answer_error(&crate::error::ApiError::raw(
                404,
                "Not Found: method not found",
            ));
        }
    }
}

/// The process-wide method table. Method names are matched lower-cased;
/// aliased names map to the same handler.
pub fn handler_for(method: &str) -> Option<Handler> {
    let handler: Handler = match method {
        // Lifecycle and update delivery.
        "getme" => updates_api::get_me,
        "close" => updates_api::close,
        "logout" => updates_api::log_out,
        "getupdates" => updates_api::get_updates,
        "setwebhook" => updates_api::set_webhook,
        "deletewebhook" => updates_api::delete_webhook,
        "getwebhookinfo" => updates_api::get_webhook_info,

        // Messages.
        "sendmessage" => messages::send_message,
        "sendphoto" => messages::send_photo,
        "sendaudio" => messages::send_audio,
        "senddocument" => messages::send_document,
        "sendvideo" => messages::send_video,
        "sendanimation" => messages::send_animation,
        "sendvoice" => messages::send_voice,
        "sendvideonote" => messages::send_video_note,
        "sendsticker" => messages::send_sticker,
        "sendlocation" => messages::send_location,
        "sendvenue" => messages::send_venue,
        "sendcontact" => messages::send_contact,
        "senddice" => messages::send_dice,
        "sendgame" => messages::send_game,
        "sendinvoice" => messages::send_invoice,
        "sendpoll" => messages::send_poll,
        "sendmediagroup" => messages::send_media_group,
        "sendchataction" => messages::send_chat_action,
        "forwardmessage" => messages::forward_message,
        "forwardmessages" => messages::forward_messages,
        "copymessage" => messages::copy_message,
        "copymessages" => messages::copy_messages,
        "editmessagetext" => messages::edit_message_text,
        "editmessagemedia" => messages::edit_message_media,
        "editmessagecaption" => messages::edit_message_caption,
        "editmessagereplymarkup" => messages::edit_message_reply_markup,
        "deletemessage" => messages::delete_message,
        "deletemessages" => messages::delete_messages,
        "stoppoll" => messages::stop_poll,
        "setmessagereaction" => messages::set_message_reaction,

        // Chat administration.
        "getchat" => chats::get_chat,
        "setchatphoto" => chats::set_chat_photo,
        "deletechatphoto" => chats::delete_chat_photo,
        "setchattitle" => chats::set_chat_title,
        "setchatdescription" => chats::set_chat_description,
        "setchatpermissions" => chats::set_chat_permissions,
        "pinchatmessage" => chats::pin_chat_message,
        "unpinchatmessage" => chats::unpin_chat_message,
        "unpinallchatmessages" => chats::unpin_all_chat_messages,
        "setchatstickerset" => chats::set_chat_sticker_set,
        "deletechatstickerset" => chats::delete_chat_sticker_set,
        "leavechat" => chats::leave_chat,
        "exportchatinvitelink" => chats::export_chat_invite_link,
        "createchatinvitelink" => chats::create_chat_invite_link,
        "editchatinvitelink" => chats::edit_chat_invite_link,
        "revokechatinvitelink" => chats::revoke_chat_invite_link,
        "approvechatjoinrequest" => chats::approve_chat_join_request,
        "declinechatjoinrequest" => chats::decline_chat_join_request,
        "getchatmember" => chats::get_chat_member,
        "getchatadministrators" => chats::get_chat_administrators,
        "getchatmembercount" | "getchatmemberscount" => chats::get_chat_member_count,
        "promotechatmember" => chats::promote_chat_member,
        "restrictchatmember" => chats::restrict_chat_member,
        "banchatmember" | "kickchatmember" => chats::ban_chat_member,
        "unbanchatmember" => chats::unban_chat_member,
        "banchatsenderchat" => chats::ban_chat_sender_chat,
        "unbanchatsenderchat" => chats::unban_chat_sender_chat,
        "getuserchatboosts" => chats::get_user_chat_boosts,
        "createforumtopic" => chats::create_forum_topic,
        "editforumtopic" => chats::edit_forum_topic,
        "closeforumtopic" => chats::close_forum_topic,
        "reopenforumtopic" => chats::reopen_forum_topic,
        "deleteforumtopic" => chats::delete_forum_topic,
        "unpinallforumtopicmessages" => chats::unpin_all_forum_topic_messages,
        "editgeneralforumtopic" => chats::edit_general_forum_topic,
        "closegeneralforumtopic" => chats::close_general_forum_topic,
        "reopengeneralforumtopic" => chats::reopen_general_forum_topic,
        "hidegeneralforumtopic" => chats::hide_general_forum_topic,
        "unhidegeneralforumtopic" => chats::unhide_general_forum_topic,
        "unpinallgeneralforumtopicmessages" => chats::unpin_all_general_forum_topic_messages,
        "getforumtopiciconstickers" => chats::get_forum_topic_icon_stickers,

        // Stickers.
        "getstickerset" => stickers::get_sticker_set,
        "getcustomemojistickers" => stickers::get_custom_emoji_stickers,
        "uploadstickerfile" => stickers::upload_sticker_file,
        "createnewstickerset" => stickers::create_new_sticker_set,
        "addstickertoset" => stickers::add_sticker_to_set,
        "replacestickerinset" => stickers::replace_sticker_in_set,
        "setstickerpositioninset" => stickers::set_sticker_position_in_set,
        "deletestickerfromset" => stickers::delete_sticker_from_set,
        "setstickeremojilist" => stickers::set_sticker_emoji_list,
        "setstickerkeywords" => stickers::set_sticker_keywords,
        "setstickermaskposition" => stickers::set_sticker_mask_position,
        "setstickersettitle" => stickers::set_sticker_set_title,
        "setstickersetthumbnail" | "setstickersetthumb" => stickers::set_sticker_set_thumbnail,
        "setcustomemojistickersetthumbnail" => stickers::set_custom_emoji_sticker_set_thumbnail,
        "deletestickerset" => stickers::delete_sticker_set,

        // Inline, payments, games, passport, custom.
        "answerinlinequery" => inline::answer_inline_query,
        "answerwebappquery" => inline::answer_web_app_query,
        "answercallbackquery" => inline::answer_callback_query,
        "answershippingquery" => inline::answer_shipping_query,
        "answerprecheckoutquery" => inline::answer_pre_checkout_query,
        "createinvoicelink" => inline::create_invoice_link,
        "getstartransactions" => inline::get_star_transactions,
        "refundstarpayment" => inline::refund_star_payment,
        "setgamescore" => inline::set_game_score,
        "getgamehighscores" => inline::get_game_high_scores,
        "setpassportdataerrors" => inline::set_passport_data_errors,
        "sendcustomrequest" => inline::send_custom_request,
        "answercustomquery" => inline::answer_custom_query,
        "getbusinessconnection" => inline::get_business_connection,

        // Bot profile and defaults.
        "setmycommands" => settings_api::set_my_commands,
        "getmycommands" => settings_api::get_my_commands,
        "deletemycommands" => settings_api::delete_my_commands,
        "setchatmenubutton" => settings_api::set_chat_menu_button,
        "getchatmenubutton" => settings_api::get_chat_menu_button,
        "setmydefaultadministratorrights" => settings_api::set_my_default_administrator_rights,
        "getmydefaultadministratorrights" => settings_api::get_my_default_administrator_rights,
        "setmyname" => settings_api::set_my_name,
        "getmyname" => settings_api::get_my_name,
        "setmydescription" => settings_api::set_my_description,
        "getmydescription" => settings_api::get_my_description,
        "setmyshortdescription" => settings_api::set_my_short_description,
        "getmyshortdescription" => settings_api::get_my_short_description,

        // Files.
        "getfile" => files::get_file,

        _ => return None,
    };
    Some(handler)
}
