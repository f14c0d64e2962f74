// Message send/edit/delete handlers. Every outbound send funnels through
// the send tracker; reply markups with login-url buttons pass the username
// resolver first.

use serde_json::Value;

use crate::client::Client;
use crate::error::ApiError;
use crate::models::MessageInfo;
use crate::query::Query;
use crate::td;

use super::{args, try_parse};

/// Send options shared by every send* method.
struct SendCommon {
    chat_id: i64,
    message_thread_id: i64,
    business_connection_id: String,
    reply_to: Option<td::ReplyTo>,
    disable_notification: bool,
    protect_content: bool,
    effect_id: i64,
}

fn send_common(query: &Query) -> Result<SendCommon, ApiError> {
    let chat_id = args::chat_id(query)?;
    let message_thread_id = args::integer(query, "message_thread_id")
        .filter(|id| *id > 0)
        .and_then(|id| i32::try_from(id).ok())
        .map(td::message_id::from_client)
        .unwrap_or(0);
    Ok(SendCommon {
        chat_id,
        message_thread_id,
        business_connection_id: args::string(query, "business_connection_id"),
        reply_to: args::reply_to(query, chat_id)?,
        disable_notification: args::boolean(query, "disable_notification"),
        protect_content: args::boolean(query, "protect_content"),
        effect_id: args::integer(query, "message_effect_id").unwrap_or(0),
    })
}

/// Resolve markup usernames, then hand one message to the send tracker.
fn dispatch_send(
    client: &mut Client,
    query: Query,
    common: SendCommon,
    markup: Option<td::ReplyMarkup>,
    content: td::InputMessageContent,
) {
    client.with_resolved_markup(
        query,
        markup,
        Box::new(move |client, query, markup| {
            let function = td::Function::SendMessage {
                chat_id: common.chat_id,
                message_thread_id: common.message_thread_id,
                business_connection_id: common.business_connection_id,
                reply_to: common.reply_to,
                disable_notification: common.disable_notification,
                protect_content: common.protect_content,
                effect_id: common.effect_id,
                reply_markup: markup,
                content,
            };
            client.send_and_track(query, common.chat_id, function, 1, false);
        }),
    );
}

pub fn send_message(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let text = try_parse!(query, args::required_string(&query, "text"));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let link_preview_options = try_parse!(query, args::json_arg(&query, "link_preview_options"))
        .unwrap_or_else(|| {
            serde_json::json!({
                "is_disabled": args::boolean(&query, "disable_web_page_preview")
            })
        });
    let content = td::InputMessageContent::Text {
        text,
        entities: args::text_entities(&query, "entities"),
        link_preview_options,
    };
    dispatch_send(client, query, common, markup, content);
}

fn media_content(
    client: &Client,
    query: &Query,
    field: &str,
) -> Result<td::InputMessageContent, ApiError> {
    let local_mode = client.settings.local_mode;
    let file = args::required_input_file(query, field, local_mode)?;
    let thumbnail = args::thumbnail(query, local_mode)?;
    let caption = args::caption(query);
    let extra = serde_json::json!({});
    Ok(match field {
        "photo" => td::InputMessageContent::Photo {
            file,
            caption,
            extra,
        },
        "audio" => td::InputMessageContent::Audio {
            file,
            thumbnail,
            caption,
            extra,
        },
        "document" => td::InputMessageContent::Document {
            file,
            thumbnail,
            caption,
            extra,
        },
        "video" => td::InputMessageContent::Video {
            file,
            thumbnail,
            caption,
            extra,
        },
        "animation" => td::InputMessageContent::Animation {
            file,
            thumbnail,
            caption,
            extra,
        },
        "voice" => td::InputMessageContent::VoiceNote {
            file,
            caption,
            extra,
        },
        "video_note" => td::InputMessageContent::VideoNote {
            file,
            thumbnail,
            extra,
        },
        _ => unreachable!("unknown media field"),
    })
}

fn send_media(client: &mut Client, query: Query, field: &str) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let content = try_parse!(query, media_content(client, &query, field));
    dispatch_send(client, query, common, markup, content);
}

pub fn send_photo(client: &mut Client, query: Query) {
    send_media(client, query, "photo");
}

pub fn send_audio(client: &mut Client, query: Query) {
    send_media(client, query, "audio");
}

pub fn send_document(client: &mut Client, query: Query) {
    send_media(client, query, "document");
}

pub fn send_video(client: &mut Client, query: Query) {
    send_media(client, query, "video");
}

pub fn send_animation(client: &mut Client, query: Query) {
    send_media(client, query, "animation");
}

pub fn send_voice(client: &mut Client, query: Query) {
    send_media(client, query, "voice");
}

pub fn send_video_note(client: &mut Client, query: Query) {
    send_media(client, query, "video_note");
}

pub fn send_sticker(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let file = try_parse!(
        query,
        args::required_input_file(&query, "sticker", client.settings.local_mode)
    );
    let content = td::InputMessageContent::Sticker {
        file,
        emoji: args::string(&query, "emoji"),
    };
    dispatch_send(client, query, common, markup, content);
}

pub fn send_location(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let latitude = try_parse!(query, args::required_string(&query, "latitude"));
    let longitude = try_parse!(query, args::required_string(&query, "longitude"));
    let mut location = serde_json::json!({
        "latitude": latitude,
        "longitude": longitude,
    });
    for extra in [
        "horizontal_accuracy",
        "live_period",
        "heading",
        "proximity_alert_radius",
    ] {
        if let Some(value) = query.arg(extra) {
            location[extra] = serde_json::json!(value);
        }
    }
    dispatch_send(
        client,
        query,
        common,
        markup,
        td::InputMessageContent::Location(location),
    );
}

pub fn send_venue(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let venue = serde_json::json!({
        "latitude": args::string(&query, "latitude"),
        "longitude": args::string(&query, "longitude"),
        "title": args::string(&query, "title"),
        "address": args::string(&query, "address"),
        "foursquare_id": args::string(&query, "foursquare_id"),
        "google_place_id": args::string(&query, "google_place_id"),
    });
    dispatch_send(
        client,
        query,
        common,
        markup,
        td::InputMessageContent::Venue(venue),
    );
}

pub fn send_contact(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let phone_number = try_parse!(query, args::required_string(&query, "phone_number"));
    let first_name = try_parse!(query, args::required_string(&query, "first_name"));
    let contact = serde_json::json!({
        "phone_number": phone_number,
        "first_name": first_name,
        "last_name": args::string(&query, "last_name"),
        "vcard": args::string(&query, "vcard"),
    });
    dispatch_send(
        client,
        query,
        common,
        markup,
        td::InputMessageContent::Contact(contact),
    );
}

pub fn send_dice(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let emoji = query.arg("emoji").unwrap_or("🎲").to_string();
    dispatch_send(
        client,
        query,
        common,
        markup,
        td::InputMessageContent::Dice { emoji },
    );
}

pub fn send_game(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let short_name = try_parse!(query, args::required_string(&query, "game_short_name"));
    let content = td::InputMessageContent::Game {
        bot_user_id: client.bot_user_id,
        short_name,
    };
    dispatch_send(client, query, common, markup, content);
}

pub fn send_invoice(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let title = try_parse!(query, args::required_string(&query, "title"));
    let prices = try_parse!(query, args::required_json_arg(&query, "prices"));
    let mut invoice = serde_json::json!({
        "title": title,
        "description": args::string(&query, "description"),
        "payload": args::string(&query, "payload"),
        "provider_token": args::string(&query, "provider_token"),
        "currency": args::string(&query, "currency"),
        "prices": prices,
    });
    for extra in [
        "max_tip_amount",
        "suggested_tip_amounts",
        "start_parameter",
        "provider_data",
        "photo_url",
        "need_name",
        "need_phone_number",
        "need_email",
        "need_shipping_address",
        "send_phone_number_to_provider",
        "send_email_to_provider",
        "is_flexible",
    ] {
        if let Some(value) = query.arg(extra) {
            invoice[extra] = serde_json::json!(value);
        }
    }
    dispatch_send(
        client,
        query,
        common,
        markup,
        td::InputMessageContent::Invoice(invoice),
    );
}

pub fn send_poll(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let question = try_parse!(query, args::required_string(&query, "question"));
    let options = try_parse!(query, args::required_json_arg(&query, "options"));
    let mut poll = serde_json::json!({
        "question": question,
        "options": options,
        "is_anonymous": query.arg("is_anonymous").map(|v| v == "true").unwrap_or(true),
        "type": args::string(&query, "type"),
        "allows_multiple_answers": args::boolean(&query, "allows_multiple_answers"),
        "is_closed": args::boolean(&query, "is_closed"),
    });
    for extra in [
        "correct_option_id",
        "explanation",
        "explanation_parse_mode",
        "open_period",
        "close_date",
    ] {
        if let Some(value) = query.arg(extra) {
            poll[extra] = serde_json::json!(value);
        }
    }
    dispatch_send(
        client,
        query,
        common,
        markup,
        td::InputMessageContent::Poll(poll),
    );
}

pub fn send_media_group(client: &mut Client, query: Query) {
    let common = try_parse!(query, send_common(&query));
    let media = try_parse!(query, args::required_json_arg(&query, "media"));
    let items = match media.as_array() {
        Some(items) if (2..=10).contains(&items.len()) => items.clone(),
        _ => {
            let mut query = query;
            query.answer_error(&ApiError::bad_request(
                "media group must include 2-10 items",
            ));
            return;
        }
    };
    let mut contents = Vec::with_capacity(items.len());
    for item in &items {
        let content = try_parse!(query, input_media_content(client, &query, item));
        contents.push(content);
    }
    let count = contents.len();
    let function = td::Function::SendMessageAlbum {
        chat_id: common.chat_id,
        message_thread_id: common.message_thread_id,
        business_connection_id: common.business_connection_id,
        reply_to: common.reply_to,
        disable_notification: common.disable_notification,
        protect_content: common.protect_content,
        effect_id: common.effect_id,
        contents,
    };
    client.send_and_track(query, common.chat_id, function, count, false);
}

/// One InputMedia object → input content, resolving `attach://` parts.
fn input_media_content(
    client: &Client,
    query: &Query,
    item: &Value,
) -> Result<td::InputMessageContent, ApiError> {
    let local_mode = client.settings.local_mode;
    let media_ref = item
        .get("media")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::bad_request("media not found"))?;
    let file = args::input_file_value(query, media_ref, local_mode)?;
    let thumbnail = item
        .get("thumbnail")
        .or_else(|| item.get("thumb"))
        .and_then(|v| v.as_str())
        .map(|v| args::input_file_value(query, v, local_mode))
        .transpose()?;
    let caption = serde_json::json!({
        "text": item.get("caption").and_then(|v| v.as_str()).unwrap_or(""),
        "parse_mode": item.get("parse_mode").and_then(|v| v.as_str()).unwrap_or(""),
        "entities": item.get("caption_entities").cloned().unwrap_or_default(),
    });
    let extra = item.clone();
    match item.get("type").and_then(|v| v.as_str()) {
        Some("photo") => Ok(td::InputMessageContent::Photo {
            file,
            caption,
            extra,
        }),
        Some("video") => Ok(td::InputMessageContent::Video {
            file,
            thumbnail,
            caption,
            extra,
        }),
        Some("animation") => Ok(td::InputMessageContent::Animation {
            file,
            thumbnail,
            caption,
            extra,
        }),
        Some("audio") => Ok(td::InputMessageContent::Audio {
            file,
            thumbnail,
            caption,
            extra,
        }),
        Some("document") => Ok(td::InputMessageContent::Document {
            file,
            thumbnail,
            caption,
            extra,
        }),
        _ => Err(ApiError::bad_request("invalid media type specified")),
    }
}

pub fn send_chat_action(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let action = try_parse!(query, args::required_string(&query, "action"));
    let message_thread_id = args::integer(&query, "message_thread_id")
        .filter(|id| *id > 0)
        .and_then(|id| i32::try_from(id).ok())
        .map(td::message_id::from_client)
        .unwrap_or(0);
    let function = td::Function::SendChatAction {
        chat_id,
        message_thread_id,
        business_connection_id: args::string(&query, "business_connection_id"),
        action: serde_json::json!(action),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

// --- Forward / copy ---

fn forward(
    client: &mut Client,
    query: Query,
    message_ids: Vec<i64>,
    send_copy: bool,
    ids_only: bool,
) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let from_chat_id = try_parse!(query, args::named_chat_id(&query, "from_chat_id"));
    let message_thread_id = args::integer(&query, "message_thread_id")
        .filter(|id| *id > 0)
        .and_then(|id| i32::try_from(id).ok())
        .map(td::message_id::from_client)
        .unwrap_or(0);
    let count = message_ids.len();
    let function = td::Function::ForwardMessages {
        chat_id,
        message_thread_id,
        from_chat_id,
        message_ids,
        disable_notification: args::boolean(&query, "disable_notification"),
        protect_content: args::boolean(&query, "protect_content"),
        send_copy,
        remove_caption: args::boolean(&query, "remove_caption"),
    };
    client.send_and_track(query, chat_id, function, count, ids_only);
}

pub fn forward_message(client: &mut Client, query: Query) {
    let message_id = try_parse!(query, args::message_id(&query, "message_id"));
    forward(client, query, vec![message_id], false, false);
}

pub fn forward_messages(client: &mut Client, query: Query) {
    let message_ids = try_parse!(query, args::message_ids(&query, "message_ids"));
    forward(client, query, message_ids, false, true);
}

pub fn copy_message(client: &mut Client, query: Query) {
    let message_id = try_parse!(query, args::message_id(&query, "message_id"));
    forward(client, query, vec![message_id], true, true);
}

pub fn copy_messages(client: &mut Client, query: Query) {
    let message_ids = try_parse!(query, args::message_ids(&query, "message_ids"));
    forward(client, query, message_ids, true, true);
}

// --- Edits ---

/// Answer an edit with the updated message, or True for inline edits.
fn answer_edited(client: &mut Client, object: td::Object) -> Result<Value, ApiError> {
    match object {
        td::Object::Message(message) => {
            let info = MessageInfo::from_td(&message);
            Ok(crate::render::message_json(client, &info))
        }
        _ => Ok(Value::Bool(true)),
    }
}

fn edit_target(query: &Query) -> Result<Option<(i64, i64)>, ApiError> {
    if query.has_arg("inline_message_id") {
        return Ok(None);
    }
    let chat_id = args::chat_id(query)?;
    let message_id = args::message_id(query, "message_id")?;
    Ok(Some((chat_id, message_id)))
}

pub fn edit_message_text(client: &mut Client, query: Query) {
    let target = try_parse!(query, edit_target(&query));
    let text = try_parse!(query, args::required_string(&query, "text"));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let link_preview_options = try_parse!(query, args::json_arg(&query, "link_preview_options"))
        .unwrap_or_else(|| {
            serde_json::json!({
                "is_disabled": args::boolean(&query, "disable_web_page_preview")
            })
        });
    let entities = args::text_entities(&query, "entities");
    let inline_message_id = args::string(&query, "inline_message_id");
    client.with_resolved_markup(
        query,
        markup,
        Box::new(move |client, query, markup| {
            let content = td::InputMessageContent::Text {
                text,
                entities,
                link_preview_options,
            };
            let function = match target {
                Some((chat_id, message_id)) => td::Function::EditMessageText {
                    chat_id,
                    message_id,
                    reply_markup: markup,
                    content,
                },
                None => td::Function::EditInlineMessageText {
                    inline_message_id,
                    reply_markup: markup,
                    content,
                },
            };
            client.send_td_and_answer(query, function, answer_edited);
        }),
    );
}

pub fn edit_message_media(client: &mut Client, query: Query) {
    let target = try_parse!(query, edit_target(&query));
    let media = try_parse!(query, args::required_json_arg(&query, "media"));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let content = try_parse!(query, input_media_content(client, &query, &media));
    let inline_message_id = args::string(&query, "inline_message_id");
    client.with_resolved_markup(
        query,
        markup,
        Box::new(move |client, query, markup| {
            let function = match target {
                Some((chat_id, message_id)) => td::Function::EditMessageMedia {
                    chat_id,
                    message_id,
                    reply_markup: markup,
                    content,
                },
                None => td::Function::EditInlineMessageMedia {
                    inline_message_id,
                    reply_markup: markup,
                    content,
                },
            };
            client.send_td_and_answer(query, function, answer_edited);
        }),
    );
}

pub fn edit_message_caption(client: &mut Client, query: Query) {
    let target = try_parse!(query, edit_target(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let caption = args::caption(&query);
    let show_above = args::boolean(&query, "show_caption_above_media");
    let inline_message_id = args::string(&query, "inline_message_id");
    client.with_resolved_markup(
        query,
        markup,
        Box::new(move |client, query, markup| {
            let function = match target {
                Some((chat_id, message_id)) => td::Function::EditMessageCaption {
                    chat_id,
                    message_id,
                    reply_markup: markup,
                    caption,
                    show_caption_above_media: show_above,
                },
                None => td::Function::EditInlineMessageCaption {
                    inline_message_id,
                    reply_markup: markup,
                    caption,
                    show_caption_above_media: show_above,
                },
            };
            client.send_td_and_answer(query, function, answer_edited);
        }),
    );
}

pub fn edit_message_reply_markup(client: &mut Client, query: Query) {
    let target = try_parse!(query, edit_target(&query));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    let inline_message_id = args::string(&query, "inline_message_id");
    client.with_resolved_markup(
        query,
        markup,
        Box::new(move |client, query, markup| {
            let function = match target {
                Some((chat_id, message_id)) => td::Function::EditMessageReplyMarkup {
                    chat_id,
                    message_id,
                    reply_markup: markup,
                },
                None => td::Function::EditInlineMessageReplyMarkup {
                    inline_message_id,
                    reply_markup: markup,
                },
            };
            client.send_td_and_answer(query, function, answer_edited);
        }),
    );
}

// --- Deletion, polls, reactions ---

pub fn delete_message(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_id = try_parse!(query, args::message_id(&query, "message_id"));
    let function = td::Function::DeleteMessages {
        chat_id,
        message_ids: vec![message_id],
        revoke: true,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn delete_messages(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_ids = try_parse!(query, args::message_ids(&query, "message_ids"));
    let function = td::Function::DeleteMessages {
        chat_id,
        message_ids,
        revoke: true,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn stop_poll(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_id = try_parse!(query, args::message_id(&query, "message_id"));
    let markup = try_parse!(query, args::reply_markup(client, &query));
    client.with_resolved_markup(
        query,
        markup,
        Box::new(move |client, query, markup| {
            let function = td::Function::StopPoll {
                chat_id,
                message_id,
                reply_markup: markup,
            };
            client.send_td_and_answer(query, function, super::object_to_value);
        }),
    );
}

pub fn set_message_reaction(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_id = try_parse!(query, args::message_id(&query, "message_id"));
    let reaction_types = try_parse!(query, args::json_arg(&query, "reaction"))
        .unwrap_or(Value::Array(Vec::new()));
    let function = td::Function::SetMessageReaction {
        chat_id,
        message_id,
        reaction_types,
        is_big: args::boolean(&query, "is_big"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}
