// Chat administration handlers: info, membership, invite links, forum
// topics. Mostly thin translations into native functions; access-rights
// enforcement stays with the native client.

use serde_json::Value;

use crate::client::Client;
use crate::error::ApiError;
use crate::query::Query;
use crate::td;

use super::{args, try_parse};

pub fn get_chat(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::GetChat { chat_id };
    client.send_td_and_answer(query, function, move |client, object| match object {
        td::Object::Chat(chat) => {
            Ok(crate::render::chat_full_json(client, chat.id))
        }
        other => super::object_to_value(client, other),
    });
}

pub fn set_chat_photo(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let photo = try_parse!(
        query,
        args::required_input_file(&query, "photo", client.settings.local_mode)
    );
    let function = td::Function::SetChatPhoto { chat_id, photo };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn delete_chat_photo(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::DeleteChatPhoto { chat_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_chat_title(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let title = try_parse!(query, args::required_string(&query, "title"));
    let function = td::Function::SetChatTitle { chat_id, title };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_chat_description(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::SetChatDescription {
        chat_id,
        description: args::string(&query, "description"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_chat_permissions(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let permissions = try_parse!(query, args::required_json_arg(&query, "permissions"));
    let function = td::Function::SetChatPermissions {
        chat_id,
        permissions,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn pin_chat_message(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_id = try_parse!(query, args::message_id(&query, "message_id"));
    let function = td::Function::PinChatMessage {
        chat_id,
        message_id,
        disable_notification: args::boolean(&query, "disable_notification"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn unpin_chat_message(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    // Without an explicit id the most recent pin is removed.
    let message_id = args::integer(&query, "message_id")
        .and_then(|id| i32::try_from(id).ok())
        .filter(|id| *id > 0)
        .map(td::message_id::from_client)
        .unwrap_or(0);
    let function = td::Function::UnpinChatMessage {
        chat_id,
        message_id,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn unpin_all_chat_messages(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::UnpinAllChatMessages { chat_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_chat_sticker_set(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let name = try_parse!(query, args::required_string(&query, "sticker_set_name"));
    // Resolve the set name to its id first, then install it on the chat.
    let mut query = query;
    client.send_td(
        td::Function::SearchStickerSet { name },
        Box::new(move |client, result| match result {
            Ok(td::Object::StickerSet(set)) => {
                client.sticker_set_names.insert(set.id, set.name.clone());
                client.send_td_and_answer(
                    query,
                    td::Function::SetChatStickerSet {
                        chat_id,
                        sticker_set_id: set.id,
                    },
                    super::object_to_value,
                );
            }
            Ok(_) => query.answer_error(&ApiError::bad_request("sticker set not found")),
            Err(error) => {
                let error = crate::error::from_td_error(error.code, &error.message);
                query.answer_error(&error);
            }
        }),
    );
}

pub fn delete_chat_sticker_set(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::SetChatStickerSet {
        chat_id,
        sticker_set_id: 0,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn leave_chat(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::LeaveChat { chat_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

// --- Invite links ---

pub fn export_chat_invite_link(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::ExportChatInviteLink { chat_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn create_chat_invite_link(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::CreateChatInviteLink {
        chat_id,
        name: args::string(&query, "name"),
        expire_date: args::integer(&query, "expire_date").unwrap_or(0) as i32,
        member_limit: args::integer_in(&query, "member_limit", 0, 0, 99999) as i32,
        creates_join_request: args::boolean(&query, "creates_join_request"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn edit_chat_invite_link(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let invite_link = try_parse!(query, args::required_string(&query, "invite_link"));
    let function = td::Function::EditChatInviteLink {
        chat_id,
        invite_link,
        name: args::string(&query, "name"),
        expire_date: args::integer(&query, "expire_date").unwrap_or(0) as i32,
        member_limit: args::integer_in(&query, "member_limit", 0, 0, 99999) as i32,
        creates_join_request: args::boolean(&query, "creates_join_request"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn revoke_chat_invite_link(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let invite_link = try_parse!(query, args::required_string(&query, "invite_link"));
    let function = td::Function::RevokeChatInviteLink {
        chat_id,
        invite_link,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn approve_chat_join_request(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let function = td::Function::ApproveChatJoinRequest { chat_id, user_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn decline_chat_join_request(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let function = td::Function::DeclineChatJoinRequest { chat_id, user_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

// --- Members ---

/// `sender_chat_id` takes precedence over `user_id` for ban/unban of chats.
fn member_id(query: &Query) -> Result<td::MessageSender, ApiError> {
    if let Some(sender_chat_id) = args::integer(query, "sender_chat_id") {
        return Ok(td::MessageSender::Chat(sender_chat_id));
    }
    Ok(td::MessageSender::User(args::user_id(query)?))
}

pub fn get_chat_member(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let member_id = try_parse!(query, member_id(&query));
    let function = td::Function::GetChatMember { chat_id, member_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_chat_administrators(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::GetChatAdministrators { chat_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_chat_member_count(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::GetChatMemberCount { chat_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn promote_chat_member(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let mut rights = serde_json::Map::new();
    for right in [
        "is_anonymous",
        "can_manage_chat",
        "can_post_messages",
        "can_edit_messages",
        "can_delete_messages",
        "can_manage_video_chats",
        "can_restrict_members",
        "can_promote_members",
        "can_change_info",
        "can_invite_users",
        "can_pin_messages",
        "can_post_stories",
        "can_edit_stories",
        "can_delete_stories",
        "can_manage_topics",
    ] {
        rights.insert(right.to_string(), Value::Bool(args::boolean(&query, right)));
    }
    let status = serde_json::json!({ "status": "administrator", "rights": rights });
    let function = td::Function::SetChatMemberStatus {
        chat_id,
        member_id: td::MessageSender::User(user_id),
        status,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn restrict_chat_member(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let permissions = try_parse!(query, args::required_json_arg(&query, "permissions"));
    let status = serde_json::json!({
        "status": "restricted",
        "is_member": true,
        "until_date": args::integer(&query, "until_date").unwrap_or(0),
        "permissions": permissions,
        "use_independent_chat_permissions":
            args::boolean(&query, "use_independent_chat_permissions"),
    });
    let function = td::Function::SetChatMemberStatus {
        chat_id,
        member_id: td::MessageSender::User(user_id),
        status,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn ban_chat_member(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let function = td::Function::BanChatMember {
        chat_id,
        member_id: td::MessageSender::User(user_id),
        banned_until_date: args::integer(&query, "until_date").unwrap_or(0) as i32,
        revoke_messages: args::boolean(&query, "revoke_messages"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn unban_chat_member(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let status = serde_json::json!({ "status": "left" });
    let function = td::Function::SetChatMemberStatus {
        chat_id,
        member_id: td::MessageSender::User(user_id),
        status,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn ban_chat_sender_chat(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let sender_chat_id = try_parse!(query, args::required_integer(&query, "sender_chat_id"));
    let function = td::Function::BanChatMember {
        chat_id,
        member_id: td::MessageSender::Chat(sender_chat_id),
        banned_until_date: 0,
        revoke_messages: false,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn unban_chat_sender_chat(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let sender_chat_id = try_parse!(query, args::required_integer(&query, "sender_chat_id"));
    let status = serde_json::json!({ "status": "left" });
    let function = td::Function::SetChatMemberStatus {
        chat_id,
        member_id: td::MessageSender::Chat(sender_chat_id),
        status,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_user_chat_boosts(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let function = td::Function::GetUserChatBoosts { chat_id, user_id };
    client.send_td_and_answer(query, function, super::object_to_value);
}

// --- Forum topics ---

/// Thread id of the general topic: external message id 1.
fn general_topic_id() -> i64 {
    td::message_id::from_client(1)
}

pub fn create_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let name = try_parse!(query, args::required_string(&query, "name"));
    let function = td::Function::CreateForumTopic {
        chat_id,
        name,
        icon_color: args::integer(&query, "icon_color").unwrap_or(0) as i32,
        icon_custom_emoji_id: args::integer(&query, "icon_custom_emoji_id").unwrap_or(0),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn edit_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_thread_id = try_parse!(query, args::message_id(&query, "message_thread_id"));
    let function = td::Function::EditForumTopic {
        chat_id,
        message_thread_id,
        name: args::string(&query, "name"),
        icon_custom_emoji_id: args::integer(&query, "icon_custom_emoji_id").unwrap_or(0),
        edit_icon_custom_emoji: query.has_arg("icon_custom_emoji_id"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

fn toggle_forum_topic(client: &mut Client, query: Query, is_closed: bool) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_thread_id = try_parse!(query, args::message_id(&query, "message_thread_id"));
    let function = td::Function::ToggleForumTopicIsClosed {
        chat_id,
        message_thread_id,
        is_closed,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn close_forum_topic(client: &mut Client, query: Query) {
    toggle_forum_topic(client, query, true);
}

pub fn reopen_forum_topic(client: &mut Client, query: Query) {
    toggle_forum_topic(client, query, false);
}

pub fn delete_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_thread_id = try_parse!(query, args::message_id(&query, "message_thread_id"));
    let function = td::Function::DeleteForumTopic {
        chat_id,
        message_thread_id,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn unpin_all_forum_topic_messages(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let message_thread_id = try_parse!(query, args::message_id(&query, "message_thread_id"));
    let function = td::Function::UnpinAllForumTopicMessages {
        chat_id,
        message_thread_id,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn edit_general_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let name = try_parse!(query, args::required_string(&query, "name"));
    let function = td::Function::EditForumTopic {
        chat_id,
        message_thread_id: general_topic_id(),
        name,
        icon_custom_emoji_id: 0,
        edit_icon_custom_emoji: false,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn close_general_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::ToggleForumTopicIsClosed {
        chat_id,
        message_thread_id: general_topic_id(),
        is_closed: true,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn reopen_general_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::ToggleForumTopicIsClosed {
        chat_id,
        message_thread_id: general_topic_id(),
        is_closed: false,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn hide_general_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::ToggleGeneralForumTopicIsHidden {
        chat_id,
        is_hidden: true,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn unhide_general_forum_topic(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::ToggleGeneralForumTopicIsHidden {
        chat_id,
        is_hidden: false,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn unpin_all_general_forum_topic_messages(client: &mut Client, query: Query) {
    let chat_id = try_parse!(query, args::chat_id(&query));
    let function = td::Function::UnpinAllForumTopicMessages {
        chat_id,
        message_thread_id: general_topic_id(),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_forum_topic_icon_stickers(client: &mut Client, query: Query) {
    let function = td::Function::GetForumTopicDefaultIcons;
    client.send_td_and_answer(query, function, super::object_to_value);
}
