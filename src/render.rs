// Bot-API JSON projections of cached entities. Rendering stays lossy on
// purpose: the engine owns ordering and state, the JSON here carries what a
// bot needs to act on an update or response.

use serde_json::{Value, json};

use crate::client::Client;
use crate::models::{ChatInfoKind, MessageInfo, UserInfo};
use crate::settings::Settings;
use crate::td;

pub fn user_json(client: &Client, user_id: i64) -> Value {
    match client.users.get(&user_id) {
        Some(user) => user_info_json(user),
        None => json!({ "id": user_id, "is_bot": false, "first_name": "" }),
    }
}

fn user_info_json(user: &UserInfo) -> Value {
    let mut body = json!({
        "id": user.id,
        "is_bot": user.is_bot(),
        "first_name": user.first_name,
    });
    if !user.last_name.is_empty() {
        body["last_name"] = json!(user.last_name);
    }
    if let Some(username) = user.username() {
        body["username"] = json!(username);
    }
    if !user.language_code.is_empty() {
        body["language_code"] = json!(user.language_code);
    }
    if user.is_premium {
        body["is_premium"] = json!(true);
    }
    if user.added_to_attachment_menu {
        body["added_to_attachment_menu"] = json!(true);
    }
    body
}

/// A user straight from a native response, bypassing the cache.
pub fn td_user_json(user: &td::User) -> Value {
    user_info_json(&UserInfo::from_td(user))
}

/// The getMe projection: the plain user plus bot capability flags.
pub fn bot_user_json(client: &Client, user_id: i64) -> Value {
    let mut body = user_json(client, user_id);
    if let Some(user) = client.users.get(&user_id)
        && let td::UserKind::Bot(info) = &user.kind
    {
        body["can_join_groups"] = json!(info.can_join_groups);
        body["can_read_all_group_messages"] = json!(info.can_read_all_group_messages);
        body["supports_inline_queries"] = json!(info.is_inline);
        body["can_connect_to_business"] = json!(info.can_connect_to_business);
    }
    body
}

pub fn chat_json(client: &Client, chat_id: i64) -> Value {
    let Some(chat) = client.chats.get(&chat_id) else {
        return json!({ "id": chat_id, "type": "private" });
    };
    match chat.kind {
        ChatInfoKind::Private { user_id } => {
            let mut body = json!({ "id": chat_id, "type": "private" });
            if let Some(user) = client.users.get(&user_id) {
                body["first_name"] = json!(user.first_name);
                if !user.last_name.is_empty() {
                    body["last_name"] = json!(user.last_name);
                }
                if let Some(username) = user.username() {
                    body["username"] = json!(username);
                }
            }
            body
        }
        ChatInfoKind::Group { .. } => {
            json!({ "id": chat_id, "type": "group", "title": chat.title })
        }
        ChatInfoKind::Supergroup { supergroup_id } => {
            let supergroup = client.supergroups.get(&supergroup_id);
            let is_channel = supergroup.map(|s| s.is_channel).unwrap_or(false);
            let mut body = json!({
                "id": chat_id,
                "type": if is_channel { "channel" } else { "supergroup" },
                "title": chat.title,
            });
            if let Some(username) = supergroup.and_then(|s| s.username()) {
                body["username"] = json!(username);
            }
            if supergroup.map(|s| s.is_forum).unwrap_or(false) {
                body["is_forum"] = json!(true);
            }
            body
        }
        ChatInfoKind::Unknown => json!({ "id": chat_id, "type": "private" }),
    }
}

/// The full getChat projection, with the slow-path fields bots ask for.
pub fn chat_full_json(client: &Client, chat_id: i64) -> Value {
    let mut body = chat_json(client, chat_id);
    let Some(chat) = client.chats.get(&chat_id) else {
        return body;
    };
    if chat.message_auto_delete_time > 0 {
        body["message_auto_delete_time"] = json!(chat.message_auto_delete_time);
    }
    if chat.has_protected_content {
        body["has_protected_content"] = json!(true);
    }
    if let Some(reactions) = &chat.available_reactions {
        body["available_reactions"] = reactions.clone();
    }
    if chat.max_reaction_count > 0 {
        body["max_reaction_count"] = json!(chat.max_reaction_count);
    }
    body["accent_color_id"] = json!(chat.accent_color_id);
    if chat.background_custom_emoji_id != 0 {
        body["background_custom_emoji_id"] =
            json!(chat.background_custom_emoji_id.to_string());
    }
    if chat.profile_accent_color_id >= 0 {
        body["profile_accent_color_id"] = json!(chat.profile_accent_color_id);
    }
    if chat.profile_background_custom_emoji_id != 0 {
        body["profile_background_custom_emoji_id"] =
            json!(chat.profile_background_custom_emoji_id.to_string());
    }
    match chat.kind {
        ChatInfoKind::Private { user_id } => {
            if let Some(user) = client.users.get(&user_id) {
                if let Some(bio) = &user.bio {
                    body["bio"] = json!(bio);
                }
                if let Some(birthdate) = &user.birthdate {
                    body["birthdate"] = birthdate.clone();
                }
                if user.personal_chat_id != 0 {
                    body["personal_chat"] = chat_json(client, user.personal_chat_id);
                }
            }
        }
        ChatInfoKind::Group { group_id } => {
            if let Some(group) = client.groups.get(&group_id) {
                if let Some(description) = &group.description {
                    body["description"] = json!(description);
                }
                if let Some(invite_link) = &group.invite_link {
                    body["invite_link"] = json!(invite_link);
                }
            }
            if let Some(permissions) = &chat.permissions {
                body["permissions"] = permissions.clone();
            }
        }
        ChatInfoKind::Supergroup { supergroup_id } => {
            if let Some(supergroup) = client.supergroups.get(&supergroup_id) {
                if let Some(description) = &supergroup.description {
                    body["description"] = json!(description);
                }
                if let Some(invite_link) = &supergroup.invite_link {
                    body["invite_link"] = json!(invite_link);
                }
                if supergroup.sticker_set_id != 0
                    && let Some(name) = client.sticker_set_name(supergroup.sticker_set_id)
                {
                    body["sticker_set_name"] = json!(name);
                }
                if supergroup.can_set_sticker_set {
                    body["can_set_sticker_set"] = json!(true);
                }
                if supergroup.slow_mode_delay > 0 {
                    body["slow_mode_delay"] = json!(supergroup.slow_mode_delay);
                }
                if supergroup.unrestrict_boost_count > 0 {
                    body["unrestrict_boost_count"] = json!(supergroup.unrestrict_boost_count);
                }
                if supergroup.linked_chat_id != 0 {
                    body["linked_chat_id"] = json!(supergroup.linked_chat_id);
                }
                if let Some(location) = &supergroup.location {
                    body["location"] = location.clone();
                }
                if supergroup.join_to_send_messages {
                    body["join_to_send_messages"] = json!(true);
                }
                if supergroup.join_by_request {
                    body["join_by_request"] = json!(true);
                }
                if supergroup.has_hidden_members {
                    body["has_hidden_members"] = json!(true);
                }
                if supergroup.has_aggressive_anti_spam_enabled {
                    body["has_aggressive_anti_spam_enabled"] = json!(true);
                }
            }
            if let Some(permissions) = &chat.permissions {
                body["permissions"] = permissions.clone();
            }
        }
        ChatInfoKind::Unknown => {}
    }
    body
}

pub fn message_json(client: &Client, info: &MessageInfo) -> Value {
    let mut body = json!({
        "message_id": td::message_id::to_client(info.id).unwrap_or(0),
        "chat": chat_json(client, info.chat_id),
        "date": info.date,
    });
    match info.sender {
        td::MessageSender::User(user_id) => {
            body["from"] = user_json(client, user_id);
        }
        td::MessageSender::Chat(sender_chat_id) => {
            body["sender_chat"] = chat_json(client, sender_chat_id);
            // Channel posts carry a synthetic service sender.
            if client.channel_bot_user_id != 0 {
                body["from"] = user_json(client, client.channel_bot_user_id);
            }
        }
    }
    if info.edit_date > 0 {
        body["edit_date"] = json!(info.edit_date);
    }
    if info.is_topic_message {
        body["is_topic_message"] = json!(true);
        if let Some(thread) = td::message_id::to_client(info.message_thread_id) {
            body["message_thread_id"] = json!(thread);
        }
    }
    if info.media_album_id != 0 {
        body["media_group_id"] = json!(info.media_album_id.to_string());
    }
    if info.via_bot_user_id != 0 {
        body["via_bot"] = user_json(client, info.via_bot_user_id);
    }
    if !info.author_signature.is_empty() {
        body["author_signature"] = json!(info.author_signature);
    }
    if info.sender_boost_count > 0 {
        body["sender_boost_count"] = json!(info.sender_boost_count);
    }
    if info.effect_id != 0 {
        body["message_effect_id"] = json!(info.effect_id.to_string());
    }
    if !info.can_be_saved {
        body["has_protected_content"] = json!(true);
    }
    if info.is_from_offline {
        body["is_from_offline"] = json!(true);
    }
    if let Some(forward) = &info.forward_info {
        body["forward_origin"] = forward_origin_json(client, forward);
        body["forward_date"] = json!(forward.date);
    }
    if !info.business_connection_id.is_empty() {
        body["business_connection_id"] = json!(info.business_connection_id);
        if info.sender_business_bot_user_id != 0 {
            body["sender_business_bot"] = user_json(client, info.sender_business_bot_user_id);
        }
    }

    // The replied-to message renders shallow: no nested reply, no markup.
    if let Some(reply) = &info.business_reply_to_message {
        body["reply_to_message"] = shallow_message_json(client, reply);
    } else if let Some(reply_id) = info.reply_to_message_id_in(info.chat_id)
        && let Some(reply) = client.message(info.chat_id, reply_id)
    {
        body["reply_to_message"] = shallow_message_json(client, reply);
    } else if let Some(td::ReplyTo::Story { chat_id, story_id }) = &info.reply_to {
        body["reply_to_story"] = json!({
            "chat": chat_json(client, *chat_id),
            "id": story_id,
        });
    }

    content_into_json(client, &info.content, &mut body);

    if let Some(markup) = &info.reply_markup
        && let Some(rendered) = reply_markup_json(markup)
    {
        body["reply_markup"] = rendered;
    }
    body
}

fn shallow_message_json(client: &Client, info: &MessageInfo) -> Value {
    let mut body = json!({
        "message_id": td::message_id::to_client(info.id).unwrap_or(0),
        "chat": chat_json(client, info.chat_id),
        "date": info.date,
    });
    if let td::MessageSender::User(user_id) = info.sender {
        body["from"] = user_json(client, user_id);
    }
    content_into_json(client, &info.content, &mut body);
    body
}

fn content_into_json(client: &Client, content: &td::MessageContent, body: &mut Value) {
    let caption_text = |caption: &Value| -> Option<String> {
        caption
            .get("text")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(String::from)
    };
    match content {
        td::MessageContent::Text { text, entities, .. } => {
            body["text"] = json!(text);
            if entities.as_array().map(|a| !a.is_empty()).unwrap_or(false) {
                body["entities"] = entities.clone();
            }
        }
        td::MessageContent::Sticker(sticker) => {
            body["sticker"] = sticker_json(client, sticker);
        }
        td::MessageContent::Animation { media, caption } => {
            body["animation"] = media.clone();
            if let Some(text) = caption_text(caption) {
                body["caption"] = json!(text);
            }
        }
        td::MessageContent::Audio { media, caption } => {
            body["audio"] = media.clone();
            if let Some(text) = caption_text(caption) {
                body["caption"] = json!(text);
            }
        }
        td::MessageContent::Document { media, caption } => {
            body["document"] = media.clone();
            if let Some(text) = caption_text(caption) {
                body["caption"] = json!(text);
            }
        }
        td::MessageContent::Photo {
            media,
            caption,
            has_spoiler,
        } => {
            body["photo"] = media.clone();
            if let Some(text) = caption_text(caption) {
                body["caption"] = json!(text);
            }
            if *has_spoiler {
                body["has_media_spoiler"] = json!(true);
            }
        }
        td::MessageContent::Video {
            media,
            caption,
            has_spoiler,
        } => {
            body["video"] = media.clone();
            if let Some(text) = caption_text(caption) {
                body["caption"] = json!(text);
            }
            if *has_spoiler {
                body["has_media_spoiler"] = json!(true);
            }
        }
        td::MessageContent::VideoNote { media } => body["video_note"] = media.clone(),
        td::MessageContent::VoiceNote { media, caption } => {
            body["voice"] = media.clone();
            if let Some(text) = caption_text(caption) {
                body["caption"] = json!(text);
            }
        }
        td::MessageContent::Contact(value) => body["contact"] = value.clone(),
        td::MessageContent::Dice(value) => body["dice"] = value.clone(),
        td::MessageContent::Game(value) => body["game"] = value.clone(),
        td::MessageContent::Poll(poll) => body["poll"] = poll_json(poll),
        td::MessageContent::Location(value) => body["location"] = value.clone(),
        td::MessageContent::Venue(value) => body["venue"] = value.clone(),
        td::MessageContent::Invoice(value) => body["invoice"] = value.clone(),
        td::MessageContent::Story(value) => body["story"] = value.clone(),
        td::MessageContent::PaidMedia(value) => body["paid_media"] = value.clone(),
        td::MessageContent::SuccessfulPayment(value) => {
            body["successful_payment"] = value.clone()
        }
        td::MessageContent::PinnedMessage { message_id } => {
            let chat_id = body["chat"]["id"].as_i64().unwrap_or(0);
            if let Some(pinned) = client.message(chat_id, *message_id) {
                body["pinned_message"] = shallow_message_json(client, pinned);
            }
        }
        td::MessageContent::ChatAddMembers { user_ids } => {
            body["new_chat_members"] = Value::Array(
                user_ids.iter().map(|id| user_json(client, *id)).collect(),
            );
        }
        td::MessageContent::ChatDeleteMember { user_id } => {
            body["left_chat_member"] = user_json(client, *user_id);
        }
        td::MessageContent::ChatChangeTitle { title } => {
            body["new_chat_title"] = json!(title);
        }
        td::MessageContent::ChatChangePhoto(value) => body["new_chat_photo"] = value.clone(),
        td::MessageContent::ChatDeletePhoto => body["delete_chat_photo"] = json!(true),
        td::MessageContent::ChatJoinByLink | td::MessageContent::ChatJoinByRequest => {}
        td::MessageContent::ChatUpgradeTo { supergroup_id } => {
            body["migrate_to_chat_id"] = json!(supergroup_id);
        }
        td::MessageContent::ChatUpgradeFrom { group_id, .. } => {
            body["migrate_from_chat_id"] = json!(group_id);
        }
        td::MessageContent::ForumTopicCreated(value) => {
            body["forum_topic_created"] = value.clone()
        }
        td::MessageContent::ForumTopicEdited(value) => {
            body["forum_topic_edited"] = value.clone()
        }
        td::MessageContent::ForumTopicIsClosedToggled { is_closed } => {
            if *is_closed {
                body["forum_topic_closed"] = json!({});
            } else {
                body["forum_topic_reopened"] = json!({});
            }
        }
        td::MessageContent::VideoChatScheduled { start_date } => {
            body["video_chat_scheduled"] = json!({ "start_date": start_date });
        }
        td::MessageContent::VideoChatStarted => body["video_chat_started"] = json!({}),
        td::MessageContent::VideoChatEnded { duration } => {
            body["video_chat_ended"] = json!({ "duration": duration });
        }
        td::MessageContent::MessageAutoDeleteTimerChanged { time } => {
            body["message_auto_delete_timer_changed"] =
                json!({ "message_auto_delete_time": time });
        }
        td::MessageContent::GiveawayCreated(value) => {
            body["giveaway_created"] = value.clone()
        }
        td::MessageContent::Giveaway(value) => body["giveaway"] = value.clone(),
        td::MessageContent::GiveawayWinners(value) => {
            body["giveaway_winners"] = value.clone()
        }
        td::MessageContent::WriteAccessAllowed(value) => {
            body["write_access_allowed"] = value.clone()
        }
        td::MessageContent::WebAppDataReceived(value) => {
            body["web_app_data"] = value.clone()
        }
        td::MessageContent::ProximityAlertTriggered(value) => {
            body["proximity_alert_triggered"] = value.clone()
        }
        td::MessageContent::ChatBackgroundSet(value) => {
            body["chat_background_set"] = value.clone()
        }
        td::MessageContent::UsersShared(value) => body["users_shared"] = value.clone(),
        td::MessageContent::ChatShared(value) => body["chat_shared"] = value.clone(),
        td::MessageContent::BoostApplied { boost_count } => {
            body["boost_added"] = json!({ "boost_count": boost_count });
        }
        // Filtered out before emission; renders nothing in responses either.
        td::MessageContent::GameScore { .. }
        | td::MessageContent::PaymentSuccessfulSent(_)
        | td::MessageContent::Call(_)
        | td::MessageContent::ExpiredPhoto
        | td::MessageContent::ExpiredVideo
        | td::MessageContent::ExpiredVideoNote
        | td::MessageContent::ExpiredVoiceNote
        | td::MessageContent::ScreenshotTaken
        | td::MessageContent::ContactRegistered
        | td::MessageContent::WebsiteConnected(_)
        | td::MessageContent::PassportDataSent(_)
        | td::MessageContent::Unsupported => {}
    }
}

pub fn sticker_json(client: &Client, sticker: &td::Sticker) -> Value {
    let mut body = match &sticker.file {
        Value::Object(map) => Value::Object(map.clone()),
        _ => json!({}),
    };
    body["width"] = json!(sticker.width);
    body["height"] = json!(sticker.height);
    if !sticker.emoji.is_empty() {
        body["emoji"] = json!(sticker.emoji);
    }
    if sticker.set_id != 0
        && let Some(name) = client.sticker_set_name(sticker.set_id)
        && !name.is_empty()
    {
        body["set_name"] = json!(name);
    }
    body
}

fn forward_origin_json(client: &Client, forward: &td::ForwardInfo) -> Value {
    match &forward.origin {
        td::ForwardOrigin::User(user_id) => json!({
            "type": "user",
            "date": forward.date,
            "sender_user": user_json(client, *user_id),
        }),
        td::ForwardOrigin::Chat {
            chat_id,
            author_signature,
        } => {
            let mut body = json!({
                "type": "chat",
                "date": forward.date,
                "sender_chat": chat_json(client, *chat_id),
            });
            if !author_signature.is_empty() {
                body["author_signature"] = json!(author_signature);
            }
            body
        }
        td::ForwardOrigin::Channel {
            chat_id,
            message_id,
            author_signature,
        } => {
            let mut body = json!({
                "type": "channel",
                "date": forward.date,
                "chat": chat_json(client, *chat_id),
                "message_id": td::message_id::to_client(*message_id).unwrap_or(0),
            });
            if !author_signature.is_empty() {
                body["author_signature"] = json!(author_signature);
            }
            body
        }
        td::ForwardOrigin::HiddenUser(name) => json!({
            "type": "hidden_user",
            "date": forward.date,
            "sender_user_name": name,
        }),
    }
}

/// Only inline keyboards are reflected back to bots.
pub fn reply_markup_json(markup: &td::ReplyMarkup) -> Option<Value> {
    let td::ReplyMarkup::InlineKeyboard { rows } = markup else {
        return None;
    };
    let rendered: Vec<Value> = rows
        .iter()
        .map(|row| {
            Value::Array(
                row.iter()
                    .map(|button| {
                        let mut body = json!({ "text": button.text });
                        match &button.kind {
                            td::InlineButtonKind::Url { url } => body["url"] = json!(url),
                            td::InlineButtonKind::LoginUrl { url, .. } => {
                                body["login_url"] = json!({ "url": url });
                            }
                            td::InlineButtonKind::Callback { data } => {
                                body["callback_data"] =
                                    json!(String::from_utf8_lossy(data).to_string());
                            }
                            td::InlineButtonKind::CallbackGame => {
                                body["callback_game"] = json!({});
                            }
                            td::InlineButtonKind::SwitchInline { query, .. } => {
                                body["switch_inline_query"] = json!(query);
                            }
                            td::InlineButtonKind::WebApp { url } => {
                                body["web_app"] = json!({ "url": url });
                            }
                            td::InlineButtonKind::Pay => body["pay"] = json!(true),
                            td::InlineButtonKind::CopyText { text } => {
                                body["copy_text"] = json!({ "text": text });
                            }
                        }
                        body
                    })
                    .collect(),
            )
        })
        .collect();
    Some(json!({ "inline_keyboard": rendered }))
}

pub fn poll_json(poll: &td::PollInfo) -> Value {
    let mut body = json!({
        "id": poll.id.to_string(),
        "question": poll.question,
        "options": poll.options,
        "total_voter_count": poll.total_voter_count,
        "is_closed": poll.is_closed,
        "is_anonymous": poll.is_anonymous,
    });
    if let Some(kind) = poll.kind.as_object() {
        for (key, value) in kind {
            body[key.as_str()] = value.clone();
        }
    }
    if poll.open_period > 0 {
        body["open_period"] = json!(poll.open_period);
    }
    if poll.close_date > 0 {
        body["close_date"] = json!(poll.close_date);
    }
    body
}

pub fn poll_answer_json(
    client: &Client,
    poll_id: i64,
    voter: td::MessageSender,
    option_ids: &[i32],
) -> Value {
    let mut body = json!({
        "poll_id": poll_id.to_string(),
        "option_ids": option_ids,
    });
    match voter {
        td::MessageSender::User(user_id) => body["user"] = user_json(client, user_id),
        td::MessageSender::Chat(chat_id) => body["voter_chat"] = chat_json(client, chat_id),
    }
    body
}

pub fn business_connection_json(connection: &td::BusinessConnection) -> Value {
    json!({
        "id": connection.id,
        "user": { "id": connection.user_id, "is_bot": false, "first_name": "" },
        "user_chat_id": connection.user_chat_id,
        "date": connection.date,
        "can_reply": connection.can_reply,
        "is_enabled": connection.is_enabled,
    })
}

pub fn business_messages_deleted_json(
    client: &Client,
    connection_id: &str,
    chat_id: i64,
    message_ids: &[i64],
) -> Value {
    json!({
        "business_connection_id": connection_id,
        "chat": chat_json(client, chat_id),
        "message_ids": message_ids
            .iter()
            .filter_map(|id| td::message_id::to_client(*id))
            .collect::<Vec<_>>(),
    })
}

pub fn inline_query_json(
    client: &Client,
    id: i64,
    sender_user_id: i64,
    query: &str,
    offset: &str,
    chat_type: &Value,
    location: &Value,
) -> Value {
    let mut body = json!({
        "id": id.to_string(),
        "from": user_json(client, sender_user_id),
        "query": query,
        "offset": offset,
    });
    if let Some(chat_type) = chat_type.as_str() {
        body["chat_type"] = json!(chat_type);
    }
    if location.is_object() {
        body["location"] = location.clone();
    }
    body
}

pub fn chosen_inline_result_json(
    client: &Client,
    sender_user_id: i64,
    result_id: &str,
    query: &str,
    inline_message_id: &str,
) -> Value {
    let mut body = json!({
        "result_id": result_id,
        "from": user_json(client, sender_user_id),
        "query": query,
    });
    if !inline_message_id.is_empty() {
        body["inline_message_id"] = json!(inline_message_id);
    }
    body
}

fn callback_payload_into(payload: &td::CallbackPayload, body: &mut Value) {
    match payload {
        td::CallbackPayload::Data(data) => {
            body["data"] = json!(String::from_utf8_lossy(data).to_string());
        }
        td::CallbackPayload::Game(short_name) => {
            body["game_short_name"] = json!(short_name);
        }
    }
}

pub fn callback_query_json(
    client: &Client,
    entry: &crate::client::resolve::PendingCallbackQuery,
) -> Value {
    let mut body = json!({
        "id": entry.id.to_string(),
        "from": user_json(client, entry.sender_user_id),
        "chat_instance": entry.chat_instance.to_string(),
    });
    if let Some(message) = client.message(entry.chat_id, entry.message_id) {
        body["message"] = message_json(client, message);
    }
    callback_payload_into(&entry.payload, &mut body);
    body
}

pub fn inline_callback_query_json(
    client: &Client,
    id: i64,
    sender_user_id: i64,
    inline_message_id: &str,
    chat_instance: i64,
    payload: &td::CallbackPayload,
) -> Value {
    let mut body = json!({
        "id": id.to_string(),
        "from": user_json(client, sender_user_id),
        "inline_message_id": inline_message_id,
        "chat_instance": chat_instance.to_string(),
    });
    callback_payload_into(payload, &mut body);
    body
}

pub fn business_callback_query_json(
    client: &Client,
    entry: &crate::client::resolve::PendingBusinessCallbackQuery,
) -> Value {
    let mut body = json!({
        "id": entry.id.to_string(),
        "from": user_json(client, entry.sender_user_id),
        "business_connection_id": entry.connection_id,
        "chat_instance": entry.chat_instance.to_string(),
        "message": message_json(client, &entry.message),
    });
    callback_payload_into(&entry.payload, &mut body);
    body
}

pub fn shipping_query_json(
    client: &Client,
    id: i64,
    sender_user_id: i64,
    invoice_payload: &str,
    shipping_address: &Value,
) -> Value {
    json!({
        "id": id.to_string(),
        "from": user_json(client, sender_user_id),
        "invoice_payload": invoice_payload,
        "shipping_address": shipping_address,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn pre_checkout_query_json(
    client: &Client,
    id: i64,
    sender_user_id: i64,
    currency: &str,
    total_amount: i64,
    invoice_payload: &[u8],
    shipping_option_id: &str,
    order_info: &Value,
) -> Value {
    let mut body = json!({
        "id": id.to_string(),
        "from": user_json(client, sender_user_id),
        "currency": currency,
        "total_amount": total_amount,
        "invoice_payload": String::from_utf8_lossy(invoice_payload).to_string(),
    });
    if !shipping_option_id.is_empty() {
        body["shipping_option_id"] = json!(shipping_option_id);
    }
    if order_info.is_object() {
        body["order_info"] = order_info.clone();
    }
    body
}

#[allow(clippy::too_many_arguments)]
pub fn chat_member_updated_json(
    client: &Client,
    chat_id: i64,
    actor_user_id: i64,
    date: i32,
    invite_link: &Value,
    old_member: &Value,
    new_member: &Value,
) -> Value {
    let mut body = json!({
        "chat": chat_json(client, chat_id),
        "from": user_json(client, actor_user_id),
        "date": date,
        "old_chat_member": old_member,
        "new_chat_member": new_member,
    });
    if invite_link.is_object() {
        body["invite_link"] = invite_link.clone();
    }
    body
}

pub fn chat_join_request_json(
    client: &Client,
    chat_id: i64,
    user_id: i64,
    date: i32,
    bio: &str,
    invite_link: &Value,
) -> Value {
    let mut body = json!({
        "chat": chat_json(client, chat_id),
        "from": user_json(client, user_id),
        "user_chat_id": user_id,
        "date": date,
    });
    if !bio.is_empty() {
        body["bio"] = json!(bio);
    }
    if invite_link.is_object() {
        body["invite_link"] = invite_link.clone();
    }
    body
}

pub fn chat_boost_json(client: &Client, chat_id: i64, boost: &Value, is_removal: bool) -> Value {
    let mut body = json!({ "chat": chat_json(client, chat_id) });
    if is_removal {
        if let Some(id) = boost.get("boost_id") {
            body["boost_id"] = id.clone();
        }
        if let Some(date) = boost.get("remove_date") {
            body["remove_date"] = date.clone();
        }
        if let Some(source) = boost.get("source") {
            body["source"] = source.clone();
        }
    } else {
        body["boost"] = boost.clone();
    }
    body
}

#[allow(clippy::too_many_arguments)]
pub fn message_reaction_json(
    client: &Client,
    chat_id: i64,
    message_id: i64,
    date: i32,
    actor: td::MessageSender,
    old_reaction_types: &Value,
    new_reaction_types: &Value,
) -> Value {
    let mut body = json!({
        "chat": chat_json(client, chat_id),
        "message_id": td::message_id::to_client(message_id).unwrap_or(0),
        "date": date,
        "old_reaction": old_reaction_types,
        "new_reaction": new_reaction_types,
    });
    match actor {
        td::MessageSender::User(user_id) => body["user"] = user_json(client, user_id),
        td::MessageSender::Chat(actor_chat_id) => {
            body["actor_chat"] = chat_json(client, actor_chat_id)
        }
    }
    body
}

pub fn message_reaction_count_json(
    client: &Client,
    chat_id: i64,
    message_id: i64,
    date: i32,
    reactions: &Value,
) -> Value {
    json!({
        "chat": chat_json(client, chat_id),
        "message_id": td::message_id::to_client(message_id).unwrap_or(0),
        "date": date,
        "reactions": reactions,
    })
}

pub fn sticker_set_json(client: &Client, set: &td::StickerSet) -> Value {
    let _ = client;
    let mut body = json!({
        "name": set.name,
        "title": set.title,
        "stickers": set.stickers,
    });
    if let Some(kind) = set.sticker_type.as_str() {
        body["sticker_type"] = json!(kind);
        body["contains_masks"] = json!(kind == "mask");
    }
    body
}

/// getFile result. Non-local mode exposes the URL-decoded path relative to
/// the bot directory; local mode returns the absolute path untouched.
pub fn file_json(settings: &Settings, bot_user_id: i64, file: &td::File) -> Value {
    let mut body = json!({
        "file_id": file.remote_id,
        "file_unique_id": file.remote_unique_id,
    });
    let size = if file.size > 0 { file.size } else { file.expected_size };
    if size > 0 {
        body["file_size"] = json!(size);
    }
    if file.is_downloading_completed && !file.local_path.is_empty() {
        if settings.local_mode {
            body["file_path"] = json!(file.local_path);
        } else {
            let prefix = format!("{}/", settings.bot_dir(bot_user_id));
            let relative = file.local_path.strip_prefix(&prefix).unwrap_or(&file.local_path);
            let decoded = urlencoding::decode(relative)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| relative.to_string());
            body["file_path"] = json!(decoded);
        }
    }
    body
}
