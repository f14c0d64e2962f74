// Update ingestor: the full native-event stream enters here. Cache mutation
// happens only on this path, then events either feed a resolution queue or
// go straight to the emitter.

use crate::models::{ChatInfo, GroupInfo, MessageInfo, SupergroupInfo, UserInfo};
use crate::td;
use crate::update_types::UpdateKind;

use super::Client;

/// Messages older than this are stale and never emitted.
const FRESHNESS_WINDOW: i64 = 86400;

impl Client {
    pub(crate) fn on_event(&mut self, event: td::Event) {
        match event {
            td::Event::Response { query_id, result } => self.on_td_response(query_id, result),
            td::Event::AuthorizationState(state) => self.on_authorization_state(state),
            td::Event::Option { name, value } => {
                // Before authorization only my_id and unix_time may be
                // applied; every other option waits in order with the rest
                // of the buffer.
                if self.is_ready || name == "my_id" || name == "unix_time" {
                    self.on_option(&name, value);
                } else {
                    self.pending_updates
                        .push_back(td::Event::Option { name, value });
                }
            }
            td::Event::User(user) => self.on_user_update(&user),
            other => {
                if !self.is_ready {
                    // Order is preserved; the buffer drains on first Ready.
                    self.pending_updates.push_back(other);
                    return;
                }
                self.handle_update(other);
            }
        }
    }

    pub(crate) fn handle_update(&mut self, event: td::Event) {
        match event {
            td::Event::NewMessage(message) => self.on_new_message(*message, false),
            td::Event::MessageEdited(message) => self.on_message_edited(*message),
            td::Event::MessageSendSucceeded {
                message,
                old_message_id,
            } => self.on_message_send_succeeded(*message, old_message_id),
            td::Event::MessageSendFailed {
                chat_id,
                old_message_id,
                new_message_id,
                error,
            } => self.on_message_send_failed(chat_id, old_message_id, new_message_id, error),
            td::Event::MessagesDeleted {
                chat_id,
                message_ids,
            } => {
                for message_id in message_ids {
                    self.remove_cached_message(chat_id, message_id);
                }
            }

            td::Event::BasicGroup(group) => {
                self.groups.insert(group.id, GroupInfo::from_td(&group));
            }
            td::Event::Supergroup(supergroup) => {
                self.supergroups
                    .insert(supergroup.id, SupergroupInfo::from_td(&supergroup));
            }
            td::Event::Chat(chat) => {
                self.chats.insert(chat.id, ChatInfo::from_td(&chat));
            }
            td::Event::BusinessConnection(connection) => {
                self.business_connections
                    .insert(connection.id.clone(), connection.clone());
                let body = crate::render::business_connection_json(&connection);
                self.emit_update(UpdateKind::BusinessConnection, connection.user_id, body);
            }

            td::Event::ConnectionState(state) => {
                if state == td::ConnectionState::Ready {
                    self.last_synchronization_error_date = None;
                } else if self.last_synchronization_error_date.is_none() {
                    self.last_synchronization_error_date = Some(self.unix_time());
                }
            }

            td::Event::File(file) => self.on_file_update(file),

            td::Event::Poll(poll) => {
                let body = crate::render::poll_json(&poll);
                self.emit_update(UpdateKind::Poll, poll.id, body);
            }
            td::Event::PollAnswer {
                poll_id,
                voter,
                option_ids,
            } => {
                let body = crate::render::poll_answer_json(self, poll_id, voter, &option_ids);
                self.emit_update(UpdateKind::PollAnswer, poll_id, body);
            }

            td::Event::NewInlineQuery {
                id,
                sender_user_id,
                query,
                offset,
                chat_type,
                location,
            } => {
                let body = crate::render::inline_query_json(
                    self,
                    id,
                    sender_user_id,
                    &query,
                    &offset,
                    &chat_type,
                    &location,
                );
                self.emit_update(UpdateKind::InlineQuery, sender_user_id, body);
            }
            td::Event::NewChosenInlineResult {
                sender_user_id,
                result_id,
                query,
                inline_message_id,
            } => {
                let body = crate::render::chosen_inline_result_json(
                    self,
                    sender_user_id,
                    &result_id,
                    &query,
                    &inline_message_id,
                );
                self.emit_update(UpdateKind::ChosenInlineResult, sender_user_id, body);
            }

            td::Event::NewCallbackQuery {
                id,
                sender_user_id,
                chat_id,
                message_id,
                chat_instance,
                payload,
            } => self.enqueue_callback_query(
                id,
                sender_user_id,
                chat_id,
                message_id,
                chat_instance,
                payload,
            ),
            td::Event::NewInlineCallbackQuery {
                id,
                sender_user_id,
                inline_message_id,
                chat_instance,
                payload,
            } => {
                let body = crate::render::inline_callback_query_json(
                    self,
                    id,
                    sender_user_id,
                    &inline_message_id,
                    chat_instance,
                    &payload,
                );
                self.emit_update(UpdateKind::CallbackQuery, sender_user_id, body);
            }
            td::Event::NewBusinessCallbackQuery {
                id,
                sender_user_id,
                connection_id,
                message,
                chat_instance,
                payload,
            } => self.enqueue_business_callback_query(
                id,
                sender_user_id,
                connection_id,
                *message,
                chat_instance,
                payload,
            ),

            td::Event::NewShippingQuery {
                id,
                sender_user_id,
                invoice_payload,
                shipping_address,
            } => {
                let body = crate::render::shipping_query_json(
                    self,
                    id,
                    sender_user_id,
                    &invoice_payload,
                    &shipping_address,
                );
                self.emit_update(UpdateKind::ShippingQuery, sender_user_id, body);
            }
            td::Event::NewPreCheckoutQuery {
                id,
                sender_user_id,
                currency,
                total_amount,
                invoice_payload,
                shipping_option_id,
                order_info,
            } => {
                let body = crate::render::pre_checkout_query_json(
                    self,
                    id,
                    sender_user_id,
                    &currency,
                    total_amount,
                    &invoice_payload,
                    &shipping_option_id,
                    &order_info,
                );
                self.emit_update(UpdateKind::PreCheckoutQuery, sender_user_id, body);
            }

            td::Event::ChatMemberUpdated {
                chat_id,
                actor_user_id,
                date,
                invite_link,
                subject_user_id,
                old_member,
                new_member,
            } => {
                let body = crate::render::chat_member_updated_json(
                    self,
                    chat_id,
                    actor_user_id,
                    date,
                    &invite_link,
                    &old_member,
                    &new_member,
                );
                if subject_user_id == self.bot_user_id {
                    self.emit_update(UpdateKind::MyChatMember, chat_id, body);
                } else {
                    self.emit_update(UpdateKind::ChatMember, subject_user_id, body);
                }
            }
            td::Event::NewChatJoinRequest {
                chat_id,
                user_id,
                date,
                bio,
                invite_link,
            } => {
                let body = crate::render::chat_join_request_json(
                    self,
                    chat_id,
                    user_id,
                    date,
                    &bio,
                    &invite_link,
                );
                self.emit_update(UpdateKind::ChatJoinRequest, user_id, body);
            }
            td::Event::ChatBoost {
                chat_id,
                boost,
                is_removal,
            } => {
                let body = crate::render::chat_boost_json(self, chat_id, &boost, is_removal);
                let kind = if is_removal {
                    UpdateKind::RemovedChatBoost
                } else {
                    UpdateKind::ChatBoost
                };
                self.emit_update(kind, chat_id, body);
            }
            td::Event::MessageReaction {
                chat_id,
                message_id,
                date,
                actor,
                old_reaction_types,
                new_reaction_types,
            } => {
                let body = crate::render::message_reaction_json(
                    self,
                    chat_id,
                    message_id,
                    date,
                    actor,
                    &old_reaction_types,
                    &new_reaction_types,
                );
                self.emit_update(UpdateKind::MessageReaction, chat_id, body);
            }
            td::Event::MessageReactions {
                chat_id,
                message_id,
                date,
                reactions,
            } => {
                let body = crate::render::message_reaction_count_json(
                    self, chat_id, message_id, date, &reactions,
                );
                self.emit_update(UpdateKind::MessageReactionCount, chat_id, body);
            }

            td::Event::NewBusinessMessage {
                connection_id,
                message,
            } => self.enqueue_business_message(connection_id, *message, false),
            td::Event::BusinessMessageEdited {
                connection_id,
                message,
            } => self.enqueue_business_message(connection_id, *message, true),
            td::Event::BusinessMessagesDeleted {
                connection_id,
                chat_id,
                message_ids,
            } => {
                let body = crate::render::business_messages_deleted_json(
                    self,
                    &connection_id,
                    chat_id,
                    &message_ids,
                );
                self.emit_update(UpdateKind::DeletedBusinessMessages, chat_id, body);
            }

            td::Event::NewCustomEvent { event } => {
                let body = serde_json::Value::String(event);
                self.emit_update(UpdateKind::CustomEvent, self.bot_user_id, body);
            }
            td::Event::NewCustomQuery { id, data, timeout } => {
                let body = serde_json::json!({
                    "id": id.to_string(),
                    "data": data,
                    "timeout": timeout,
                });
                self.emit_update(UpdateKind::CustomQuery, self.bot_user_id, body);
            }

            // Options buffered during the login handshake replay here.
            td::Event::Option { name, value } => self.on_option(&name, value),

            // Handled before the buffer; unreachable here.
            td::Event::Response { .. }
            | td::Event::AuthorizationState(_)
            | td::Event::User(_) => {}
        }
    }

    // --- Entity upserts ---

    pub(crate) fn on_user_update(&mut self, user: &td::User) {
        self.users.insert(user.id, UserInfo::from_td(user));
        // A user update may settle an outstanding username resolution.
        if let Some(username) = user.usernames.as_ref().and_then(|u| u.active_usernames.first())
        {
            let folded = username.to_lowercase();
            if self.awaiting_bot_usernames.contains_key(&folded) {
                self.on_bot_username_result(&folded, Some(user.id));
            }
        }
    }

    fn on_option(&mut self, name: &str, value: td::OptionValue) {
        let as_integer = |value: &td::OptionValue| match value {
            td::OptionValue::Integer(n) => *n,
            _ => 0,
        };
        match name {
            "my_id" => {
                let id = as_integer(&value);
                if id != 0 {
                    self.bot_user_id = id;
                    self.tqueue_id = id;
                }
            }
            "unix_time" => self.observe_unix_time(as_integer(&value)),
            "group_anonymous_bot_user_id" => {
                self.group_anonymous_bot_user_id = as_integer(&value)
            }
            "channel_bot_user_id" => self.channel_bot_user_id = as_integer(&value),
            "telegram_service_notifications_chat_id" => {
                self.service_notifications_chat_id = as_integer(&value)
            }
            "authorization_date" => self.authorization_date = as_integer(&value),
            "xallowed_update_types" => {
                self.allowed_update_types =
                    crate::update_types::AllowedUpdates::from_stored(as_integer(&value));
            }
            _ => {}
        }
    }

    // --- Messages ---

    fn on_new_message(&mut self, message: td::Message, is_edited: bool) {
        let info = MessageInfo::from_td(&message);
        let chat_id = info.chat_id;
        let message_id = info.id;
        self.add_cached_message(info);

        if !is_edited && !self.want_message_update(&message) {
            return;
        }
        self.enqueue_new_message(chat_id, message_id, is_edited);
    }

    fn on_message_edited(&mut self, message: td::Message) {
        let mut info = MessageInfo::from_td(&message);
        let key = (info.chat_id, info.id);
        let content_changed = match self.messages.get(&key) {
            Some(cached) => cached.content != info.content,
            None => true,
        };
        info.is_content_changed = content_changed;
        let chat_id = info.chat_id;
        let message_id = info.id;
        self.add_cached_message(info);

        if !content_changed {
            return;
        }
        if !self.want_message_update(&message) {
            return;
        }
        self.enqueue_new_message(chat_id, message_id, true);
    }

    /// The silent-drop filter applied before any message update is queued.
    fn want_message_update(&self, message: &td::Message) -> bool {
        if message.is_outgoing {
            let allowed_service = matches!(
                message.content,
                td::MessageContent::PinnedMessage { .. }
                    | td::MessageContent::ForumTopicCreated(_)
                    | td::MessageContent::ForumTopicEdited(_)
                    | td::MessageContent::ForumTopicIsClosedToggled { .. }
                    | td::MessageContent::VideoChatStarted
                    | td::MessageContent::VideoChatEnded { .. }
                    | td::MessageContent::VideoChatScheduled { .. }
            );
            if !allowed_service {
                return false;
            }
        }
        if (message.date as i64) < self.unix_time() - FRESHNESS_WINDOW {
            return false;
        }
        // Backfill from before the bot was authorized in channel-backed chats.
        if self.authorization_date > 0
            && (message.date as i64) < self.authorization_date
            && matches!(
                self.chats.get(&message.chat_id).map(|c| c.kind),
                Some(crate::models::ChatInfoKind::Supergroup { .. })
            )
        {
            return false;
        }
        if message.self_destruct_time > 0 {
            return false;
        }
        if message
            .forward_info
            .as_ref()
            .map(|f| f.is_imported)
            .unwrap_or(false)
        {
            return false;
        }
        !matches!(
            message.content,
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
                | td::MessageContent::Unsupported
        )
    }

    /// Single insertion point for the message cache.
    pub(crate) fn add_cached_message(&mut self, info: MessageInfo) {
        self.messages.insert((info.chat_id, info.id), info);
    }

    pub(crate) fn remove_cached_message(&mut self, chat_id: i64, message_id: i64) {
        self.messages.remove(&(chat_id, message_id));
    }

    // --- Files ---

    pub(crate) fn on_file_update(&mut self, file: td::File) {
        if !file.is_downloading_completed {
            return;
        }
        if let Some(listeners) = self.file_download_listeners.remove(&file.id) {
            let body = crate::render::file_json(&self.settings, self.bot_user_id, &file);
            for mut query in listeners {
                query.answer_ok(body.clone());
            }
        }
    }
}
