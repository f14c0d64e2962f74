// Resolution queues: per-key serial prefetch pipelines that run before an
// update is emitted or a reply-markup is usable. Each queue holds at most
// one outstanding native request; the callback of that request drains the
// queue further.

use crate::error::ApiError;
use crate::models::MessageInfo;
use crate::query::Query;
use crate::td;

use super::Client;

// --- New-message queue (per chat) ---

#[derive(Debug)]
pub struct PendingMessage {
    pub message_id: i64,
    pub is_edited: bool,
    pub reply_fetched: bool,
    pub content_sticker_fetched: bool,
    pub reply_sticker_fetched: bool,
}

#[derive(Debug, Default)]
pub struct NewMessageQueue {
    pub queue: std::collections::VecDeque<PendingMessage>,
    pub has_active_request: bool,
}

impl Client {
    pub(crate) fn enqueue_new_message(&mut self, chat_id: i64, message_id: i64, is_edited: bool) {
        let queue = self.new_message_queues.entry(chat_id).or_default();
        queue.queue.push_back(PendingMessage {
            message_id,
            is_edited,
            reply_fetched: false,
            content_sticker_fetched: false,
            reply_sticker_fetched: false,
        });
        if !queue.has_active_request {
            self.process_new_message_queue(chat_id);
        }
    }

    pub(crate) fn process_new_message_queue(&mut self, chat_id: i64) {
        loop {
            let Some(queue) = self.new_message_queues.get_mut(&chat_id) else {
                return;
            };
            if queue.has_active_request {
                return;
            }
            let Some(entry) = queue.queue.front_mut() else {
                self.new_message_queues.remove(&chat_id);
                return;
            };
            let message_id = entry.message_id;
            let is_edited = entry.is_edited;
            let (reply_fetched, content_fetched, reply_sticker_fetched) = (
                entry.reply_fetched,
                entry.content_sticker_fetched,
                entry.reply_sticker_fetched,
            );

            let Some(message) = self.messages.get(&(chat_id, message_id)) else {
                // Deleted while waiting; nothing to emit.
                self.new_message_queues
                    .get_mut(&chat_id)
                    .map(|q| q.queue.pop_front());
                continue;
            };

            // 1. Replied-to message, same chat only.
            let reply_id = message.reply_to_message_id_in(chat_id);
            if let Some(reply_id) = reply_id
                && !reply_fetched
                && !self.messages.contains_key(&(chat_id, reply_id))
            {
                self.new_message_queues
                    .get_mut(&chat_id)
                    .map(|q| q.has_active_request = true);
                self.send_td(
                    td::Function::GetRepliedMessage {
                        chat_id,
                        message_id,
                    },
                    Box::new(move |client, result| {
                        if let Ok(td::Object::Message(reply)) = result {
                            client.add_cached_message(MessageInfo::from_td(&reply));
                        }
                        if let Some(q) = client.new_message_queues.get_mut(&chat_id) {
                            q.has_active_request = false;
                            if let Some(front) = q.queue.front_mut() {
                                front.reply_fetched = true;
                            }
                        }
                        client.process_new_message_queue(chat_id);
                    }),
                );
                return;
            }

            // 2. Sticker-set name for the message's own content.
            let content_set = self
                .messages
                .get(&(chat_id, message_id))
                .and_then(|m| m.sticker_set_id());
            if let Some(set_id) = content_set
                && !content_fetched
                && self.sticker_set_name(set_id).is_none()
            {
                self.fetch_sticker_set_for_message(chat_id, set_id, |entry| {
                    entry.content_sticker_fetched = true;
                });
                return;
            }

            // 3. Sticker-set name for the replied-to message's content.
            let reply_set = reply_id
                .and_then(|id| self.messages.get(&(chat_id, id)))
                .and_then(|m| m.sticker_set_id());
            if let Some(set_id) = reply_set
                && !reply_sticker_fetched
                && self.sticker_set_name(set_id).is_none()
            {
                self.fetch_sticker_set_for_message(chat_id, set_id, |entry| {
                    entry.reply_sticker_fetched = true;
                });
                return;
            }

            // Fully hydrated: emit and move on.
            self.new_message_queues
                .get_mut(&chat_id)
                .map(|q| q.queue.pop_front());
            self.emit_message_update(chat_id, message_id, is_edited);
        }
    }

    fn fetch_sticker_set_for_message(
        &mut self,
        chat_id: i64,
        set_id: i64,
        mark: impl FnOnce(&mut PendingMessage) + Send + 'static,
    ) {
        self.new_message_queues
            .get_mut(&chat_id)
            .map(|q| q.has_active_request = true);
        self.send_td(
            td::Function::GetStickerSet { set_id },
            Box::new(move |client, result| {
                if let Ok(td::Object::StickerSet(set)) = result {
                    client.sticker_set_names.insert(set.id, set.name.clone());
                }
                if let Some(q) = client.new_message_queues.get_mut(&chat_id) {
                    q.has_active_request = false;
                    if let Some(front) = q.queue.front_mut() {
                        mark(front);
                    }
                }
                client.process_new_message_queue(chat_id);
            }),
        );
    }

    // --- New-business-message queue (per connection) ---

    pub(crate) fn enqueue_business_message(
        &mut self,
        connection_id: String,
        message: td::BusinessMessage,
        is_edited: bool,
    ) {
        let mut info = MessageInfo::from_td(&message.message);
        info.business_connection_id = connection_id.clone();
        if let Some(reply) = &message.reply_to_message {
            info.business_reply_to_message = Some(Box::new(MessageInfo::from_td(reply)));
        }
        let queue = self
            .new_business_message_queues
            .entry(connection_id.clone())
            .or_default();
        queue.queue.push_back(PendingBusinessMessage {
            message: info,
            is_edited,
            content_sticker_fetched: false,
            reply_sticker_fetched: false,
        });
        if !queue.has_active_request {
            self.process_business_message_queue(&connection_id);
        }
    }

    pub(crate) fn process_business_message_queue(&mut self, connection_id: &str) {
        loop {
            let Some(queue) = self.new_business_message_queues.get_mut(connection_id) else {
                return;
            };
            if queue.has_active_request {
                return;
            }
            let Some(entry) = queue.queue.front() else {
                self.new_business_message_queues.remove(connection_id);
                return;
            };

            let content_set = if entry.content_sticker_fetched {
                None
            } else {
                entry.message.sticker_set_id()
            };
            let reply_set = if entry.reply_sticker_fetched {
                None
            } else {
                entry
                    .message
                    .business_reply_to_message
                    .as_ref()
                    .and_then(|m| m.sticker_set_id())
            };

            let need = content_set
                .filter(|id| self.sticker_set_name(*id).is_none())
                .map(|id| (id, true))
                .or_else(|| {
                    reply_set
                        .filter(|id| self.sticker_set_name(*id).is_none())
                        .map(|id| (id, false))
                });

            if let Some((set_id, is_content)) = need {
                let connection_id = connection_id.to_string();
                self.new_business_message_queues
                    .get_mut(&connection_id)
                    .map(|q| q.has_active_request = true);
                self.send_td(
                    td::Function::GetStickerSet { set_id },
                    Box::new(move |client, result| {
                        if let Ok(td::Object::StickerSet(set)) = result {
                            client.sticker_set_names.insert(set.id, set.name.clone());
                        }
                        if let Some(q) =
                            client.new_business_message_queues.get_mut(&connection_id)
                        {
                            q.has_active_request = false;
                            if let Some(front) = q.queue.front_mut() {
                                if is_content {
                                    front.content_sticker_fetched = true;
                                } else {
                                    front.reply_sticker_fetched = true;
                                }
                            }
                        }
                        client.process_business_message_queue(&connection_id);
                    }),
                );
                return;
            }

            let entry = self
                .new_business_message_queues
                .get_mut(connection_id)
                .and_then(|q| q.queue.pop_front())
                .unwrap();
            self.emit_business_message_update(connection_id, &entry.message, entry.is_edited);
        }
    }

    // --- Callback-query queue (per user) ---

    pub(crate) fn enqueue_callback_query(
        &mut self,
        id: i64,
        sender_user_id: i64,
        chat_id: i64,
        message_id: i64,
        chat_instance: i64,
        payload: td::CallbackPayload,
    ) {
        let queue = self
            .new_callback_query_queues
            .entry(sender_user_id)
            .or_default();
        queue.queue.push_back(PendingCallbackQuery {
            id,
            sender_user_id,
            chat_id,
            message_id,
            chat_instance,
            payload,
            state: CallbackQueryState::CheckMessage,
        });
        if !queue.has_active_request {
            self.process_callback_query_queue(sender_user_id);
        }
    }

    pub(crate) fn process_callback_query_queue(&mut self, user_id: i64) {
        loop {
            let Some(queue) = self.new_callback_query_queues.get_mut(&user_id) else {
                return;
            };
            if queue.has_active_request {
                return;
            }
            let Some(entry) = queue.queue.front() else {
                self.new_callback_query_queues.remove(&user_id);
                return;
            };
            let (id, chat_id, message_id, state) =
                (entry.id, entry.chat_id, entry.message_id, entry.state);

            match state {
                CallbackQueryState::CheckMessage => {
                    if !self.messages.contains_key(&(chat_id, message_id)) {
                        self.new_callback_query_queues
                            .get_mut(&user_id)
                            .map(|q| q.has_active_request = true);
                        self.send_td(
                            td::Function::GetCallbackQueryMessage {
                                chat_id,
                                message_id,
                                callback_query_id: id,
                            },
                            Box::new(move |client, result| {
                                if let Ok(td::Object::Message(message)) = result {
                                    client.add_cached_message(MessageInfo::from_td(&message));
                                }
                                client.advance_callback_query(
                                    user_id,
                                    CallbackQueryState::CheckReply,
                                );
                            }),
                        );
                        return;
                    }
                    self.set_callback_query_state(user_id, CallbackQueryState::CheckReply);
                }
                CallbackQueryState::CheckReply => {
                    let reply_id = self
                        .messages
                        .get(&(chat_id, message_id))
                        .and_then(|m| m.reply_to_message_id_in(chat_id));
                    if let Some(reply_id) = reply_id
                        && !self.messages.contains_key(&(chat_id, reply_id))
                    {
                        self.new_callback_query_queues
                            .get_mut(&user_id)
                            .map(|q| q.has_active_request = true);
                        self.send_td(
                            td::Function::GetRepliedMessage {
                                chat_id,
                                message_id,
                            },
                            Box::new(move |client, result| {
                                if let Ok(td::Object::Message(message)) = result {
                                    client.add_cached_message(MessageInfo::from_td(&message));
                                }
                                client.advance_callback_query(
                                    user_id,
                                    CallbackQueryState::CheckStickerSets,
                                );
                            }),
                        );
                        return;
                    }
                    self.set_callback_query_state(user_id, CallbackQueryState::CheckStickerSets);
                }
                CallbackQueryState::CheckStickerSets => {
                    let base_set = self
                        .messages
                        .get(&(chat_id, message_id))
                        .and_then(|m| m.sticker_set_id());
                    let reply_set = self
                        .messages
                        .get(&(chat_id, message_id))
                        .and_then(|m| m.reply_to_message_id_in(chat_id))
                        .and_then(|id| self.messages.get(&(chat_id, id)))
                        .and_then(|m| m.sticker_set_id());
                    let missing = base_set
                        .into_iter()
                        .chain(reply_set)
                        .find(|set_id| self.sticker_set_name(*set_id).is_none());
                    if let Some(set_id) = missing {
                        self.new_callback_query_queues
                            .get_mut(&user_id)
                            .map(|q| q.has_active_request = true);
                        self.send_td(
                            td::Function::GetStickerSet { set_id },
                            Box::new(move |client, result| {
                                match result {
                                    Ok(td::Object::StickerSet(set)) => {
                                        client
                                            .sticker_set_names
                                            .insert(set.id, set.name.clone());
                                    }
                                    _ => {
                                        // Unresolvable set; remember the gap
                                        // so the queue can't spin on it.
                                        client
                                            .sticker_set_names
                                            .insert(set_id, String::new());
                                    }
                                }
                                client.advance_callback_query(
                                    user_id,
                                    CallbackQueryState::CheckStickerSets,
                                );
                            }),
                        );
                        return;
                    }

                    let entry = self
                        .new_callback_query_queues
                        .get_mut(&user_id)
                        .and_then(|q| q.queue.pop_front())
                        .unwrap();
                    let body = crate::render::callback_query_json(self, &entry);
                    self.emit_update(
                        crate::update_types::UpdateKind::CallbackQuery,
                        entry.sender_user_id,
                        body,
                    );
                }
            }
        }
    }

    fn set_callback_query_state(&mut self, user_id: i64, state: CallbackQueryState) {
        if let Some(front) = self
            .new_callback_query_queues
            .get_mut(&user_id)
            .and_then(|q| q.queue.front_mut())
        {
            front.state = state;
        }
    }

    fn advance_callback_query(&mut self, user_id: i64, state: CallbackQueryState) {
        if let Some(queue) = self.new_callback_query_queues.get_mut(&user_id) {
            queue.has_active_request = false;
            if let Some(front) = queue.queue.front_mut() {
                front.state = state;
            }
        }
        self.process_callback_query_queue(user_id);
    }

    // --- Business-callback-query queue (per user) ---

    pub(crate) fn enqueue_business_callback_query(
        &mut self,
        id: i64,
        sender_user_id: i64,
        connection_id: String,
        message: td::BusinessMessage,
        chat_instance: i64,
        payload: td::CallbackPayload,
    ) {
        let mut info = MessageInfo::from_td(&message.message);
        info.business_connection_id = connection_id.clone();
        if let Some(reply) = &message.reply_to_message {
            info.business_reply_to_message = Some(Box::new(MessageInfo::from_td(reply)));
        }
        let queue = self
            .new_business_callback_query_queues
            .entry(sender_user_id)
            .or_default();
        queue.queue.push_back(PendingBusinessCallbackQuery {
            id,
            sender_user_id,
            connection_id,
            message: info,
            chat_instance,
            payload,
        });
        if !queue.has_active_request {
            self.process_business_callback_query_queue(sender_user_id);
        }
    }

    pub(crate) fn process_business_callback_query_queue(&mut self, user_id: i64) {
        loop {
            let Some(queue) = self.new_business_callback_query_queues.get_mut(&user_id) else {
                return;
            };
            if queue.has_active_request {
                return;
            }
            let Some(entry) = queue.queue.front() else {
                self.new_business_callback_query_queues.remove(&user_id);
                return;
            };

            let missing = entry
                .message
                .sticker_set_id()
                .into_iter()
                .chain(
                    entry
                        .message
                        .business_reply_to_message
                        .as_ref()
                        .and_then(|m| m.sticker_set_id()),
                )
                .find(|set_id| self.sticker_set_name(*set_id).is_none());

            if let Some(set_id) = missing {
                self.new_business_callback_query_queues
                    .get_mut(&user_id)
                    .map(|q| q.has_active_request = true);
                self.send_td(
                    td::Function::GetStickerSet { set_id },
                    Box::new(move |client, result| {
                        match result {
                            Ok(td::Object::StickerSet(set)) => {
                                client.sticker_set_names.insert(set.id, set.name.clone());
                            }
                            _ => {
                                client.sticker_set_names.insert(set_id, String::new());
                            }
                        }
                        if let Some(q) =
                            client.new_business_callback_query_queues.get_mut(&user_id)
                        {
                            q.has_active_request = false;
                        }
                        client.process_business_callback_query_queue(user_id);
                    }),
                );
                return;
            }

            let entry = self
                .new_business_callback_query_queues
                .get_mut(&user_id)
                .and_then(|q| q.queue.pop_front())
                .unwrap();
            let body = crate::render::business_callback_query_json(self, &entry);
            self.emit_update(
                crate::update_types::UpdateKind::CallbackQuery,
                entry.sender_user_id,
                body,
            );
        }
    }

    // --- Bot-username resolution (login-url buttons) ---

    /// Temporary negative id standing in for an unresolved @username.
    pub(crate) fn temp_bot_user_id(&mut self, username: &str) -> i64 {
        let folded = username.to_lowercase();
        if let Some(id) = self.resolved_bot_usernames.get(&folded) {
            return *id;
        }
        if let Some(id) = self.temp_bot_user_ids.get(&folded) {
            return *id;
        }
        let id = -1000 * self.next_temp_bot_user_id;
        self.next_temp_bot_user_id += 1;
        self.temp_bot_user_ids.insert(folded.clone(), id);
        self.temp_bot_usernames.insert(id, folded);
        id
    }

    /// Run `continuation` once every username referenced by the markup's
    /// login-url buttons has a real user id. Temporary ids are rewritten in
    /// place, keeping each button's request-write-access sign.
    pub(crate) fn with_resolved_markup(
        &mut self,
        query: Query,
        markup: Option<td::ReplyMarkup>,
        continuation: MarkupContinuation,
    ) {
        let unresolved = markup
            .as_ref()
            .map(|m| self.unresolved_usernames(m))
            .unwrap_or_default();
        if unresolved.is_empty() {
            continuation(self, query, markup);
            return;
        }

        let key = self.next_bot_resolve_key;
        self.next_bot_resolve_key += 1;
        self.pending_bot_resolve_queries.insert(
            key,
            PendingBotResolve {
                query: Some(query),
                markup,
                pending_count: unresolved.len(),
                failed_username: None,
                continuation: Some(continuation),
            },
        );

        for username in unresolved {
            self.awaiting_bot_usernames
                .entry(username.clone())
                .or_default()
                .push(key);
            // One outstanding search per username at a time.
            if self.active_bot_resolves.insert(username.clone()) {
                let lookup = username.clone();
                self.send_td(
                    td::Function::SearchPublicChat {
                        username: username.clone(),
                    },
                    Box::new(move |client, result| {
                        let resolved = match result {
                            Ok(td::Object::Chat(chat)) => match chat.kind {
                                td::ChatKind::Private { user_id } => client
                                    .users
                                    .get(&user_id)
                                    .filter(|u| u.is_bot())
                                    .map(|_| user_id),
                                _ => None,
                            },
                            _ => None,
                        };
                        client.on_bot_username_result(&lookup, resolved);
                    }),
                );
            }
        }
    }

    fn unresolved_usernames(&self, markup: &td::ReplyMarkup) -> Vec<String> {
        let td::ReplyMarkup::InlineKeyboard { rows } = markup else {
            return Vec::new();
        };
        let mut usernames = Vec::new();
        for row in rows {
            for button in row {
                if let td::InlineButtonKind::LoginUrl { id, .. } = &button.kind {
                    let magnitude = id.unsigned_abs() as i64;
                    if let Some(username) = self.temp_bot_usernames.get(&-magnitude)
                        && !usernames.contains(username)
                    {
                        usernames.push(username.clone());
                    }
                }
            }
        }
        usernames
    }

    pub(crate) fn on_bot_username_result(&mut self, username: &str, resolved: Option<i64>) {
        self.active_bot_resolves.remove(username);
        if let Some(user_id) = resolved {
            self.resolved_bot_usernames
                .insert(username.to_string(), user_id);
        }
        let Some(waiting) = self.awaiting_bot_usernames.remove(username) else {
            return;
        };
        for key in waiting {
            let Some(pending) = self.pending_bot_resolve_queries.get_mut(&key) else {
                continue;
            };
            if resolved.is_none() && pending.failed_username.is_none() {
                pending.failed_username = Some(username.to_string());
            }
            pending.pending_count -= 1;
            if pending.pending_count > 0 {
                continue;
            }

            let mut pending = self.pending_bot_resolve_queries.remove(&key).unwrap();
            let mut query = pending.query.take().unwrap();
            if let Some(failed) = &pending.failed_username {
                let error =
                    ApiError::bad_request(format!("bot \"{failed}\" not found"));
                query.answer_error(&error);
                continue;
            }
            let markup = pending.markup.take().map(|m| self.rewrite_markup(m));
            if let Some(continuation) = pending.continuation.take() {
                continuation(self, query, markup);
            }
        }
    }

    fn rewrite_markup(&self, mut markup: td::ReplyMarkup) -> td::ReplyMarkup {
        if let td::ReplyMarkup::InlineKeyboard { rows } = &mut markup {
            for row in rows {
                for button in row.iter_mut() {
                    if let td::InlineButtonKind::LoginUrl { id, .. } = &mut button.kind {
                        let magnitude = id.unsigned_abs() as i64;
                        if let Some(username) = self.temp_bot_usernames.get(&-magnitude)
                            && let Some(real) = self.resolved_bot_usernames.get(username)
                        {
                            *id = if *id < 0 { -*real } else { *real };
                        }
                    }
                }
            }
        }
        markup
    }
}

pub type MarkupContinuation =
    Box<dyn FnOnce(&mut Client, Query, Option<td::ReplyMarkup>) + Send>;

pub struct PendingBotResolve {
    pub query: Option<Query>,
    pub markup: Option<td::ReplyMarkup>,
    pub pending_count: usize,
    pub failed_username: Option<String>,
    pub continuation: Option<MarkupContinuation>,
}

#[derive(Debug)]
pub struct PendingBusinessMessage {
    pub message: MessageInfo,
    pub is_edited: bool,
    pub content_sticker_fetched: bool,
    pub reply_sticker_fetched: bool,
}

#[derive(Debug, Default)]
pub struct BusinessMessageQueue {
    pub queue: std::collections::VecDeque<PendingBusinessMessage>,
    pub has_active_request: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackQueryState {
    CheckMessage,
    CheckReply,
    CheckStickerSets,
}

#[derive(Debug)]
pub struct PendingCallbackQuery {
    pub id: i64,
    pub sender_user_id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub chat_instance: i64,
    pub payload: td::CallbackPayload,
    pub state: CallbackQueryState,
}

#[derive(Debug, Default)]
pub struct CallbackQueryQueue {
    pub queue: std::collections::VecDeque<PendingCallbackQuery>,
    pub has_active_request: bool,
}

#[derive(Debug)]
pub struct PendingBusinessCallbackQuery {
    pub id: i64,
    pub sender_user_id: i64,
    pub connection_id: String,
    pub message: MessageInfo,
    pub chat_instance: i64,
    pub payload: td::CallbackPayload,
}

#[derive(Debug, Default)]
pub struct BusinessCallbackQueryQueue {
    pub queue: std::collections::VecDeque<PendingBusinessCallbackQuery>,
    pub has_active_request: bool,
}
