// Send-message tracker: correlates outbound sends with the asynchronous
// send-succeeded / send-failed events, aggregates multi-sends, and enforces
// the per-chat concurrent-send cap.

use crate::error::ApiError;
use crate::limits::{MAX_CONCURRENTLY_SENT_CHAT_MESSAGES, SEND_CAP_DEBOUNCE};
use crate::models::MessageInfo;
use crate::query::Query;
use crate::td;

use super::{Client, Wake};

/// Where one yet-unsent message reports back to.
#[derive(Debug, Clone, Copy)]
pub struct UnsentRef {
    pub key: u64,
    pub position: usize,
}

pub struct PendingSend {
    pub query: Query,
    pub chat_id: i64,
    pub total_count: usize,
    pub awaited_count: usize,
    pub results: Vec<serde_json::Value>,
    pub error: Option<ApiError>,
    pub error_is_terminal: bool,
    pub is_multisend: bool,
    /// copyMessages answers bare message ids instead of full messages.
    pub copy_ids_only: bool,
}

impl Client {
    /// Admission plus dispatch for every outbound send. `expected_count` is
    /// the number of provisional messages the native call will produce.
    pub(crate) fn send_and_track(
        &mut self,
        query: Query,
        chat_id: i64,
        function: td::Function,
        expected_count: usize,
        copy_ids_only: bool,
    ) {
        let in_flight = self
            .yet_unsent_message_count
            .get(&chat_id)
            .copied()
            .unwrap_or(0);
        if in_flight + expected_count as u32 > MAX_CONCURRENTLY_SENT_CHAT_MESSAGES {
            // Debounced synthetic flood error; the native client never sees
            // this query.
            self.schedule_wake(
                SEND_CAP_DEBOUNCE,
                |query| Wake::FailQuery {
                    query,
                    error: ApiError::too_many_requests(60),
                },
                query,
            );
            return;
        }

        *self.yet_unsent_message_count.entry(chat_id).or_insert(0) +=
            expected_count as u32;

        let key = self.next_send_query_key;
        self.next_send_query_key += 1;
        self.pending_send_queries.insert(
            key,
            PendingSend {
                query,
                chat_id,
                total_count: expected_count,
                awaited_count: expected_count,
                results: vec![serde_json::Value::Null; expected_count],
                error: None,
                error_is_terminal: false,
                is_multisend: expected_count > 1,
                copy_ids_only,
            },
        );

        self.send_td(
            function,
            Box::new(move |client, result| match result {
                Ok(td::Object::Message(message)) => {
                    client.register_unsent(key, 0, message.as_ref());
                }
                Ok(td::Object::Messages(messages)) => {
                    for (position, message) in messages.into_iter().enumerate() {
                        match message {
                            Some(message) => {
                                client.register_unsent(key, position, &message)
                            }
                            None => {
                                // Never materialized: release its slot now.
                                client.decrement_unsent_count(chat_id, 1);
                                client.settle_send_failure(
                                    key,
                                    position,
                                    td::TdError::new(400, "Group send failed"),
                                );
                            }
                        }
                    }
                }
                Ok(_) => client.abort_send(key, td::TdError::new(500, "Unexpected response")),
                Err(error) => client.abort_send(key, error),
            }),
        );
    }

    fn register_unsent(&mut self, key: u64, position: usize, message: &td::Message) {
        self.yet_unsent_messages
            .insert((message.chat_id, message.id), UnsentRef { key, position });
    }

    /// The native call itself failed; nothing was ever registered.
    fn abort_send(&mut self, key: u64, error: td::TdError) {
        let Some(mut pending) = self.pending_send_queries.remove(&key) else {
            return;
        };
        if let Some(count) = self.yet_unsent_message_count.get_mut(&pending.chat_id) {
            *count = count.saturating_sub(pending.total_count as u32);
            if *count == 0 {
                self.yet_unsent_message_count.remove(&pending.chat_id);
            }
        }
        let api_error = crate::error::from_td_error(error.code, &error.message);
        pending.query.answer_error(&api_error);
    }

    pub(crate) fn on_message_send_succeeded(
        &mut self,
        message: td::Message,
        old_message_id: i64,
    ) {
        let chat_id = message.chat_id;
        self.remove_cached_message(chat_id, old_message_id);
        let info = MessageInfo::from_td(&message);
        self.add_cached_message(info);

        let Some(unsent) = self.yet_unsent_messages.remove(&(chat_id, old_message_id)) else {
            return;
        };
        self.decrement_unsent_count(chat_id, 1);

        let rendered = {
            let info = self.message(chat_id, message.id).cloned();
            match (&info, self.pending_send_queries.get(&unsent.key)) {
                (Some(info), Some(pending)) if pending.copy_ids_only => {
                    serde_json::json!({
                        "message_id": td::message_id::to_client(info.id).unwrap_or(0)
                    })
                }
                (Some(info), Some(_)) => crate::render::message_json(self, info),
                _ => serde_json::Value::Null,
            }
        };

        if let Some(pending) = self.pending_send_queries.get_mut(&unsent.key) {
            pending.results[unsent.position] = rendered;
            pending.awaited_count -= 1;
        }
        self.finish_send_if_done(unsent.key);
    }

    pub(crate) fn on_message_send_failed(
        &mut self,
        chat_id: i64,
        old_message_id: i64,
        new_message_id: i64,
        error: td::TdError,
    ) {
        self.remove_cached_message(chat_id, old_message_id);

        // A message that got a real id before failing is an orphan on the
        // server; delete it best-effort.
        if new_message_id != 0 {
            self.send_td(
                td::Function::DeleteMessages {
                    chat_id,
                    message_ids: vec![new_message_id],
                    revoke: true,
                },
                Box::new(|_, _| {}),
            );
        }

        let Some(unsent) = self.yet_unsent_messages.remove(&(chat_id, old_message_id)) else {
            return;
        };
        self.decrement_unsent_count(chat_id, 1);
        self.settle_send_failure(unsent.key, unsent.position, error);
    }

    fn settle_send_failure(&mut self, key: u64, position: usize, error: td::TdError) {
        if let Some(pending) = self.pending_send_queries.get_mut(&key) {
            let terminal = error.code == 401
                || error.code == 429
                || error.code >= 500
                || error.message == "Group send failed";
            let replace = match (&pending.error, terminal) {
                (None, _) => true,
                (Some(_), true) if !pending.error_is_terminal => true,
                _ => false,
            };
            if replace {
                let api_error = if pending.is_multisend && !terminal {
                    let base = crate::error::from_td_error(error.code, &error.message);
                    ApiError::raw(
                        base.code,
                        format!("Failed to send message #{}: {}", position + 1, base.message),
                    )
                } else {
                    crate::error::from_td_error(error.code, &error.message)
                };
                pending.error = Some(api_error);
                pending.error_is_terminal = terminal;
            }
            pending.awaited_count -= 1;
        }
        self.finish_send_if_done(key);
    }

    fn finish_send_if_done(&mut self, key: u64) {
        let done = self
            .pending_send_queries
            .get(&key)
            .map(|p| p.awaited_count == 0)
            .unwrap_or(false);
        if !done {
            return;
        }
        let mut pending = self.pending_send_queries.remove(&key).unwrap();
        if let Some(error) = &pending.error {
            pending.query.answer_error(error);
            return;
        }
        if pending.is_multisend {
            let results: Vec<serde_json::Value> = pending
                .results
                .iter()
                .filter(|v| !v.is_null())
                .cloned()
                .collect();
            pending.query.answer_ok(serde_json::Value::Array(results));
        } else {
            let result = pending.results.into_iter().next().unwrap_or_default();
            pending.query.answer_ok(result);
        }
    }

    fn decrement_unsent_count(&mut self, chat_id: i64, by: u32) {
        if let Some(count) = self.yet_unsent_message_count.get_mut(&chat_id) {
            *count = count.saturating_sub(by);
            if *count == 0 {
                self.yet_unsent_message_count.remove(&chat_id);
            }
        }
    }

    pub(crate) fn fail_all_pending_sends(&mut self, error: &ApiError) {
        self.yet_unsent_messages.clear();
        self.yet_unsent_message_count.clear();
        for (_, mut pending) in std::mem::take(&mut self.pending_send_queries) {
            pending.query.answer_error(error);
        }
    }
}
