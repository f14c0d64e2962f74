// Authorization & close FSM. State transitions arrive as
// `updateAuthorizationState` events from the native client; everything the
// gateway does in response lives here.

use std::time::{Duration, Instant};

use crate::td;

use super::Client;

impl Client {
    pub(crate) fn on_authorization_state(&mut self, state: td::AuthorizationState) {
        match state {
            td::AuthorizationState::WaitTdlibParameters => self.on_wait_parameters(),
            td::AuthorizationState::WaitPhoneNumber => self.on_wait_phone_number(),
            td::AuthorizationState::Ready => self.on_ready_state(),
            td::AuthorizationState::LoggingOut => {
                self.logging_out = true;
            }
            td::AuthorizationState::Closing => {
                self.closing = true;
            }
            td::AuthorizationState::Closed => self.on_closed(),
        }
    }

    fn on_wait_parameters(&mut self) {
        // Performance knobs first; the native client should neither collect
        // statistics nor second-guess file metadata for a server workload.
        let options: [(&str, td::OptionValue); 6] = [
            ("disable_network_statistics", td::OptionValue::Boolean(true)),
            ("disable_time_adjustment_protection", td::OptionValue::Boolean(true)),
            ("ignore_file_names", td::OptionValue::Boolean(true)),
            ("ignore_inline_thumbnails", td::OptionValue::Boolean(true)),
            ("reuse_uploaded_photos_by_hash", td::OptionValue::Boolean(true)),
            ("use_storage_optimizer", td::OptionValue::Boolean(true)),
        ];
        for (name, value) in options {
            self.send_td_unchecked(
                td::Function::SetOption {
                    name: name.to_string(),
                    value,
                },
                Box::new(|_, _| {}),
            );
        }
        let parameters = td::TdlibParameters {
            database_directory: self.settings.bot_dir(self.bot_user_id),
            use_test_dc: self.settings.test_dc,
            api_id: self.settings.api_id,
            api_hash: self.settings.api_hash.clone(),
            device_model: "server".to_string(),
            application_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        self.send_td_unchecked(
            td::Function::SetTdlibParameters(parameters),
            Box::new(|client, result| {
                if let Err(error) = result {
                    client.on_authorization_error(error);
                }
            }),
        );
    }

    fn on_wait_phone_number(&mut self) {
        if let Some(next) = self.next_authorization_time {
            let now = Instant::now();
            if next > now {
                // Backoff pending; a wakeup re-enters this state later.
                return;
            }
            self.next_authorization_time = None;
        }
        self.send_td_unchecked(
            td::Function::SetOption {
                name: "online".to_string(),
                value: td::OptionValue::Boolean(true),
            },
            Box::new(|_, _| {}),
        );
        let token = self.token.clone();
        self.send_td_unchecked(
            td::Function::CheckAuthenticationBotToken { token },
            Box::new(|client, result| {
                if let Err(error) = result {
                    client.on_authorization_error(error);
                }
            }),
        );
    }

    pub(crate) fn on_authorization_error(&mut self, error: td::TdError) {
        eprintln!(
            "Bot {} authorization error {}: {}",
            self.bot_user_id, error.code, error.message
        );
        if error.code == 401 && error.message.contains("API_ID_INVALID") {
            self.api_id_invalid = true;
            self.log_out(false);
            return;
        }
        if error.code == 401 && !self.was_authorized {
            self.log_out(false);
            return;
        }
        if error.code == 429 {
            let retry_after = error
                .message
                .rsplit(' ')
                .next()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            self.next_authorization_time = Some(Instant::now() + Duration::from_secs(retry_after));
            self.schedule_plain_wake(Duration::from_secs(retry_after), || super::Wake::AuthRetry);
            return;
        }
        if error.code >= 500 {
            self.schedule_plain_wake(Duration::from_secs(1), || super::Wake::AuthRetry);
        }
    }

    pub(crate) fn on_auth_retry(&mut self) {
        if self.closing || self.logging_out || self.is_ready {
            return;
        }
        self.next_authorization_time = None;
        self.on_wait_phone_number();
    }

    /// Queries queued before Ready nudge the FSM in case a backoff elapsed.
    pub(crate) fn try_start_authorization(&mut self) {
        if let Some(next) = self.next_authorization_time
            && next <= Instant::now()
        {
            self.on_auth_retry();
        }
    }

    fn on_ready_state(&mut self) {
        if self.bot_user_id == 0 || !self.users.contains_key(&self.bot_user_id) {
            self.send_td_unchecked(
                td::Function::GetMe,
                Box::new(|client, result| {
                    if let Ok(td::Object::User(user)) = result {
                        client.bot_user_id = user.id;
                        client.tqueue_id = user.id;
                        client.on_user_update(&user);
                    }
                    client.on_ready();
                }),
            );
            return;
        }
        self.on_ready();
    }

    fn on_ready(&mut self) {
        if self.is_ready {
            return;
        }
        self.is_ready = true;
        self.was_authorized = true;
        self.next_authorization_time = None;

        // Replay updates buffered during the login handshake, in order.
        while let Some(event) = self.pending_updates.pop_front() {
            self.handle_update(event);
        }
        // Then drain the HTTP queries that were waiting for authorization.
        while let Some(query) = self.cmd_queue.pop_front() {
            if self.closing || self.logging_out {
                let error = self.closing_error();
                let mut query = query;
                query.answer_error(&error);
                continue;
            }
            self.dispatch_query(query);
        }
    }

    // --- Close / logout ---

    pub(crate) fn close_client(&mut self, clear_tqueue: bool) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.clear_tqueue = clear_tqueue;
        self.send_td_unchecked(td::Function::Close, Box::new(|_, _| {}));
    }

    pub(crate) fn log_out(&mut self, clear_tqueue: bool) {
        if self.logging_out {
            return;
        }
        self.logging_out = true;
        self.clear_tqueue = clear_tqueue;
        self.send_td_unchecked(td::Function::LogOut, Box::new(|_, _| {}));
    }

    fn on_closed(&mut self) {
        let error = self.closing_error();

        // Every pending continuation is told the client is gone.
        let pending: Vec<u64> = self.pending_td_queries.keys().copied().collect();
        for query_id in pending {
            let td_error = td::TdError::new(500, "Request aborted");
            self.on_td_response(query_id, Err(td_error));
        }
        while let Some(mut query) = self.cmd_queue.pop_front() {
            query.answer_error(&error);
        }
        self.cancel_long_poll(&error);
        self.shutdown_webhook_actor();
        for (_, listeners) in std::mem::take(&mut self.file_download_listeners) {
            for mut query in listeners {
                query.answer_error(&error);
            }
        }
        self.fail_all_pending_sends(&error);

        if self.logging_out && self.clear_tqueue {
            self.tqueue.clear(self.tqueue_id);
            self.webhook_db
                .delete(&self.settings.webhook_key(&self.token));
            let dir = self.settings.bot_dir(self.bot_user_id);
            tokio::task::spawn_blocking(move || {
                std::fs::remove_dir_all(&dir).ok();
            });
        }

        self.finalized = true;
    }
}
