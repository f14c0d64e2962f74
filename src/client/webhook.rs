// Webhook coordinator: owns set/delete/replace of the webhook target, the
// optional client certificate, and the delivery-actor lifecycle. The actor
// itself lives in `crate::webhooks`; only lifecycle traffic crosses here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::query::Query;
use crate::update_types::AllowedUpdates;
use crate::webhooks::{Callback, WebhookHandle, WebhookParams};

use super::{Client, ClientMsg, Wake};

const DEFAULT_MAX_CONNECTIONS: i32 = 40;
/// Pending-update backlog above which delivery errors become the bot's
/// visible updates-status warning.
const WARNING_BACKLOG: usize = 100;

#[derive(Default)]
pub struct WebhookState {
    pub active: Option<ActiveWebhook>,
    pub install: Option<WebhookInstall>,
    pub last_error_date: i64,
    pub last_error_message: String,
    pub last_change_at: Option<Instant>,
    pub updates_warning: Option<String>,
}

pub struct ActiveWebhook {
    pub params: WebhookParams,
    pub handle: WebhookHandle,
    pub cached_ip: String,
    pub cert_fingerprint: Option<String>,
    pub verified: bool,
}

/// One in-flight setWebhook / deleteWebhook change.
pub struct WebhookInstall {
    pub query: Option<Query>,
    /// None for a plain delete.
    pub params: Option<WebhookParams>,
    pub cert_bytes: Option<Vec<u8>>,
    pub cert_fingerprint: Option<String>,
    pub drop_pending_updates: bool,
    pub waiting_for_close: bool,
}

impl WebhookState {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_installing(&self) -> bool {
        self.install
            .as_ref()
            .map(|i| i.params.is_some())
            .unwrap_or(false)
    }
}

impl Client {
    pub(crate) fn set_webhook(&mut self, mut query: Query, delete: bool) {
        if self.webhook.install.is_some() {
            query.answer_error(&ApiError::too_many_requests(1));
            return;
        }
        if let Some(last) = self.webhook.last_change_at
            && last.elapsed() < Duration::from_secs(1)
        {
            query.answer_error(&ApiError::too_many_requests(1));
            return;
        }

        let url = if delete {
            String::new()
        } else {
            query.arg("url").unwrap_or("").trim().to_string()
        };
        let drop_pending_updates = query
            .arg("drop_pending_updates")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if url.is_empty() {
            self.webhook.last_change_at = Some(Instant::now());
            self.start_delete(query, drop_pending_updates);
            return;
        }

        // Validation of the full parameter set.
        if !url.starts_with("https://") {
            query.answer_error(&ApiError::bad_request(
                "bad webhook: HTTPS url must be provided for webhook",
            ));
            return;
        }
        let max_limit = if self.settings.local_mode { 100_000 } else { 100 };
        let max_connections: i32 = query
            .arg("max_connections")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections < 1 || max_connections > max_limit {
            query.answer_error(&ApiError::bad_request(
                "bad webhook: maximum webhook connections must be between 1 and 100",
            ));
            return;
        }
        let secret_token = query.arg("secret_token").unwrap_or("").to_string();
        if secret_token.len() > 256 {
            query.answer_error(&ApiError::bad_request("secret token is too long"));
            return;
        }
        if !secret_token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            query.answer_error(&ApiError::bad_request(
                "secret token contains unallowed characters",
            ));
            return;
        }
        let ip_address = query.arg("ip_address").unwrap_or("").to_string();
        let fix_ip_address = query
            .arg("fix_ip_address")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let cert_bytes = query.file("certificate").map(|f| f.data.clone());
        let cert_fingerprint = cert_bytes
            .as_ref()
            .map(|bytes| hex::encode(Sha256::digest(bytes)));

        if let Some(allowed) = query.arg("allowed_updates") {
            self.update_allowed_updates(allowed);
        }

        let params = WebhookParams {
            url,
            ip_address,
            max_connections,
            secret_token,
            fix_ip_address,
            cert_path: cert_bytes
                .as_ref()
                .map(|_| self.webhook_cert_path()),
        };

        // Re-posting identical parameters only refreshes the mask.
        if let Some(active) = &self.webhook.active
            && active.params == params
            && active.cert_fingerprint == cert_fingerprint
            && !drop_pending_updates
        {
            self.persist_webhook();
            query.answer_ok_described(serde_json::json!(true), "Webhook is already set");
            return;
        }

        self.webhook.last_change_at = Some(Instant::now());
        self.fail_parked_for_webhook();

        let mut install = WebhookInstall {
            query: Some(query),
            params: Some(params),
            cert_bytes,
            cert_fingerprint,
            drop_pending_updates,
            waiting_for_close: false,
        };

        if let Some(active) = &self.webhook.active {
            // Close the old target first; installation resumes from the
            // closed-callback.
            install.waiting_for_close = true;
            active.handle.close();
            self.webhook.install = Some(install);
            return;
        }
        self.webhook.install = Some(install);
        self.continue_install();
    }

    fn start_delete(&mut self, mut query: Query, drop_pending_updates: bool) {
        if drop_pending_updates {
            self.tqueue.clear(self.tqueue_id);
        }
        match &self.webhook.active {
            Some(active) => {
                self.webhook.install = Some(WebhookInstall {
                    query: Some(query),
                    params: None,
                    cert_bytes: None,
                    cert_fingerprint: None,
                    drop_pending_updates,
                    waiting_for_close: true,
                });
                active.handle.close();
            }
            None => {
                self.webhook_db
                    .delete(&self.settings.webhook_key(&self.token));
                query.answer_ok_described(
                    serde_json::json!(true),
                    "Webhook is already deleted",
                );
            }
        }
    }

    /// Next step of the in-flight install, entered initially and from the
    /// closed- and cert-saved callbacks.
    fn continue_install(&mut self) {
        let Some(install) = &mut self.webhook.install else {
            return;
        };
        if install.waiting_for_close {
            return;
        }
        let Some(params) = install.params.clone() else {
            // Delete path: old actor is gone, finish up.
            let mut install = self.webhook.install.take().unwrap();
            self.webhook_db
                .delete(&self.settings.webhook_key(&self.token));
            if let Some(mut query) = install.query.take() {
                query.answer_ok_described(serde_json::json!(true), "Webhook was deleted");
            }
            return;
        };

        if let Some(cert) = install.cert_bytes.take() {
            // Certificate lands on disk off the actor thread.
            let path = self.webhook_cert_path();
            let tx = self.self_tx.clone();
            tokio::task::spawn_blocking(move || {
                let result = (|| {
                    if let Some(parent) = std::path::Path::new(&path).parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &cert)
                })()
                .map_err(|e| e.to_string());
                let _ = tx.send(ClientMsg::Wake(Wake::CertSaved { result }));
            });
            return;
        }

        if install.drop_pending_updates {
            self.tqueue.clear(self.tqueue_id);
        }

        self.webhook_generation += 1;
        let generation = self.webhook_generation;
        let tx = self.self_tx.clone();
        let callbacks: crate::webhooks::CallbackFn = Arc::new(move |callback| {
            let _ = tx.send(ClientMsg::WebhookCallback {
                generation,
                callback,
            });
        });
        let handle =
            self.connector
                .spawn(params.clone(), self.tqueue.clone(), self.tqueue_id, callbacks);
        let fingerprint = self
            .webhook
            .install
            .as_ref()
            .and_then(|i| i.cert_fingerprint.clone());
        self.webhook.active = Some(ActiveWebhook {
            params,
            handle,
            cached_ip: String::new(),
            cert_fingerprint: fingerprint,
            verified: false,
        });
    }

    pub(crate) fn on_cert_saved(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => self.continue_install(),
            Err(message) => {
                eprintln!("Bot {}: certificate write failed: {message}", self.bot_user_id);
                if let Some(mut install) = self.webhook.install.take()
                    && let Some(mut query) = install.query.take()
                {
                    query.answer_error(&ApiError::internal("failed to save certificate"));
                }
            }
        }
    }

    pub(crate) fn on_webhook_callback(&mut self, generation: u64, callback: Callback) {
        if generation != self.webhook_generation {
            // A stale actor outlived its replacement; only a Closed event a
            // pending install is waiting on still matters.
            if matches!(callback, Callback::Closed)
                && let Some(install) = &mut self.webhook.install
                && install.waiting_for_close
            {
                install.waiting_for_close = false;
                self.continue_install();
            }
            return;
        }
        match callback {
            Callback::Verified { cached_ip } => {
                if let Some(active) = &mut self.webhook.active {
                    active.verified = true;
                    active.cached_ip = cached_ip;
                }
                self.persist_webhook();
                if let Some(mut install) = self.webhook.install.take()
                    && let Some(mut query) = install.query.take()
                {
                    query.answer_ok_described(serde_json::json!(true), "Webhook was set");
                }
            }
            Callback::Success => {
                self.webhook.updates_warning = None;
            }
            Callback::Error { status: _, message } => {
                self.webhook.last_error_date = self.unix_time();
                self.webhook.last_error_message = message.clone();
                let backlog = self.tqueue.size(self.tqueue_id, self.unix_time());
                if backlog > WARNING_BACKLOG {
                    self.webhook.updates_warning = Some(message);
                }
            }
            Callback::Closed => self.on_webhook_closed(),
        }
    }

    fn on_webhook_closed(&mut self) {
        let had_cert = self
            .webhook
            .active
            .take()
            .map(|a| a.cert_fingerprint.is_some())
            .unwrap_or(false);
        // Keep the file when the pending install is about to write its own
        // certificate to the same path.
        let replacing_cert = self
            .webhook
            .install
            .as_ref()
            .map(|i| i.cert_fingerprint.is_some())
            .unwrap_or(false);
        if had_cert && !replacing_cert {
            let path = self.webhook_cert_path();
            tokio::task::spawn_blocking(move || {
                std::fs::remove_file(&path).ok();
            });
        }
        match &mut self.webhook.install {
            Some(install) => {
                install.waiting_for_close = false;
                self.continue_install();
            }
            None => {
                // Closed outside any change we initiated: forget it.
                self.webhook_db
                    .delete(&self.settings.webhook_key(&self.token));
            }
        }
    }

    pub(crate) fn notify_webhook_actor(&self) {
        if let Some(active) = &self.webhook.active {
            active.handle.notify();
        }
    }

    /// Teardown on client close: stop the actor without touching
    /// persistence, so the webhook survives a restart.
    pub(crate) fn shutdown_webhook_actor(&mut self) {
        self.webhook_generation += 1;
        if let Some(active) = self.webhook.active.take() {
            active.handle.close();
        }
        if let Some(mut install) = self.webhook.install.take()
            && let Some(mut query) = install.query.take()
        {
            let error = self.closing_error();
            query.answer_error(&error);
        }
    }

    // --- Persistence ---

    fn webhook_cert_path(&self) -> String {
        format!("{}/cert.pem", self.settings.bot_dir(self.bot_user_id))
    }

    pub(crate) fn persist_webhook(&self) {
        let Some(active) = &self.webhook.active else {
            return;
        };
        let info = encode_webhook_info(
            &active.params,
            active.cert_fingerprint.is_some(),
            self.allowed_update_types,
        );
        self.webhook_db
            .save(&self.settings.webhook_key(&self.token), &info);
    }

    /// Restore a persisted webhook when the client actor starts.
    pub(crate) fn restore_webhook(&mut self) {
        let Some(info) = self
            .webhook_db
            .load(&self.settings.webhook_key(&self.token))
        else {
            return;
        };
        let Some((mut params, has_cert, allowed)) = decode_webhook_info(&info) else {
            return;
        };
        if let Some(mask) = allowed {
            self.allowed_update_types = mask;
        }
        if has_cert {
            params.cert_path = Some(self.webhook_cert_path());
        }
        self.webhook_generation += 1;
        let generation = self.webhook_generation;
        let tx = self.self_tx.clone();
        let callbacks: crate::webhooks::CallbackFn = Arc::new(move |callback| {
            let _ = tx.send(ClientMsg::WebhookCallback {
                generation,
                callback,
            });
        });
        let handle =
            self.connector
                .spawn(params.clone(), self.tqueue.clone(), self.tqueue_id, callbacks);
        self.webhook.active = Some(ActiveWebhook {
            cert_fingerprint: has_cert.then(String::new),
            params,
            handle,
            cached_ip: String::new(),
            verified: true,
        });
    }

    pub(crate) fn webhook_info_json(&self) -> serde_json::Value {
        let now = self.unix_time();
        let pending = self.tqueue.size(self.tqueue_id, now);
        match &self.webhook.active {
            Some(active) => {
                let mut info = serde_json::json!({
                    "url": active.params.url,
                    "has_custom_certificate": active.cert_fingerprint.is_some(),
                    "pending_update_count": pending,
                    "max_connections": active.params.max_connections,
                });
                if !active.cached_ip.is_empty() {
                    info["ip_address"] = serde_json::json!(active.cached_ip);
                } else if !active.params.ip_address.is_empty() {
                    info["ip_address"] = serde_json::json!(active.params.ip_address);
                }
                if self.webhook.last_error_date != 0 {
                    info["last_error_date"] = serde_json::json!(self.webhook.last_error_date);
                    info["last_error_message"] =
                        serde_json::json!(self.webhook.last_error_message);
                }
                if let Some(date) = self.last_synchronization_error_date {
                    info["last_synchronization_error_date"] = serde_json::json!(date);
                }
                if self.allowed_update_types != AllowedUpdates::DEFAULT {
                    info["allowed_updates"] =
                        serde_json::json!(self.allowed_update_types.names());
                }
                info
            }
            None => serde_json::json!({
                "url": "",
                "has_custom_certificate": false,
                "pending_update_count": pending,
            }),
        }
    }
}

/// Encode webhook parameters into the single opaque persistence string:
/// markers first, URL last.
pub(crate) fn encode_webhook_info(
    params: &WebhookParams,
    has_cert: bool,
    allowed: AllowedUpdates,
) -> String {
    let mut info = String::new();
    if has_cert {
        info.push_str("cert/");
    }
    if params.max_connections != DEFAULT_MAX_CONNECTIONS {
        info.push_str(&format!("#maxc{}/", params.max_connections));
    }
    if !params.ip_address.is_empty() {
        info.push_str(&format!("#ip{}/", params.ip_address));
    }
    if params.fix_ip_address {
        info.push_str("#fix_ip/");
    }
    if !params.secret_token.is_empty() {
        info.push_str(&format!("#secret{}/", params.secret_token));
    }
    if allowed != AllowedUpdates::DEFAULT {
        info.push_str(&format!("#allow{}/", allowed.0));
    }
    info.push_str(&params.url);
    info
}

pub(crate) fn decode_webhook_info(
    info: &str,
) -> Option<(WebhookParams, bool, Option<AllowedUpdates>)> {
    let mut rest = info;
    let mut params = WebhookParams {
        url: String::new(),
        ip_address: String::new(),
        max_connections: DEFAULT_MAX_CONNECTIONS,
        secret_token: String::new(),
        fix_ip_address: false,
        cert_path: None,
    };
    let mut has_cert = false;
    let mut allowed = None;

    if let Some(tail) = rest.strip_prefix("cert/") {
        has_cert = true;
        rest = tail;
    }
    while rest.starts_with('#') {
        let (marker, tail) = rest[1..].split_once('/')?;
        rest = tail;
        if let Some(value) = marker.strip_prefix("maxc") {
            params.max_connections = value.parse().ok()?;
        } else if let Some(value) = marker.strip_prefix("ip") {
            params.ip_address = value.to_string();
        } else if marker == "fix_ip" {
            params.fix_ip_address = true;
        } else if let Some(value) = marker.strip_prefix("secret") {
            params.secret_token = value.to_string();
        } else if let Some(value) = marker.strip_prefix("allow") {
            allowed = Some(AllowedUpdates(value.parse().ok()?));
        } else {
            return None;
        }
    }
    if rest.is_empty() {
        return None;
    }
    params.url = rest.to_string();
    Some((params, has_cert, allowed))
}
