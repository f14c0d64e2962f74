// Update emitter: the single exit point through which updates reach the
// TQueue, tagged by kind and webhook queue id.

use crate::models::MessageInfo;
use crate::tqueue::RawEvent;
use crate::update_types::{UpdateKind, webhook_queue_id};

use super::Client;

/// Serialized updates above this size are dropped rather than buffered.
const MAX_UPDATE_SIZE: usize = 64 * 1024;

impl Client {
    pub(crate) fn emit_update(
        &mut self,
        kind: UpdateKind,
        subject_id: i64,
        body: serde_json::Value,
    ) {
        if !self.allowed_update_types.admits(kind) {
            return;
        }
        let payload = body.to_string();
        if payload.len() > MAX_UPDATE_SIZE {
            eprintln!(
                "Bot {}: dropping oversized {} update ({} bytes)",
                self.bot_user_id,
                kind.name(),
                payload.len()
            );
            return;
        }
        let data = format!("{} {}", kind.name(), payload);
        let expires_at = self.unix_time() + kind.ttl();
        let queue_tag = webhook_queue_id(kind, subject_id);
        self.tqueue.push(self.tqueue_id, data, expires_at, queue_tag);
        self.update_rate.record();

        if self.webhook.is_active() {
            self.notify_webhook_actor();
        } else {
            self.wake_long_poll();
        }
    }

    /// Messages leave through here once their resolution queue drains.
    pub(crate) fn emit_message_update(&mut self, chat_id: i64, message_id: i64, is_edited: bool) {
        let Some(info) = self.message(chat_id, message_id).cloned() else {
            return;
        };
        let freshness_date = if info.edit_date > 0 {
            info.edit_date
        } else {
            info.date
        };
        if (freshness_date as i64) < self.unix_time() - 86400 {
            return;
        }
        let kind = match (self.chat_is_channel(chat_id), is_edited) {
            (true, false) => UpdateKind::ChannelPost,
            (true, true) => UpdateKind::EditedChannelPost,
            (false, false) => UpdateKind::Message,
            (false, true) => UpdateKind::EditedMessage,
        };
        let body = crate::render::message_json(self, &info);
        self.emit_update(kind, chat_id, body);
    }

    pub(crate) fn emit_business_message_update(
        &mut self,
        _connection_id: &str,
        info: &MessageInfo,
        is_edited: bool,
    ) {
        let kind = if is_edited {
            UpdateKind::EditedBusinessMessage
        } else {
            UpdateKind::BusinessMessage
        };
        let body = crate::render::message_json(self, info);
        self.emit_update(kind, info.chat_id, body);
    }
}

/// Decode one stored TQueue payload back into `(kind name, body)`.
pub(crate) fn split_stored_update(data: &str) -> Option<(&str, serde_json::Value)> {
    let (kind, body) = data.split_once(' ')?;
    let value = serde_json::from_str(body).ok()?;
    Some((kind, value))
}

/// The full Bot-API update object for one stored event, as delivered to
/// webhooks and long polls: `{"update_id": N, "<kind>": body}`.
pub fn stored_update_to_json(event: &RawEvent) -> Option<String> {
    stored_update_value(event).map(|v| v.to_string())
}

pub(crate) fn stored_update_value(event: &RawEvent) -> Option<serde_json::Value> {
    let (kind, body) = split_stored_update(&event.data)?;
    let mut update = serde_json::Map::new();
    update.insert("update_id".to_string(), serde_json::json!(event.id));
    update.insert(kind.to_string(), body);
    Some(serde_json::Value::Object(update))
}
