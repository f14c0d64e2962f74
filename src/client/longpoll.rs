// Long-poll coordinator: blocking getUpdates semantics over the TQueue.

use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::query::Query;
use crate::td;

use super::{Client, Wake};

/// Hard ceiling on how long one getUpdates may stay parked.
const LONG_POLL_MAX_TIMEOUT: u64 = 50;
/// Once a parked poll has been woken, it must complete within this bound
/// even if the coalescing flush is delayed.
const LONG_POLL_MAX_DELAY: Duration = Duration::from_secs(10);
/// Burst-coalescing delay between the first wakeup and the flush.
const LONG_POLL_WAIT_AFTER: Duration = Duration::from_millis(500);
/// Response budget: roughly this much serialized JSON per poll.
const MAX_RESPONSE_BYTES: usize = 4 << 20;

pub struct ParkedGetUpdates {
    pub query: Query,
    pub offset: i64,
    pub limit: usize,
    pub generation: u64,
    pub woken: bool,
}

impl Client {
    pub(crate) fn get_updates(&mut self, mut query: Query) {
        if self.webhook.is_active() || self.webhook.is_installing() {
            query.answer_error(&ApiError::raw(
                409,
                "Conflict: can't use getUpdates method while webhook is active; use \
                 deleteWebhook to delete the webhook first",
            ));
            return;
        }

        let mut offset: i64 = query
            .arg("offset")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let mut limit: usize = query
            .arg("limit")
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);
        limit = limit.clamp(1, 100);
        let mut timeout: u64 = query
            .arg("timeout")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        if let Some(allowed) = query.arg("allowed_updates") {
            self.update_allowed_updates(allowed);
        }

        // Anti-hammer: clients re-polling the same cursor too fast get
        // slowed down instead of served.
        if let Some(last_at) = self.last_get_updates_at
            && offset == self.last_get_updates_offset
        {
            let elapsed = last_at.elapsed();
            if elapsed < Duration::from_millis(500) {
                limit = 1;
                timeout = timeout.max(3);
            } else if elapsed < Duration::from_secs(3) {
                timeout = timeout.max(3);
            }
        }
        self.last_get_updates_offset = offset;
        self.last_get_updates_at = Some(Instant::now());

        // A fresh getUpdates displaces any parked one.
        if let Some(mut parked) = self.parked_get_updates.take() {
            parked.query.answer_error(&ApiError::raw(
                409,
                "Conflict: terminated by other getUpdates request",
            ));
        }

        let now = self.unix_time();
        if offset < 0 {
            self.tqueue
                .truncate_head(self.tqueue_id, (-offset) as usize, now);
            offset = 0;
        } else if offset > 0 {
            self.tqueue.forget_before(self.tqueue_id, offset);
        }

        let updates = self.collect_updates(offset, limit);
        if !updates.is_empty() || timeout == 0 {
            query.answer_ok(serde_json::Value::Array(updates));
            return;
        }

        self.longpoll_generation += 1;
        let generation = self.longpoll_generation;
        self.parked_get_updates = Some(ParkedGetUpdates {
            query,
            offset,
            limit,
            generation,
            woken: false,
        });
        let hard = timeout.min(LONG_POLL_MAX_TIMEOUT);
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(hard)).await;
            let _ = tx.send(super::ClientMsg::Wake(Wake::LongPollTimeout { generation }));
        });
    }

    fn collect_updates(&self, from_id: i64, limit: usize) -> Vec<serde_json::Value> {
        let now = self.unix_time();
        let events = self.tqueue.get(self.tqueue_id, from_id, limit, now);
        let mut budget = MAX_RESPONSE_BYTES;
        let mut updates = Vec::new();
        for event in events {
            if event.data.len() > budget && !updates.is_empty() {
                break;
            }
            budget = budget.saturating_sub(event.data.len());
            if let Some(update) = super::emit::stored_update_value(&event) {
                updates.push(update);
            }
        }
        updates
    }

    /// Called by the emitter on every push while no webhook is installed.
    /// The first wakeup schedules the near-future flush and caps the hard
    /// timeout so the poll cannot stay parked past `LONG_POLL_MAX_DELAY`.
    pub(crate) fn wake_long_poll(&mut self) {
        let Some(parked) = self.parked_get_updates.as_mut() else {
            return;
        };
        if parked.woken {
            return;
        }
        parked.woken = true;
        let generation = parked.generation;
        let flush_tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(LONG_POLL_WAIT_AFTER).await;
            let _ = flush_tx.send(super::ClientMsg::Wake(Wake::LongPollFlush { generation }));
        });
        let timeout_tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(LONG_POLL_MAX_DELAY).await;
            let _ =
                timeout_tx.send(super::ClientMsg::Wake(Wake::LongPollTimeout { generation }));
        });
    }

    pub(crate) fn on_longpoll_flush(&mut self, generation: u64) {
        self.complete_parked(generation);
    }

    pub(crate) fn on_longpoll_timeout(&mut self, generation: u64) {
        self.complete_parked(generation);
    }

    fn complete_parked(&mut self, generation: u64) {
        let matches = self
            .parked_get_updates
            .as_ref()
            .map(|p| p.generation == generation)
            .unwrap_or(false);
        if !matches {
            return;
        }
        let mut parked = self.parked_get_updates.take().unwrap();
        let updates = self.collect_updates(parked.offset, parked.limit);
        parked.query.answer_ok(serde_json::Value::Array(updates));
    }

    /// Mode switch: a successful setWebhook terminates the parked poll.
    pub(crate) fn fail_parked_for_webhook(&mut self) {
        if let Some(mut parked) = self.parked_get_updates.take() {
            parked.query.answer_error(&ApiError::raw(
                409,
                "Conflict: terminated by setWebhook request",
            ));
        }
    }

    pub(crate) fn cancel_long_poll(&mut self, error: &ApiError) {
        if let Some(mut parked) = self.parked_get_updates.take() {
            parked.query.answer_error(error);
        }
    }

    /// Replace the mask and persist it through the native option channel so
    /// it survives a restart.
    pub(crate) fn update_allowed_updates(&mut self, raw: &str) {
        let mask = crate::update_types::AllowedUpdates::parse(raw);
        self.allowed_update_types = mask;
        self.send_td(
            td::Function::SetOption {
                name: "xallowed_update_types".to_string(),
                value: td::OptionValue::Integer(mask.to_stored()),
            },
            Box::new(|_, _| {}),
        );
    }
}
