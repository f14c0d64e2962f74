// Persistent-update-buffer collaborator. The storage format is the
// collaborator's business; this in-process implementation provides the
// operations the client engine relies on: monotonic per-queue event ids,
// TTL expiry, head truncation and FIFO order within a queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One buffered update: payload plus expiry and the per-subject ordering tag.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub id: i64,
    pub data: String,
    pub expires_at: i64,
    pub webhook_queue_id: i64,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: i64,
    events: VecDeque<RawEvent>,
}

impl Queue {
    fn prune(&mut self, now: i64) {
        while let Some(front) = self.events.front() {
            if front.expires_at <= now {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}

#[derive(Default)]
pub struct TQueue {
    queues: Mutex<HashMap<i64, Queue>>,
}

impl TQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event; returns its id. Ids are monotonic per queue and
    /// events with the same `webhook_queue_id` keep push order.
    pub fn push(&self, queue_id: i64, data: String, expires_at: i64, webhook_queue_id: i64) -> i64 {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let queue = queues.entry(queue_id).or_insert_with(|| Queue {
            next_id: 1,
            events: VecDeque::new(),
        });
        let id = queue.next_id;
        queue.next_id += 1;
        queue.events.push_back(RawEvent {
            id,
            data,
            expires_at,
            webhook_queue_id,
        });
        id
    }

    /// Events with `id >= from_id`, oldest first, at most `limit`, skipping
    /// anything already expired at `now`.
    pub fn get(&self, queue_id: i64, from_id: i64, limit: usize, now: i64) -> Vec<RawEvent> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let Some(queue) = queues.get_mut(&queue_id) else {
            return Vec::new();
        };
        queue.prune(now);
        queue
            .events
            .iter()
            .filter(|event| event.id >= from_id && event.expires_at > now)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Confirm (drop) every event with an id below `id`.
    pub fn forget_before(&self, queue_id: i64, id: i64) {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(queue) = queues.get_mut(&queue_id) {
            while let Some(front) = queue.events.front() {
                if front.id < id {
                    queue.events.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Drop the first `n` live events.
    pub fn truncate_head(&self, queue_id: i64, n: usize, now: i64) {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(queue) = queues.get_mut(&queue_id) {
            queue.prune(now);
            for _ in 0..n {
                if queue.events.pop_front().is_none() {
                    break;
                }
            }
        }
    }

    pub fn clear(&self, queue_id: i64) {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(queue) = queues.get_mut(&queue_id) {
            queue.events.clear();
        }
    }

    /// Id of the oldest live event, or the next id to be assigned when the
    /// queue is empty.
    pub fn head(&self, queue_id: i64, now: i64) -> i64 {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        match queues.get_mut(&queue_id) {
            Some(queue) => {
                queue.prune(now);
                queue
                    .events
                    .front()
                    .map(|event| event.id)
                    .unwrap_or(queue.next_id)
            }
            None => 1,
        }
    }

    /// The id the next push will get.
    pub fn tail(&self, queue_id: i64) -> i64 {
        let queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.get(&queue_id).map(|q| q.next_id).unwrap_or(1)
    }

    pub fn size(&self, queue_id: i64, now: i64) -> usize {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        match queues.get_mut(&queue_id) {
            Some(queue) => {
                queue.prune(now);
                queue.events.len()
            }
            None => 0,
        }
    }
}
