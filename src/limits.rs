// Flood & resource limiter: per-query admission against pending work, and a
// token-bucket pacer for large uploads. Fails fast locally before the native
// client would.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::ApiError;

/// Hard cap on in-flight sends per chat; sends over the cap are answered
/// with a synthetic 429 after a short debounce.
pub const MAX_CONCURRENTLY_SENT_CHAT_MESSAGES: u32 = 1000;

/// Debounce before the synthetic per-chat 429 is delivered.
pub const SEND_CAP_DEBOUNCE: Duration = Duration::from_secs(3);

/// Admission is skipped entirely during process warm-up.
pub const WARMUP: Duration = Duration::from_secs(60);

const MAX_ACTIVE_REQUESTS_BASE: u64 = 500;
const MAX_UPLOAD_BYTES: u64 = 4 << 30;
const MAX_UPLOAD_COUNT_BASE: u64 = 100;
const PACED_UPLOAD_MIN_SIZE: u64 = 100_000;
const PACER_MAX_WAIT: f64 = 5.0;
const PACER_CAPACITY: f64 = 1.0;

/// Counters the client actor derives from its own structures at admission
/// time; the limiter itself is stateless apart from the pacer buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSnapshot {
    pub active_request_count: u64,
    pub active_upload_bytes: u64,
    pub active_upload_count: u64,
    pub updates_per_minute: u64,
}

/// Outcome of one admission check.
#[derive(Debug)]
pub enum Admission {
    Allow,
    /// Put the query back through dispatch after the delay.
    Defer(Duration),
    Reject(ApiError),
}

pub struct FloodControl {
    started_at: Instant,
    pacer: UploadPacer,
}

impl FloodControl {
    pub fn new(started_at: Instant) -> Self {
        FloodControl {
            started_at,
            pacer: UploadPacer::default(),
        }
    }

    /// Per-request admission. Internal methods bypass this entirely; callers
    /// also skip it while the process is warming up.
    pub fn admit(
        &mut self,
        load: LoadSnapshot,
        has_files: bool,
        upload_size: u64,
        local_mode: bool,
    ) -> Admission {
        if self.started_at.elapsed() < WARMUP {
            return Admission::Allow;
        }
        if load.active_request_count > MAX_ACTIVE_REQUESTS_BASE + load.updates_per_minute {
            return Admission::Reject(ApiError::too_many_requests(60));
        }
        if has_files {
            if load.active_upload_bytes > MAX_UPLOAD_BYTES {
                return Admission::Reject(ApiError::too_many_requests(60));
            }
            if load.active_upload_count > MAX_UPLOAD_COUNT_BASE + load.updates_per_minute / 5 {
                return Admission::Reject(ApiError::too_many_requests(60));
            }
            if !local_mode && upload_size >= PACED_UPLOAD_MIN_SIZE {
                return self.pacer.schedule(upload_size);
            }
        }
        Admission::Allow
    }
}

/// Token bucket per upload-size class. The minimum spacing between two sends
/// of the same class grows with file size; a class accumulates at most one
/// second of credit, and anything queued more than five seconds out fails
/// with Retry-After instead of waiting.
#[derive(Default)]
struct UploadPacer {
    buckets: HashMap<u32, Bucket>,
}

struct Bucket {
    tokens: f64,
    refreshed_at: Instant,
}

impl UploadPacer {
    fn schedule(&mut self, size: u64) -> Admission {
        let cost = (size as f64 * 1e-7).clamp(0.2, 0.9);
        let now = Instant::now();
        let bucket = self.buckets.entry(size_class(size)).or_insert(Bucket {
            tokens: PACER_CAPACITY,
            refreshed_at: now,
        });
        let elapsed = now.duration_since(bucket.refreshed_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed).min(PACER_CAPACITY);
        bucket.refreshed_at = now;

        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            return Admission::Allow;
        }
        let wait = cost - bucket.tokens;
        if wait > PACER_MAX_WAIT {
            return Admission::Reject(ApiError::too_many_requests(60));
        }
        bucket.tokens -= cost;
        Admission::Defer(Duration::from_secs_f64(wait))
    }
}

/// Uploads of similar magnitude share one bucket.
fn size_class(size: u64) -> u32 {
    64 - size.leading_zeros()
}

/// Sliding one-minute counter used to scale the admission thresholds with
/// the bot's own update traffic.
pub struct MinuteRate {
    window_start: Instant,
    current: u64,
    previous: u64,
}

impl Default for MinuteRate {
    fn default() -> Self {
        MinuteRate {
            window_start: Instant::now(),
            current: 0,
            previous: 0,
        }
    }
}

impl MinuteRate {
    pub fn record(&mut self) {
        self.roll();
        self.current += 1;
    }

    pub fn per_minute(&mut self) -> u64 {
        self.roll();
        self.previous.max(self.current)
    }

    fn roll(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(120) {
            self.previous = 0;
            self.current = 0;
            self.window_start = Instant::now();
        } else if elapsed >= Duration::from_secs(60) {
            self.previous = self.current;
            self.current = 0;
            self.window_start += Duration::from_secs(60);
        }
    }
}
