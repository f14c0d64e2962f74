// Native-client surface. The gateway never speaks MTProto itself; it sends
// `Function`s through a `Bridge` and consumes `Event`s posted back to the
// owning client's mailbox.

mod api;
mod types;

pub use api::*;
pub use types::*;

use tokio::sync::mpsc;

/// Command side of the native client. One Bridge per bot token.
///
/// `start` hands the bridge the sender it must use for every unsolicited
/// update and for `Event::Response` callbacks; `send` dispatches one function
/// tagged with the client-chosen correlation id. Responses to functions sent
/// by the same caller come back in issue order.
pub trait Bridge: Send + Sync {
    fn start(&self, events: mpsc::UnboundedSender<Event>);
    fn send(&self, query_id: u64, function: Function);
}

/// Produces the Bridge for a bot when its client actor is spawned.
pub trait BridgeFactory: Send + Sync {
    fn create(&self, token: &str) -> std::sync::Arc<dyn Bridge>;
}

/// Message-id encoding: the Bot API exposes 32-bit sequential ids, the native
/// client uses the same value shifted left by 20 bits.
pub mod message_id {
    const SHIFT: u32 = 20;

    /// Internal (native) id for an external one.
    pub fn from_client(client_id: i32) -> i64 {
        (client_id as i64) << SHIFT
    }

    /// External id for an internal one. Fails for ids that are not a clean
    /// multiple of `1 << 20` or do not fit in 32 bits; callers surface those
    /// as "message not found".
    pub fn to_client(tdlib_id: i64) -> Option<i32> {
        if tdlib_id == 0 || tdlib_id % (1i64 << SHIFT) != 0 {
            return None;
        }
        i32::try_from(tdlib_id >> SHIFT).ok()
    }
}
