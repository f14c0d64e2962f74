// Direct tests over the library's small pure parts: id encoding, masks,
// queue tags, the TQueue, the limiter and error translation.

use std::time::{Duration, Instant};

use botgate::error::{ApiError, from_td_error};
use botgate::limits::{Admission, FloodControl, LoadSnapshot};
use botgate::td::message_id;
use botgate::tqueue::TQueue;
use botgate::update_types::{AllowedUpdates, UpdateKind, webhook_queue_id};

// --- Message-id encoding ---

#[test]
fn test_message_id_round_trip() {
    for external in [1i32, 2, 100, 65535, i32::MAX] {
        let internal = message_id::from_client(external);
        assert_eq!(internal % (1 << 20), 0);
        assert_eq!(message_id::to_client(internal), Some(external));
    }
    for internal in [1i64 << 20, 5 << 20, 12345 << 20] {
        let external = message_id::to_client(internal).unwrap();
        assert_eq!(message_id::from_client(external), internal);
    }
}

#[test]
fn test_message_id_rejects_invalid() {
    assert_eq!(message_id::to_client(0), None);
    assert_eq!(message_id::to_client(1), None);
    assert_eq!(message_id::to_client((1 << 20) + 7), None);
    assert_eq!(message_id::to_client(i64::MAX), None);
}

// --- Allowed-updates mask ---

#[test]
fn test_allowed_updates_default_excludes_custom() {
    let mask = AllowedUpdates::DEFAULT;
    assert!(mask.admits(UpdateKind::Message));
    assert!(mask.admits(UpdateKind::ChatBoost));
    assert!(!mask.admits(UpdateKind::CustomEvent));
    assert!(!mask.admits(UpdateKind::CustomQuery));
}

#[test]
fn test_allowed_updates_parse() {
    let mask = AllowedUpdates::parse(r#"["message", "callback_query"]"#);
    assert!(mask.admits(UpdateKind::Message));
    assert!(mask.admits(UpdateKind::CallbackQuery));
    assert!(!mask.admits(UpdateKind::EditedMessage));

    // Garbage and empty arrays fall back to the default mask.
    assert_eq!(AllowedUpdates::parse("not json"), AllowedUpdates::DEFAULT);
    assert_eq!(AllowedUpdates::parse("[]"), AllowedUpdates::DEFAULT);
    assert_eq!(
        AllowedUpdates::parse(r#"["no_such_kind"]"#),
        AllowedUpdates::DEFAULT
    );
}

#[test]
fn test_allowed_updates_storage_has_no_sign_extension() {
    let mask = AllowedUpdates(0xF000_0001);
    let stored = mask.to_stored();
    assert!(stored >= 0, "stored pattern must not be sign-extended");
    assert_eq!(AllowedUpdates::from_stored(stored), mask);
}

// --- Webhook queue tags ---

#[test]
fn test_webhook_queue_ids_separate_domains() {
    let user = 42;
    assert_eq!(webhook_queue_id(UpdateKind::Message, 200), 200);
    assert_eq!(webhook_queue_id(UpdateKind::InlineQuery, user), user + (1 << 33));
    assert_eq!(
        webhook_queue_id(UpdateKind::ChosenInlineResult, user),
        user + (2 << 33)
    );
    assert_eq!(
        webhook_queue_id(UpdateKind::CallbackQuery, user),
        user + (3 << 33)
    );
    assert_eq!(
        webhook_queue_id(UpdateKind::ShippingQuery, user),
        webhook_queue_id(UpdateKind::PreCheckoutQuery, user)
    );
    assert_eq!(webhook_queue_id(UpdateKind::MyChatMember, -100), -100 + (5 << 33));
    assert_eq!(
        webhook_queue_id(UpdateKind::ChatMember, user),
        webhook_queue_id(UpdateKind::ChatJoinRequest, user)
    );
    assert_eq!(
        webhook_queue_id(UpdateKind::BusinessConnection, user),
        user + (10 << 33)
    );
    // Same subject, different categories, different queues.
    assert_ne!(
        webhook_queue_id(UpdateKind::CallbackQuery, user),
        webhook_queue_id(UpdateKind::InlineQuery, user)
    );
}

// --- TQueue ---

#[test]
fn test_tqueue_order_and_cursor() {
    let tqueue = TQueue::new();
    let now = 1_000_000;
    let a = tqueue.push(7, "message {\"a\":1}".into(), now + 60, 1);
    let b = tqueue.push(7, "message {\"b\":2}".into(), now + 60, 1);
    let c = tqueue.push(7, "message {\"c\":3}".into(), now + 60, 2);
    assert!(a < b && b < c);

    let events = tqueue.get(7, 0, 10, now);
    assert_eq!(
        events.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![a, b, c]
    );

    tqueue.forget_before(7, b);
    let events = tqueue.get(7, 0, 10, now);
    assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![b, c]);
    assert_eq!(tqueue.head(7, now), b);
    assert_eq!(tqueue.size(7, now), 2);
}

#[test]
fn test_tqueue_expiry() {
    let tqueue = TQueue::new();
    let now = 1_000_000;
    tqueue.push(7, "message {}".into(), now + 10, 1);
    tqueue.push(7, "message {}".into(), now + 100, 1);
    assert_eq!(tqueue.size(7, now), 2);
    assert_eq!(tqueue.size(7, now + 50), 1);
    assert_eq!(tqueue.size(7, now + 200), 0);
}

#[test]
fn test_tqueue_truncate_head() {
    let tqueue = TQueue::new();
    let now = 1_000_000;
    for i in 0..5 {
        tqueue.push(7, format!("message {i}"), now + 60, 1);
    }
    tqueue.truncate_head(7, 3, now);
    let events = tqueue.get(7, 0, 10, now);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data, "message 3");
}

// --- Flood control ---

#[test]
fn test_flood_control_warmup_admits_everything() {
    let mut flood = FloodControl::new(Instant::now());
    let load = LoadSnapshot {
        active_request_count: 10_000,
        ..Default::default()
    };
    assert!(matches!(
        flood.admit(load, false, 0, false),
        Admission::Allow
    ));
}

#[test]
fn test_flood_control_rejects_request_backlog() {
    let mut flood = FloodControl::new(Instant::now() - Duration::from_secs(120));
    let load = LoadSnapshot {
        active_request_count: 501,
        ..Default::default()
    };
    match flood.admit(load, false, 0, false) {
        Admission::Reject(error) => assert_eq!(error.retry_after, Some(60)),
        other => panic!("expected rejection, got {other:?}"),
    }
    // The update-rate allowance raises the threshold.
    let load = LoadSnapshot {
        active_request_count: 501,
        updates_per_minute: 100,
        ..Default::default()
    };
    assert!(matches!(
        flood.admit(load, false, 0, false),
        Admission::Allow
    ));
}

#[test]
fn test_upload_pacer_defers_then_rejects() {
    let mut flood = FloodControl::new(Instant::now() - Duration::from_secs(120));
    let load = LoadSnapshot::default();
    let size = 5_000_000u64; // cost 0.5 s per send

    // Two sends ride the initial credit; then deferrals grow until the
    // five-second ceiling turns into a rejection.
    let mut deferred = 0;
    let mut rejected = 0;
    for _ in 0..16 {
        match flood.admit(load, true, size, false) {
            Admission::Allow => {}
            Admission::Defer(_) => deferred += 1,
            Admission::Reject(error) => {
                assert_eq!(error.retry_after, Some(60));
                rejected += 1;
            }
        }
    }
    assert!(deferred > 0, "pacer never deferred");
    assert!(rejected > 0, "pacer never hit the ceiling");
}

#[test]
fn test_small_uploads_are_not_paced() {
    let mut flood = FloodControl::new(Instant::now() - Duration::from_secs(120));
    let load = LoadSnapshot::default();
    for _ in 0..50 {
        assert!(matches!(
            flood.admit(load, true, 50_000, false),
            Admission::Allow
        ));
    }
}

// --- Error translation ---

#[test]
fn test_error_prefixing() {
    assert_eq!(
        ApiError::bad_request("chat not found").message,
        "Bad Request: chat not found"
    );
    // Leading uppercase is folded unless it looks like an opaque constant.
    assert_eq!(
        ApiError::bad_request("Message to edit not found").message,
        "Bad Request: message to edit not found"
    );
    assert_eq!(
        ApiError::bad_request("PEER_FLOOD").message,
        "Bad Request: PEER_FLOOD"
    );
    // Already-prefixed messages pass through.
    assert_eq!(
        ApiError::bad_request("Bad Request: chat not found").message,
        "Bad Request: chat not found"
    );
}

#[test]
fn test_td_error_translation() {
    let error = from_td_error(429, "Too Many Requests: retry after 23");
    assert_eq!(error.code, 429);
    assert_eq!(error.retry_after, Some(23));

    let error = from_td_error(400, "USER_IS_BLOCKED");
    assert_eq!(error.code, 403);
    assert_eq!(error.message, "Forbidden: bot was blocked by the user");

    let error = from_td_error(400, "INPUT_USER_DEACTIVATED");
    assert_eq!(error.code, 403);
    assert_eq!(error.message, "Forbidden: user is deactivated");

    let error = from_td_error(400, "WC_CONVERT_URL_INVALID");
    assert_eq!(error.message, "Bad Request: wrong HTTP URL specified");

    let error = from_td_error(502, "Gateway timeout");
    assert_eq!(error.code, 500);
}
