use std::sync::Arc;
use std::time::Duration;

use botgate::limits::MAX_CONCURRENTLY_SENT_CHAT_MESSAGES;
use botgate::td;

use crate::common::{TOKEN, authorize, test_gateway};

// --- Sends ---

#[test]
fn test_simple_send() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway
        .post(format!("/bot{TOKEN}/sendMessage?chat_id=100&text=hi"))
        .dispatch();
    assert_eq!(response.status().code, 200);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"]["text"], "hi");
    assert_eq!(body["result"]["chat"]["id"], 100);
    assert_eq!(body["result"]["message_id"], 1);
}

#[test]
fn test_send_message_json_body() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway
        .post(format!("/bot{TOKEN}/sendMessage"))
        .header(rocket::http::ContentType::JSON)
        .body(r#"{"chat_id": 55, "text": "from json"}"#)
        .dispatch();
    assert_eq!(response.status().code, 200);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["result"]["text"], "from json");
    assert_eq!(body["result"]["chat"]["id"], 55);
}

#[test]
fn test_send_message_requires_chat_id() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway
        .post(format!("/bot{TOKEN}/sendMessage?text=hi"))
        .dispatch();
    assert_eq!(response.status().code, 400);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["description"], "Bad Request: chat_id is empty");
}

#[test]
fn test_multi_forward_retry_after() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    // The third forwarded message hits a flood wait on the native side.
    *mock.fail_nth_send.lock().unwrap() = Some((
        2,
        td::TdError::new(429, "Too Many Requests: retry after 7"),
    ));

    let response = gateway
        .post(format!("/bot{TOKEN}/forwardMessages"))
        .header(rocket::http::ContentType::JSON)
        .body(r#"{"chat_id": 50, "from_chat_id": 100, "message_ids": [5, 6, 7]}"#)
        .dispatch();
    assert_eq!(response.status().code, 429);
    assert_eq!(
        response.headers().get_one("Retry-After"),
        Some("7")
    );
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error_code"], 429);
    assert_eq!(body["description"], "Too Many Requests: retry after 7");
    assert_eq!(body["parameters"]["retry_after"], 7);
}

#[test]
fn test_forward_messages_returns_ids() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway
        .post(format!("/bot{TOKEN}/forwardMessages"))
        .header(rocket::http::ContentType::JSON)
        .body(r#"{"chat_id": 50, "from_chat_id": 100, "message_ids": [5, 6]}"#)
        .dispatch();
    assert_eq!(response.status().code, 200);
    let body: serde_json::Value = response.into_json().unwrap();
    let results = body["result"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    // Bare MessageId objects, not full messages.
    assert!(results[0]["message_id"].is_i64());
    assert!(results[0].get("chat").is_none());
}

#[test]
fn test_nonterminal_multi_send_error_is_prefixed() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    *mock.fail_nth_send.lock().unwrap() =
        Some((1, td::TdError::new(400, "CHAT_SEND_MEDIA_FORBIDDEN")));

    let response = gateway
        .post(format!("/bot{TOKEN}/forwardMessages"))
        .header(rocket::http::ContentType::JSON)
        .body(r#"{"chat_id": 51, "from_chat_id": 100, "message_ids": [5, 6, 7]}"#)
        .dispatch();
    assert_eq!(response.status().code, 400);
    let body: serde_json::Value = response.into_json().unwrap();
    let description = body["description"].as_str().unwrap();
    assert!(
        description.contains("Failed to send message #2"),
        "unexpected description: {description}"
    );
}

// --- Per-chat concurrent-send cap ---

#[rocket::async_test]
async fn test_per_chat_send_cap() {
    let (rocket, factory, _connector, base_dir) = crate::common::build_rocket();
    let client = Arc::new(
        rocket::local::asynchronous::Client::tracked(rocket)
            .await
            .expect("valid rocket instance"),
    );

    // Authorize, then stop acknowledging sends so they stay in flight.
    let response = client.post(format!("/bot{TOKEN}/getMe")).dispatch().await;
    assert_eq!(response.status().code, 200);
    drop(response);
    let mock = factory.mock(TOKEN);
    mock.set_auto_succeed(false);

    for _ in 0..MAX_CONCURRENTLY_SENT_CHAT_MESSAGES {
        let client = client.clone();
        tokio::spawn(async move {
            let _ = client
                .post(format!("/bot{TOKEN}/sendMessage?chat_id=100&text=x"))
                .dispatch()
                .await;
        });
    }

    // Wait until every send reached the native client.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        let sent = mock.call_count(|f| matches!(f, td::Function::SendMessage { .. }));
        if sent == MAX_CONCURRENTLY_SENT_CHAT_MESSAGES as usize {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "only {sent} sends reached the bridge"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // One more send in the same chat trips the cap: synthetic 429 after the
    // debounce sleep.
    let response = client
        .post(format!("/bot{TOKEN}/sendMessage?chat_id=100&text=over"))
        .dispatch()
        .await;
    assert_eq!(response.status().code, 429);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["parameters"]["retry_after"], 60);

    // A different chat is unaffected.
    mock.set_auto_succeed(true);
    let response = client
        .post(format!("/bot{TOKEN}/sendMessage?chat_id=101&text=ok"))
        .dispatch()
        .await;
    assert_eq!(response.status().code, 200);
    drop(response);

    drop(client);
    let _ = std::fs::remove_dir_all(&base_dir);
}

// --- Edits ---

#[test]
fn test_edit_message_text() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway
        .post(format!(
            "/bot{TOKEN}/editMessageText?chat_id=100&message_id=1&text=edited"
        ))
        .dispatch();
    assert_eq!(response.status().code, 200);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], true);
}

#[test]
fn test_delete_message_invalid_id() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway
        .post(format!("/bot{TOKEN}/deleteMessage?chat_id=100&message_id=0"))
        .dispatch();
    assert_eq!(response.status().code, 400);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["description"], "Bad Request: message not found");
}
