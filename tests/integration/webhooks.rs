use std::sync::Arc;
use std::time::Duration;

use crate::common::{TOKEN, authorize, test_gateway};

fn set_webhook(gateway: &crate::common::TestGateway, params: &str) -> serde_json::Value {
    gateway
        .post(format!("/bot{TOKEN}/setWebhook?{params}"))
        .dispatch()
        .into_json()
        .unwrap()
}

#[test]
fn test_set_webhook_requires_https() {
    let gateway = test_gateway();
    authorize(&gateway);

    let body = set_webhook(&gateway, "url=http://example.com/hook");
    assert_eq!(body["ok"], false);
    assert_eq!(body["error_code"], 400);
    assert_eq!(
        body["description"],
        "Bad Request: bad webhook: HTTPS url must be provided for webhook"
    );
}

#[test]
fn test_set_webhook_rejects_bad_secret() {
    let gateway = test_gateway();
    authorize(&gateway);

    let body = set_webhook(
        &gateway,
        "url=https://example.com/hook&secret_token=nope!nope",
    );
    assert_eq!(body["error_code"], 400);
    assert_eq!(
        body["description"],
        "Bad Request: secret token contains unallowed characters"
    );
}

#[test]
fn test_set_webhook_and_info() {
    let gateway = test_gateway();
    authorize(&gateway);

    let body = set_webhook(&gateway, "url=https://example.com/hook&max_connections=77");
    assert_eq!(body["ok"], true, "setWebhook failed: {body}");
    assert_eq!(body["result"], true);
    assert_eq!(body["description"], "Webhook was set");

    let spawns = gateway.connector.spawns.lock().unwrap();
    assert_eq!(spawns.len(), 1);
    assert_eq!(spawns[0].url, "https://example.com/hook");
    assert_eq!(spawns[0].max_connections, 77);
    drop(spawns);

    let info: serde_json::Value = gateway
        .post(format!("/bot{TOKEN}/getWebhookInfo"))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(info["result"]["url"], "https://example.com/hook");
    assert_eq!(info["result"]["has_custom_certificate"], false);
    assert_eq!(info["result"]["max_connections"], 77);
    assert_eq!(info["result"]["ip_address"], "203.0.113.5");
}

#[test]
fn test_webhook_conflicts_with_get_updates() {
    let gateway = test_gateway();
    authorize(&gateway);

    let body = set_webhook(&gateway, "url=https://example.com/hook");
    assert_eq!(body["ok"], true);

    let conflict: serde_json::Value = gateway
        .post(format!("/bot{TOKEN}/getUpdates?timeout=0"))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(conflict["error_code"], 409);
    let description = conflict["description"].as_str().unwrap();
    assert!(description.starts_with("Conflict"), "{description}");

    // Past the one-change-per-second debounce, deleting restores long polls.
    std::thread::sleep(Duration::from_millis(1100));
    let deleted: serde_json::Value = gateway
        .post(format!("/bot{TOKEN}/deleteWebhook"))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(deleted["ok"], true);
    assert_eq!(deleted["description"], "Webhook was deleted");

    let updates: serde_json::Value = gateway
        .post(format!("/bot{TOKEN}/getUpdates?timeout=0"))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(updates["ok"], true, "getUpdates failed: {updates}");
}

#[test]
fn test_set_webhook_twice_is_already_set() {
    let gateway = test_gateway();
    authorize(&gateway);

    let body = set_webhook(&gateway, "url=https://example.com/hook");
    assert_eq!(body["ok"], true);

    std::thread::sleep(Duration::from_millis(1100));
    let body = set_webhook(&gateway, "url=https://example.com/hook");
    assert_eq!(body["ok"], true);
    assert_eq!(body["description"], "Webhook is already set");

    // No second delivery actor was started.
    assert_eq!(gateway.connector.spawns.lock().unwrap().len(), 1);
}

#[test]
fn test_webhook_change_debounce() {
    let gateway = test_gateway();
    authorize(&gateway);

    let body = set_webhook(&gateway, "url=https://example.com/hook");
    assert_eq!(body["ok"], true);

    // A second change within one second is refused outright.
    let body = set_webhook(&gateway, "url=https://example.com/other");
    assert_eq!(body["error_code"], 429);
    assert_eq!(body["parameters"]["retry_after"], 1);
}

#[test]
fn test_delete_webhook_when_none() {
    let gateway = test_gateway();
    authorize(&gateway);

    let body: serde_json::Value = gateway
        .post(format!("/bot{TOKEN}/deleteWebhook"))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["description"], "Webhook is already deleted");
}

/// Scenario: a parked getUpdates is terminated by an incoming setWebhook,
/// which then completes once the delivery actor reports Verified.
#[rocket::async_test]
async fn test_webhook_takes_over_parked_long_poll() {
    let (rocket, _factory, connector, base_dir) = crate::common::build_rocket();
    let client = Arc::new(
        rocket::local::asynchronous::Client::tracked(rocket)
            .await
            .expect("valid rocket instance"),
    );

    let response = client.post(format!("/bot{TOKEN}/getMe")).dispatch().await;
    assert_eq!(response.status().code, 200);
    drop(response);

    let poller = {
        let client = client.clone();
        tokio::spawn(async move {
            let response = client
                .post(format!("/bot{TOKEN}/getUpdates?timeout=30"))
                .dispatch()
                .await;
            let code = response.status().code;
            let body: serde_json::Value = response.into_json().await.unwrap();
            (code, body)
        })
    };

    tokio::time::sleep(Duration::from_millis(400)).await;
    let response = client
        .post(format!("/bot{TOKEN}/setWebhook?url=https://x/y"))
        .dispatch()
        .await;
    assert_eq!(response.status().code, 200);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["description"], "Webhook was set");
    assert_eq!(connector.spawns.lock().unwrap().len(), 1);

    let (code, body) = poller.await.unwrap();
    assert_eq!(code, 409);
    assert_eq!(
        body["description"],
        "Conflict: terminated by setWebhook request"
    );

    drop(client);
    let _ = std::fs::remove_dir_all(&base_dir);
}
