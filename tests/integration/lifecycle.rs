use crate::common::{TOKEN, authorize, test_gateway};

#[test]
fn test_get_me() {
    let gateway = test_gateway();

    let response = gateway.post(format!("/bot{TOKEN}/getMe")).dispatch();
    assert_eq!(response.status().code, 200);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"]["id"], 123456);
    assert_eq!(body["result"]["is_bot"], true);
    assert_eq!(body["result"]["username"], "test_bot");
    assert_eq!(body["result"]["can_join_groups"], true);
}

#[test]
fn test_close_makes_queries_fail_with_restart() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway.post(format!("/bot{TOKEN}/close")).dispatch();
    assert_eq!(response.status().code, 200);
    // Closing is observed via the authorization-state event; give it a beat.
    std::thread::sleep(std::time::Duration::from_millis(300));

    let response = gateway
        .post(format!("/bot{TOKEN}/sendMessage?chat_id=1&text=hi"))
        .dispatch();
    assert_eq!(response.status().code, 500);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["description"], "Internal Server Error: restart");
}

#[test]
fn test_logout_makes_queries_fail_with_logged_out() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway.post(format!("/bot{TOKEN}/logOut")).dispatch();
    assert_eq!(response.status().code, 200);
    std::thread::sleep(std::time::Duration::from_millis(300));

    let response = gateway
        .post(format!("/bot{TOKEN}/sendMessage?chat_id=1&text=hi"))
        .dispatch();
    assert_eq!(response.status().code, 400);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["description"], "Logged out");
}

#[test]
fn test_unknown_method_is_404() {
    let gateway = test_gateway();

    let response = gateway.post(format!("/bot{TOKEN}/frobnicate")).dispatch();
    assert_eq!(response.status().code, 404);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["description"], "Not Found: method not found");
}

#[test]
fn test_method_names_fold_case_and_aliases() {
    let gateway = test_gateway();
    authorize(&gateway);

    let response = gateway.post(format!("/bot{TOKEN}/GETME")).dispatch();
    assert_eq!(response.status().code, 200);

    // kickChatMember is banChatMember under an older name.
    let response = gateway
        .post(format!("/bot{TOKEN}/kickChatMember?chat_id=1&user_id=2"))
        .dispatch();
    assert_eq!(response.status().code, 200);
}

#[test]
fn test_invalid_token_is_unauthorized() {
    let gateway = test_gateway();

    let response = gateway.post("/botBAD/getMe").dispatch();
    assert_eq!(response.status().code, 401);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["error_code"], 401);
}

#[test]
fn test_non_bot_path_is_404() {
    let gateway = test_gateway();

    let response = gateway.post("/health/getMe").dispatch();
    assert_eq!(response.status().code, 404);
}
