use std::time::{Duration, Instant};

use botgate::td;

use crate::common::{
    TOKEN, authorize, get_updates, incoming_message, plain_user, sticker_message, test_gateway,
};

fn settle() {
    // Let injected events cross the mailbox, and stay clear of the
    // identical-offset fast-poll debounce.
    std::thread::sleep(Duration::from_millis(600));
}

// --- Long poll ---

#[test]
fn test_long_poll_wakes_on_new_update() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    let injector = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(400));
        mock.inject(td::Event::NewMessage(Box::new(incoming_message(
            200, 1, "wake up",
        ))));
    });

    let started = Instant::now();
    let updates = get_updates(&gateway, "offset=0&timeout=30");
    injector.join().unwrap();

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "long poll should wake on push, took {:?}",
        started.elapsed()
    );
    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["message"]["chat"]["id"], 200);
    assert_eq!(updates[0]["message"]["text"], "wake up");
    let update_id = updates[0]["update_id"].as_i64().unwrap();

    // Confirming the cursor consumes the update.
    let updates = get_updates(&gateway, &format!("offset={}&timeout=0", update_id + 1));
    assert_eq!(updates.as_array().unwrap().len(), 0);
}

#[test]
fn test_updates_keep_push_order() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    for (id, text) in [(1, "first"), (2, "second"), (3, "third")] {
        mock.inject(td::Event::NewMessage(Box::new(incoming_message(
            300, id, text,
        ))));
    }
    settle();

    let updates = get_updates(&gateway, "timeout=0");
    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 3);
    let texts: Vec<&str> = updates
        .iter()
        .map(|u| u["message"]["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);
    let ids: Vec<i64> = updates
        .iter()
        .map(|u| u["update_id"].as_i64().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

// --- Allowed-update mask ---

#[test]
fn test_allowed_updates_mask_drops_before_buffering() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    // Narrow the mask to callback queries only.
    let response = gateway
        .post(format!("/bot{TOKEN}/getUpdates"))
        .header(rocket::http::ContentType::JSON)
        .body(r#"{"timeout": 0, "allowed_updates": ["callback_query"]}"#)
        .dispatch();
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"].as_array().unwrap().len(), 0);

    // A message update is dropped before it reaches the buffer; a callback
    // query passes.
    mock.inject(td::Event::NewMessage(Box::new(incoming_message(
        400, 1, "filtered",
    ))));
    mock.inject(td::Event::NewInlineCallbackQuery {
        id: 900,
        sender_user_id: 9,
        inline_message_id: "inline-1".to_string(),
        chat_instance: 4242,
        payload: td::CallbackPayload::Data(b"pressed".to_vec()),
    });
    settle();

    let updates = get_updates(&gateway, "timeout=0");
    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["callback_query"]["data"], "pressed");
    let update_id = updates[0]["update_id"].as_i64().unwrap();

    // Re-admitting messages must not resurrect the dropped one.
    let response = gateway
        .post(format!("/bot{TOKEN}/getUpdates"))
        .header(rocket::http::ContentType::JSON)
        .body(format!(
            r#"{{"timeout": 0, "offset": {}, "allowed_updates": ["message"]}}"#,
            update_id + 1
        ))
        .dispatch();
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"].as_array().unwrap().len(), 0);
}

// --- Freshness ---

#[test]
fn test_stale_messages_are_not_emitted() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    let mut stale = incoming_message(500, 1, "old news");
    stale.date = (chrono::Utc::now().timestamp() - 90_000) as i32;
    mock.inject(td::Event::NewMessage(Box::new(stale)));
    mock.inject(td::Event::NewMessage(Box::new(incoming_message(
        500, 2, "fresh",
    ))));
    settle();

    let updates = get_updates(&gateway, "timeout=0");
    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["message"]["text"], "fresh");
}

#[test]
fn test_outgoing_messages_are_not_emitted() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    let mut outgoing = incoming_message(500, 3, "from the bot");
    outgoing.is_outgoing = true;
    mock.inject(td::Event::NewMessage(Box::new(outgoing)));
    settle();

    let updates = get_updates(&gateway, "timeout=0");
    assert_eq!(updates.as_array().unwrap().len(), 0);
}

// --- Sticker-set hydration ---

#[test]
fn test_sticker_set_name_hydration() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();
    mock.add_sticker_set(42, "animals");

    mock.inject(td::Event::NewMessage(Box::new(sticker_message(600, 1, 42))));
    settle();

    let updates = get_updates(&gateway, "timeout=0");
    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["message"]["sticker"]["set_name"], "animals");
    assert_eq!(
        mock.call_count(|f| matches!(f, td::Function::GetStickerSet { .. })),
        1
    );

    // The name is cached; a second sticker from the same set needs no fetch.
    mock.inject(td::Event::NewMessage(Box::new(sticker_message(600, 2, 42))));
    settle();
    let updates = get_updates(&gateway, "timeout=0");
    assert_eq!(updates.as_array().unwrap().len(), 2);
    assert_eq!(
        mock.call_count(|f| matches!(f, td::Function::GetStickerSet { .. })),
        1
    );
}

// --- Callback queries ---

#[test]
fn test_callback_query_base_message_prefetch() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    let base = incoming_message(700, 10, "press the button");
    mock.add_message(base);
    mock.inject(td::Event::User(Box::new(plain_user(9, "Presser"))));
    mock.inject(td::Event::NewCallbackQuery {
        id: 777,
        sender_user_id: 9,
        chat_id: 700,
        message_id: td::message_id::from_client(10),
        chat_instance: 1234,
        payload: td::CallbackPayload::Data(b"pressed".to_vec()),
    });
    settle();

    let updates = get_updates(&gateway, "timeout=0");
    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 1);
    let callback = &updates[0]["callback_query"];
    assert_eq!(callback["id"], "777");
    assert_eq!(callback["from"]["id"], 9);
    assert_eq!(callback["from"]["first_name"], "Presser");
    assert_eq!(callback["data"], "pressed");
    assert_eq!(callback["message"]["text"], "press the button");
    assert_eq!(callback["message"]["message_id"], 10);
    assert_eq!(
        mock.call_count(|f| matches!(f, td::Function::GetCallbackQueryMessage { .. })),
        1
    );
}

// --- Edits ---

#[test]
fn test_unchanged_edit_is_dropped() {
    let gateway = test_gateway();
    authorize(&gateway);
    let mock = gateway.mock();

    let message = incoming_message(800, 1, "same");
    mock.inject(td::Event::NewMessage(Box::new(message.clone())));
    settle();
    let updates = get_updates(&gateway, "timeout=0");
    assert_eq!(updates.as_array().unwrap().len(), 1);
    let offset = updates[0]["update_id"].as_i64().unwrap() + 1;

    // Same content: no edited_message update.
    let mut unchanged = message.clone();
    unchanged.edit_date = unchanged.date + 5;
    mock.inject(td::Event::MessageEdited(Box::new(unchanged)));
    settle();
    let updates = get_updates(&gateway, &format!("timeout=0&offset={offset}"));
    assert_eq!(updates.as_array().unwrap().len(), 0);

    // Changed content: edited_message flows.
    let mut changed = message;
    changed.edit_date = changed.date + 10;
    changed.content = td::MessageContent::Text {
        text: "different".to_string(),
        entities: serde_json::json!([]),
        link_preview: None,
    };
    mock.inject(td::Event::MessageEdited(Box::new(changed)));
    settle();
    let updates = get_updates(&gateway, &format!("timeout=0&offset={offset}"));
    let updates = updates.as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["edited_message"]["text"], "different");
}
