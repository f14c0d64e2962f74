// Shared test harness: a gateway over a scripted mock bridge and a mock
// webhook connector, with a temp base dir cleaned up on drop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rocket::local::blocking::Client;
use tokio::sync::mpsc;

use botgate::settings::Settings;
use botgate::td;
use botgate::webhooks::{Callback, Command, Connector, WebhookHandle, WebhookParams};

pub const TOKEN: &str = "123456:AAbbCCddEEffGGhhIIjjKKllMMnnOOpp";
pub const BOT_ID: i64 = 123456;

/// Scripted native client: answers the authorization handshake by default
/// so bots reach Ready, auto-acknowledges sends, and lets tests override
/// responses or inject raw events.
pub struct MockState {
    events: Mutex<Option<mpsc::UnboundedSender<td::Event>>>,
    pub calls: Mutex<Vec<td::Function>>,
    bot_id: i64,
    auto_succeed_sends: AtomicBool,
    next_temp_id: AtomicI64,
    next_client_id: AtomicI64,
    sticker_sets: Mutex<HashMap<i64, String>>,
    messages: Mutex<HashMap<(i64, i64), td::Message>>,
    /// One (index, error) pair: the nth message of the next multi-send fails.
    pub fail_nth_send: Mutex<Option<(usize, td::TdError)>>,
}

impl MockState {
    pub fn inject(&self, event: td::Event) {
        let events = self.events.lock().unwrap();
        if let Some(tx) = events.as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn set_auto_succeed(&self, value: bool) {
        self.auto_succeed_sends.store(value, Ordering::SeqCst);
    }

    pub fn add_sticker_set(&self, id: i64, name: &str) {
        self.sticker_sets.lock().unwrap().insert(id, name.to_string());
    }

    pub fn add_message(&self, message: td::Message) {
        self.messages
            .lock()
            .unwrap()
            .insert((message.chat_id, message.id), message);
    }

    pub fn call_count(&self, want: fn(&td::Function) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|f| want(f)).count()
    }

    fn respond(&self, query_id: u64, result: Result<td::Object, td::TdError>) {
        self.inject(td::Event::Response { query_id, result });
    }

    fn provisional_message(&self, chat_id: i64, content: td::MessageContent) -> td::Message {
        // Provisional ids are odd, deliberately not multiples of 1 << 20.
        let id = self.next_temp_id.fetch_add(2, Ordering::SeqCst);
        td::Message {
            id,
            chat_id,
            message_thread_id: 0,
            sender: td::MessageSender::User(self.bot_id),
            date: chrono::Utc::now().timestamp() as i32,
            edit_date: 0,
            is_outgoing: true,
            is_channel_post: false,
            is_topic_message: false,
            is_from_offline: false,
            can_be_saved: true,
            media_album_id: 0,
            via_bot_user_id: 0,
            author_signature: String::new(),
            sender_boost_count: 0,
            effect_id: 0,
            self_destruct_time: 0,
            initial_send_date: 0,
            forward_info: None,
            reply_to: None,
            content,
            reply_markup: None,
        }
    }

    fn finalize_send(&self, provisional: &td::Message) {
        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        let mut message = provisional.clone();
        message.id = td::message_id::from_client(client_id as i32);
        message.is_outgoing = false;
        self.inject(td::Event::MessageSendSucceeded {
            message: Box::new(message),
            old_message_id: provisional.id,
        });
    }

    fn handle(&self, query_id: u64, function: td::Function) {
        match &function {
            td::Function::SetOption { .. } => self.respond(query_id, Ok(td::Object::Ok)),
            td::Function::SetTdlibParameters(_) => {
                self.respond(query_id, Ok(td::Object::Ok));
                self.inject(td::Event::AuthorizationState(
                    td::AuthorizationState::WaitPhoneNumber,
                ));
            }
            td::Function::CheckAuthenticationBotToken { .. } => {
                self.respond(query_id, Ok(td::Object::Ok));
                self.inject(td::Event::Option {
                    name: "my_id".to_string(),
                    value: td::OptionValue::Integer(self.bot_id),
                });
                self.inject(td::Event::User(Box::new(bot_user(self.bot_id))));
                self.inject(td::Event::AuthorizationState(td::AuthorizationState::Ready));
            }
            td::Function::GetMe => {
                self.respond(query_id, Ok(td::Object::User(Box::new(bot_user(self.bot_id)))));
            }
            td::Function::Close => {
                self.respond(query_id, Ok(td::Object::Ok));
                self.inject(td::Event::AuthorizationState(
                    td::AuthorizationState::Closing,
                ));
            }
            td::Function::LogOut => {
                self.respond(query_id, Ok(td::Object::Ok));
                self.inject(td::Event::AuthorizationState(
                    td::AuthorizationState::LoggingOut,
                ));
            }
            td::Function::SendMessage {
                chat_id, content, ..
            } => {
                let content = match content {
                    td::InputMessageContent::Text { text, .. } => td::MessageContent::Text {
                        text: text.clone(),
                        entities: serde_json::json!([]),
                        link_preview: None,
                    },
                    _ => td::MessageContent::Unsupported,
                };
                let provisional = self.provisional_message(*chat_id, content);
                self.respond(query_id, Ok(td::Object::Message(Box::new(provisional.clone()))));
                if self.auto_succeed_sends.load(Ordering::SeqCst) {
                    self.finalize_send(&provisional);
                }
            }
            td::Function::ForwardMessages {
                chat_id,
                message_ids,
                ..
            } => {
                let provisionals: Vec<td::Message> = message_ids
                    .iter()
                    .map(|_| {
                        self.provisional_message(
                            *chat_id,
                            td::MessageContent::Text {
                                text: "forwarded".to_string(),
                                entities: serde_json::json!([]),
                                link_preview: None,
                            },
                        )
                    })
                    .collect();
                self.respond(
                    query_id,
                    Ok(td::Object::Messages(
                        provisionals.iter().cloned().map(Some).collect(),
                    )),
                );
                let fail = self.fail_nth_send.lock().unwrap().take();
                for (index, provisional) in provisionals.iter().enumerate() {
                    match &fail {
                        Some((fail_index, error)) if *fail_index == index => {
                            self.inject(td::Event::MessageSendFailed {
                                chat_id: provisional.chat_id,
                                old_message_id: provisional.id,
                                new_message_id: 0,
                                error: error.clone(),
                            });
                        }
                        _ => self.finalize_send(provisional),
                    }
                }
            }
            td::Function::GetStickerSet { set_id } => {
                let sets = self.sticker_sets.lock().unwrap();
                match sets.get(set_id) {
                    Some(name) => self.respond(
                        query_id,
                        Ok(td::Object::StickerSet(Box::new(td::StickerSet {
                            id: *set_id,
                            name: name.clone(),
                            title: name.clone(),
                            sticker_type: serde_json::json!("regular"),
                            stickers: serde_json::json!([]),
                        }))),
                    ),
                    None => self.respond(
                        query_id,
                        Err(td::TdError::new(400, "STICKERSET_INVALID")),
                    ),
                }
            }
            td::Function::GetMessage {
                chat_id,
                message_id,
            }
            | td::Function::GetRepliedMessage {
                chat_id,
                message_id,
            }
            | td::Function::GetCallbackQueryMessage {
                chat_id,
                message_id,
                ..
            } => {
                let messages = self.messages.lock().unwrap();
                match messages.get(&(*chat_id, *message_id)) {
                    Some(message) => self.respond(
                        query_id,
                        Ok(td::Object::Message(Box::new(message.clone()))),
                    ),
                    None => {
                        self.respond(query_id, Err(td::TdError::new(400, "MESSAGE_ID_INVALID")))
                    }
                }
            }
            _ => self.respond(query_id, Ok(td::Object::Ok)),
        }
    }
}

pub struct MockBridge {
    state: Arc<MockState>,
}

impl td::Bridge for MockBridge {
    fn start(&self, events: mpsc::UnboundedSender<td::Event>) {
        let _ = events.send(td::Event::AuthorizationState(
            td::AuthorizationState::WaitTdlibParameters,
        ));
        *self.state.events.lock().unwrap() = Some(events);
    }

    fn send(&self, query_id: u64, function: td::Function) {
        self.state.calls.lock().unwrap().push(function.clone());
        self.state.handle(query_id, function);
    }
}

pub struct MockFactory {
    pub mocks: Mutex<HashMap<String, Arc<MockState>>>,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(MockFactory {
            mocks: Mutex::new(HashMap::new()),
        })
    }

    pub fn mock(&self, token: &str) -> Arc<MockState> {
        self.mocks
            .lock()
            .unwrap()
            .get(token)
            .expect("bot not spawned yet")
            .clone()
    }
}

impl td::BridgeFactory for MockFactory {
    fn create(&self, token: &str) -> Arc<dyn td::Bridge> {
        let bot_id = token
            .split(':')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let state = Arc::new(MockState {
            events: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            bot_id,
            auto_succeed_sends: AtomicBool::new(true),
            next_temp_id: AtomicI64::new(1),
            next_client_id: AtomicI64::new(1),
            sticker_sets: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            fail_nth_send: Mutex::new(None),
        });
        self.mocks
            .lock()
            .unwrap()
            .insert(token.to_string(), state.clone());
        Arc::new(MockBridge { state })
    }
}

/// Webhook connector double: records every spawn, reports Verified at once,
/// answers Close with Closed.
pub struct MockConnector {
    pub spawns: Mutex<Vec<WebhookParams>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(MockConnector {
            spawns: Mutex::new(Vec::new()),
        })
    }
}

impl Connector for MockConnector {
    fn spawn(
        &self,
        params: WebhookParams,
        _tqueue: Arc<botgate::tqueue::TQueue>,
        _queue_id: i64,
        callbacks: botgate::webhooks::CallbackFn,
    ) -> WebhookHandle {
        self.spawns.lock().unwrap().push(params);
        let (handle, mut rx) = WebhookHandle::new();
        tokio::spawn(async move {
            callbacks(Callback::Verified {
                cached_ip: "203.0.113.5".to_string(),
            });
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Close => {
                        callbacks(Callback::Closed);
                        break;
                    }
                    Command::NewUpdates => {}
                }
            }
        });
        handle
    }
}

pub struct TestGateway {
    client: Option<Client>,
    pub factory: Arc<MockFactory>,
    pub connector: Arc<MockConnector>,
    base_dir: String,
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_dir_all(&self.base_dir);
    }
}

impl std::ops::Deref for TestGateway {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

impl TestGateway {
    pub fn mock(&self) -> Arc<MockState> {
        self.factory.mock(TOKEN)
    }
}

/// The rocket plus its mocks, for tests that drive the asynchronous local
/// client themselves.
pub fn build_rocket() -> (
    rocket::Rocket<rocket::Build>,
    Arc<MockFactory>,
    Arc<MockConnector>,
    String,
) {
    let base_dir = format!(
        "/tmp/botgate_test_{}",
        uuid::Uuid::new_v4().to_string().split('-').next().unwrap()
    );
    let settings = Settings {
        api_id: 17349,
        api_hash: "344583e45741c457fe1862106095a5eb".to_string(),
        base_dir: base_dir.clone(),
        local_mode: false,
        test_dc: false,
        start_time: Instant::now(),
    };
    let factory = MockFactory::new();
    let connector = MockConnector::new();
    let rocket = botgate::gateway_in_memory(settings, factory.clone(), connector.clone());
    (rocket, factory, connector, base_dir)
}

pub fn test_gateway() -> TestGateway {
    let (rocket, factory, connector, base_dir) = build_rocket();
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestGateway {
        client: Some(client),
        factory,
        connector,
        base_dir,
    }
}

// --- Fixtures ---

pub fn bot_user(id: i64) -> td::User {
    td::User {
        id,
        first_name: "Test Bot".to_string(),
        last_name: String::new(),
        usernames: Some(td::Usernames {
            active_usernames: vec!["test_bot".to_string()],
            editable_username: "test_bot".to_string(),
        }),
        language_code: String::new(),
        is_premium: false,
        added_to_attachment_menu: false,
        have_access: true,
        kind: td::UserKind::Bot(td::BotInfo {
            can_join_groups: true,
            can_read_all_group_messages: false,
            is_inline: false,
            can_connect_to_business: false,
            can_be_edited: false,
        }),
        profile_photo: None,
        bio: None,
        birthdate: None,
        business_info: None,
        personal_chat_id: 0,
        has_private_forwards: false,
        has_restricted_voice_and_video_messages: false,
    }
}

pub fn plain_user(id: i64, first_name: &str) -> td::User {
    td::User {
        id,
        first_name: first_name.to_string(),
        last_name: String::new(),
        usernames: None,
        language_code: String::new(),
        is_premium: false,
        added_to_attachment_menu: false,
        have_access: true,
        kind: td::UserKind::Regular,
        profile_photo: None,
        bio: None,
        birthdate: None,
        business_info: None,
        personal_chat_id: 0,
        has_private_forwards: false,
        has_restricted_voice_and_video_messages: false,
    }
}

/// An incoming (not outgoing) message in a private chat, dated now.
pub fn incoming_message(chat_id: i64, client_id: i32, text: &str) -> td::Message {
    td::Message {
        id: td::message_id::from_client(client_id),
        chat_id,
        message_thread_id: 0,
        sender: td::MessageSender::User(chat_id),
        date: chrono::Utc::now().timestamp() as i32,
        edit_date: 0,
        is_outgoing: false,
        is_channel_post: false,
        is_topic_message: false,
        is_from_offline: false,
        can_be_saved: true,
        media_album_id: 0,
        via_bot_user_id: 0,
        author_signature: String::new(),
        sender_boost_count: 0,
        effect_id: 0,
        self_destruct_time: 0,
        initial_send_date: 0,
        forward_info: None,
        reply_to: None,
        content: td::MessageContent::Text {
            text: text.to_string(),
            entities: serde_json::json!([]),
            link_preview: None,
        },
        reply_markup: None,
    }
}

pub fn sticker_message(chat_id: i64, client_id: i32, set_id: i64) -> td::Message {
    let mut message = incoming_message(chat_id, client_id, "");
    message.content = td::MessageContent::Sticker(td::Sticker {
        file: serde_json::json!({ "file_id": "CAAC42", "file_unique_id": "u42" }),
        set_id,
        width: 512,
        height: 512,
        emoji: "🙂".to_string(),
        format: serde_json::json!("webp"),
    });
    message
}

/// Drive the bot through authorization by issuing getMe once.
pub fn authorize(gateway: &TestGateway) {
    let response = gateway
        .post(format!("/bot{TOKEN}/getMe"))
        .dispatch();
    assert_eq!(response.status().code, 200);
}

/// Long-poll helper: returns the updates array.
pub fn get_updates(gateway: &TestGateway, params: &str) -> serde_json::Value {
    let response = gateway
        .post(format!("/bot{TOKEN}/getUpdates?{params}"))
        .dispatch();
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["ok"], true, "getUpdates failed: {body}");
    body["result"].clone()
}
