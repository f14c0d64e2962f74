// The per-bot client actor. One spawned task owns every piece of bot state;
// the mailbox is the only way in. Native events, HTTP queries, webhook
// callbacks and timer wakeups all arrive as `ClientMsg` and are processed to
// completion one at a time, which is what keeps the cache single-writer and
// the queues ordered.

pub(crate) mod auth;
pub(crate) mod emit;
pub(crate) mod ingest;
pub(crate) mod longpoll;
pub(crate) mod resolve;
pub(crate) mod send;
pub(crate) mod webhook;

pub use emit::stored_update_to_json;
pub use longpoll::ParkedGetUpdates;
pub use send::PendingSend;
pub use webhook::WebhookInstall;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::limits::{FloodControl, LoadSnapshot, MinuteRate};
use crate::models::{ChatInfo, GroupInfo, MessageInfo, SupergroupInfo, UserInfo};
use crate::query::Query;
use crate::settings::Settings;
use crate::td;
use crate::tqueue::TQueue;
use crate::update_types::AllowedUpdates;
use crate::webhook_db::WebhookDb;
use crate::webhooks;

pub type TdCallback = Box<dyn FnOnce(&mut Client, Result<td::Object, td::TdError>) + Send>;

/// Timer and background-task wakeups posted back to the mailbox.
pub enum Wake {
    /// Deliver a prepared failure after a debounce sleep.
    FailQuery { query: Query, error: ApiError },
    /// Re-enter dispatch after upload pacing.
    RetryDispatch { query: Query },
    /// Parked getUpdates hit its hard deadline.
    LongPollTimeout { generation: u64 },
    /// Coalesced flush after the first new-update wakeup.
    LongPollFlush { generation: u64 },
    /// Re-attempt bot authorization after backoff.
    AuthRetry,
    /// Certificate landed on disk (or failed to); continue webhook install.
    CertSaved { result: Result<(), String> },
    /// A file-carrying query finished; release its upload accounting.
    UploadDone { bytes: u64 },
    /// Idle check from the manager sweep.
    IdleCheck,
}

pub enum ClientMsg {
    Query(Query),
    Event(td::Event),
    WebhookCallback {
        generation: u64,
        callback: webhooks::Callback,
    },
    Wake(Wake),
}

#[derive(Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<ClientMsg>,
}

impl ClientHandle {
    pub fn send_query(&self, query: Query) -> bool {
        self.tx.send(ClientMsg::Query(query)).is_ok()
    }

    pub fn send(&self, msg: ClientMsg) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Shared collaborators handed to every client at spawn.
pub struct SharedDeps {
    pub settings: Arc<Settings>,
    pub tqueue: Arc<TQueue>,
    pub webhook_db: Arc<WebhookDb>,
    pub connector: Arc<dyn webhooks::Connector>,
    pub bridge_factory: Arc<dyn td::BridgeFactory>,
    /// Unix-time correction shared by all clients; advanced only forward.
    pub unix_time_offset: Arc<AtomicI64>,
}

pub struct Client {
    pub(crate) token: String,
    pub(crate) bot_user_id: i64,
    pub(crate) settings: Arc<Settings>,
    pub(crate) bridge: Arc<dyn td::Bridge>,
    pub(crate) tqueue: Arc<TQueue>,
    pub(crate) webhook_db: Arc<WebhookDb>,
    pub(crate) connector: Arc<dyn webhooks::Connector>,
    pub(crate) self_tx: mpsc::UnboundedSender<ClientMsg>,

    // Authorization & close FSM.
    pub(crate) was_authorized: bool,
    pub(crate) is_ready: bool,
    pub(crate) logging_out: bool,
    pub(crate) closing: bool,
    pub(crate) clear_tqueue: bool,
    pub(crate) api_id_invalid: bool,
    pub(crate) next_authorization_time: Option<Instant>,
    pub(crate) finalized: bool,

    // Entity cache. Mutated only from the ingest path.
    pub(crate) users: HashMap<i64, UserInfo>,
    pub(crate) groups: HashMap<i64, GroupInfo>,
    pub(crate) supergroups: HashMap<i64, SupergroupInfo>,
    pub(crate) chats: HashMap<i64, ChatInfo>,
    pub(crate) messages: HashMap<(i64, i64), MessageInfo>,
    pub(crate) business_connections: HashMap<String, td::BusinessConnection>,
    pub(crate) sticker_set_names: HashMap<i64, String>,

    // Pending-query registry and the pre-Ready command queue.
    pub(crate) next_td_query_id: u64,
    pub(crate) pending_td_queries: HashMap<u64, TdCallback>,
    pub(crate) cmd_queue: VecDeque<Query>,

    // Send tracker.
    pub(crate) yet_unsent_messages: HashMap<(i64, i64), send::UnsentRef>,
    pub(crate) yet_unsent_message_count: HashMap<i64, u32>,
    pub(crate) pending_send_queries: HashMap<u64, PendingSend>,
    pub(crate) next_send_query_key: u64,

    // Resolution queues.
    pub(crate) new_message_queues: HashMap<i64, resolve::NewMessageQueue>,
    pub(crate) new_business_message_queues: HashMap<String, resolve::BusinessMessageQueue>,
    pub(crate) new_callback_query_queues: HashMap<i64, resolve::CallbackQueryQueue>,
    pub(crate) new_business_callback_query_queues:
        HashMap<i64, resolve::BusinessCallbackQueryQueue>,

    // Bot-username resolution for login-url buttons.
    pub(crate) temp_bot_user_ids: HashMap<String, i64>,
    pub(crate) temp_bot_usernames: HashMap<i64, String>,
    pub(crate) next_temp_bot_user_id: i64,
    pub(crate) resolved_bot_usernames: HashMap<String, i64>,
    pub(crate) pending_bot_resolve_queries: HashMap<u64, resolve::PendingBotResolve>,
    pub(crate) next_bot_resolve_key: u64,
    pub(crate) awaiting_bot_usernames: HashMap<String, Vec<u64>>,
    pub(crate) active_bot_resolves: HashSet<String>,

    // Update emission.
    pub(crate) allowed_update_types: AllowedUpdates,
    pub(crate) tqueue_id: i64,
    pub(crate) update_rate: MinuteRate,

    // Long-poll coordinator.
    pub(crate) parked_get_updates: Option<ParkedGetUpdates>,
    pub(crate) longpoll_generation: u64,
    pub(crate) last_get_updates_offset: i64,
    pub(crate) last_get_updates_at: Option<Instant>,

    // Webhook coordinator.
    pub(crate) webhook: webhook::WebhookState,
    pub(crate) webhook_generation: u64,

    // Flood control.
    pub(crate) flood: FloodControl,
    pub(crate) active_upload_bytes: u64,
    pub(crate) active_upload_count: u64,

    // getFile listeners.
    pub(crate) file_download_listeners: HashMap<i32, Vec<Query>>,

    // Updates held until authorization completes.
    pub(crate) pending_updates: VecDeque<td::Event>,

    // Time.
    pub(crate) local_unix_time_offset: i64,
    pub(crate) shared_unix_time_offset: Arc<AtomicI64>,
    pub(crate) last_synchronization_error_date: Option<i64>,

    // Process-wide knobs mirrored from option updates.
    pub(crate) group_anonymous_bot_user_id: i64,
    pub(crate) channel_bot_user_id: i64,
    pub(crate) service_notifications_chat_id: i64,
    pub(crate) authorization_date: i64,

    pub(crate) last_activity: Instant,
}

impl Client {
    pub fn spawn(token: String, deps: &SharedDeps) -> ClientHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = deps.bridge_factory.create(&token);
        let bot_user_id = crate::settings::parse_bot_token(&token).unwrap_or(0);
        let client = Client {
            token,
            bot_user_id,
            settings: deps.settings.clone(),
            bridge,
            tqueue: deps.tqueue.clone(),
            webhook_db: deps.webhook_db.clone(),
            connector: deps.connector.clone(),
            self_tx: tx.clone(),
            was_authorized: false,
            is_ready: false,
            logging_out: false,
            closing: false,
            clear_tqueue: false,
            api_id_invalid: false,
            next_authorization_time: None,
            finalized: false,
            users: HashMap::new(),
            groups: HashMap::new(),
            supergroups: HashMap::new(),
            chats: HashMap::new(),
            messages: HashMap::new(),
            business_connections: HashMap::new(),
            sticker_set_names: HashMap::new(),
            next_td_query_id: 1,
            pending_td_queries: HashMap::new(),
            cmd_queue: VecDeque::new(),
            yet_unsent_messages: HashMap::new(),
            yet_unsent_message_count: HashMap::new(),
            pending_send_queries: HashMap::new(),
            next_send_query_key: 1,
            new_message_queues: HashMap::new(),
            new_business_message_queues: HashMap::new(),
            new_callback_query_queues: HashMap::new(),
            new_business_callback_query_queues: HashMap::new(),
            temp_bot_user_ids: HashMap::new(),
            temp_bot_usernames: HashMap::new(),
            next_temp_bot_user_id: 1,
            resolved_bot_usernames: HashMap::new(),
            pending_bot_resolve_queries: HashMap::new(),
            next_bot_resolve_key: 1,
            awaiting_bot_usernames: HashMap::new(),
            active_bot_resolves: HashSet::new(),
            allowed_update_types: AllowedUpdates::DEFAULT,
            tqueue_id: bot_user_id,
            update_rate: MinuteRate::default(),
            parked_get_updates: None,
            longpoll_generation: 0,
            last_get_updates_offset: 0,
            last_get_updates_at: None,
            webhook: webhook::WebhookState::default(),
            webhook_generation: 0,
            flood: FloodControl::new(deps.settings.start_time),
            active_upload_bytes: 0,
            active_upload_count: 0,
            file_download_listeners: HashMap::new(),
            pending_updates: VecDeque::new(),
            local_unix_time_offset: 0,
            shared_unix_time_offset: deps.unix_time_offset.clone(),
            last_synchronization_error_date: None,
            group_anonymous_bot_user_id: 0,
            channel_bot_user_id: 0,
            service_notifications_chat_id: 0,
            authorization_date: 0,
            last_activity: Instant::now(),
        };
        tokio::spawn(client.run(rx));
        ClientHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ClientMsg>) {
        // The bridge posts native events on its own channel; forward them
        // into the single mailbox so ordering stays actor-local.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        self.bridge.start(event_tx);
        let forward_tx = self.self_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if forward_tx.send(ClientMsg::Event(event)).is_err() {
                    break;
                }
            }
        });

        self.restore_webhook();

        while let Some(msg) = rx.recv().await {
            match msg {
                ClientMsg::Query(query) => {
                    self.last_activity = Instant::now();
                    self.on_query(query);
                }
                ClientMsg::Event(event) => self.on_event(event),
                ClientMsg::WebhookCallback {
                    generation,
                    callback,
                } => self.on_webhook_callback(generation, callback),
                ClientMsg::Wake(wake) => self.on_wake(wake),
            }
            if self.finalized {
                break;
            }
        }
    }

    // --- Query entry ---

    fn on_query(&mut self, mut query: Query) {
        if self.closing || self.logging_out {
            let error = self.closing_error();
            query.answer_error(&error);
            return;
        }
        // A scheduled re-login backoff fails queries fast with the matching
        // Retry-After instead of queueing them behind a dead login.
        if !self.is_ready
            && let Some(next) = self.next_authorization_time
            && next > Instant::now()
        {
            let error = self.closing_error();
            query.answer_error(&error);
            return;
        }
        if crate::methods::handler_for(&query.method).is_none() {
            query.answer_error(&ApiError::raw(404, "Not Found: method not found"));
            return;
        }
        if crate::methods::is_local_method(&query.method) {
            crate::methods::dispatch(self, query);
            return;
        }
        let snapshot = self.load_snapshot();
        match self.flood.admit(
            snapshot,
            query.has_files(),
            query.files_total_size(),
            self.settings.local_mode,
        ) {
            crate::limits::Admission::Allow => {}
            crate::limits::Admission::Defer(delay) => {
                self.schedule_wake(delay, |query| Wake::RetryDispatch { query }, query);
                return;
            }
            crate::limits::Admission::Reject(error) => {
                query.answer_error(&error);
                return;
            }
        }
        if !self.is_ready {
            self.cmd_queue.push_back(query);
            self.try_start_authorization();
            return;
        }
        self.dispatch_query(query);
    }

    /// Dispatch one admitted query, wiring upload accounting to its
    /// lifetime: the books balance whenever the query is dropped.
    pub(crate) fn dispatch_query(&mut self, mut query: Query) {
        if query.has_files() && query.upload_notice.is_none() {
            let bytes = query.files_total_size();
            self.active_upload_bytes += bytes;
            self.active_upload_count += 1;
            let tx = self.self_tx.clone();
            query.upload_notice = Some(crate::query::DropNotice::new(move || {
                let _ = tx.send(ClientMsg::Wake(Wake::UploadDone { bytes }));
            }));
        }
        crate::methods::dispatch(self, query);
    }

    fn load_snapshot(&mut self) -> LoadSnapshot {
        LoadSnapshot {
            active_request_count: (self.pending_td_queries.len() + self.cmd_queue.len()) as u64,
            active_upload_bytes: self.active_upload_bytes,
            active_upload_count: self.active_upload_count,
            updates_per_minute: self.update_rate.per_minute(),
        }
    }

    fn on_wake(&mut self, wake: Wake) {
        match wake {
            Wake::FailQuery { mut query, error } => query.answer_error(&error),
            Wake::RetryDispatch { query } => {
                if self.closing || self.logging_out {
                    let error = self.closing_error();
                    let mut query = query;
                    query.answer_error(&error);
                } else if !self.is_ready {
                    self.cmd_queue.push_back(query);
                } else {
                    self.dispatch_query(query);
                }
            }
            Wake::LongPollTimeout { generation } => self.on_longpoll_timeout(generation),
            Wake::LongPollFlush { generation } => self.on_longpoll_flush(generation),
            Wake::AuthRetry => self.on_auth_retry(),
            Wake::CertSaved { result } => self.on_cert_saved(result),
            Wake::UploadDone { bytes } => {
                self.active_upload_bytes = self.active_upload_bytes.saturating_sub(bytes);
                self.active_upload_count = self.active_upload_count.saturating_sub(1);
            }
            Wake::IdleCheck => self.on_idle_check(),
        }
    }

    fn on_idle_check(&mut self) {
        let idle_for = self.last_activity.elapsed();
        let limit = if self.api_id_invalid {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(30 * 60)
        };
        let has_work = self.parked_get_updates.is_some()
            || !self.pending_td_queries.is_empty()
            || !self.pending_send_queries.is_empty()
            || self.webhook.is_active();
        if idle_for >= limit && !has_work && !self.closing && !self.logging_out {
            self.close_client(false);
        }
    }

    /// Post a wakeup after `delay`, carrying the query through the sleep.
    pub(crate) fn schedule_wake(
        &self,
        delay: Duration,
        make: impl FnOnce(Query) -> Wake + Send + 'static,
        query: Query,
    ) {
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ClientMsg::Wake(make(query)));
        });
    }

    pub(crate) fn schedule_plain_wake(&self, delay: Duration, wake_factory: fn() -> Wake) {
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ClientMsg::Wake(wake_factory()));
        });
    }

    // --- Native-client plumbing ---

    /// Dispatch one native function with its continuation. Refused while the
    /// close FSM is active: background flows must not touch the native
    /// client past that point.
    pub(crate) fn send_td(&mut self, function: td::Function, callback: TdCallback) {
        if self.closing || self.logging_out {
            let error = td::TdError::new(500, "Request aborted");
            callback(self, Err(error));
            return;
        }
        self.send_td_unchecked(function, callback);
    }

    /// FSM-side dispatch that must work during logout/close handshakes.
    pub(crate) fn send_td_unchecked(&mut self, function: td::Function, callback: TdCallback) {
        let query_id = self.next_td_query_id;
        self.next_td_query_id += 1;
        self.pending_td_queries.insert(query_id, callback);
        self.bridge.send(query_id, function);
    }

    pub(crate) fn on_td_response(&mut self, query_id: u64, result: Result<td::Object, td::TdError>) {
        if let Some(callback) = self.pending_td_queries.remove(&query_id) {
            callback(self, result);
        }
    }

    /// Common shape for passthrough methods: send the function, translate
    /// the result, answer the HTTP query.
    pub(crate) fn send_td_and_answer(
        &mut self,
        query: Query,
        function: td::Function,
        transform: impl FnOnce(&mut Client, td::Object) -> Result<serde_json::Value, ApiError>
        + Send
        + 'static,
    ) {
        let mut query = query;
        self.send_td(
            function,
            Box::new(move |client, result| match result {
                Ok(object) => match transform(client, object) {
                    Ok(value) => query.answer_ok(value),
                    Err(error) => query.answer_error(&error),
                },
                Err(td_error) => {
                    let error = crate::error::from_td_error(td_error.code, &td_error.message);
                    query.answer_error(&error);
                }
            }),
        );
    }

    // --- Time ---

    /// Wall-clock unix time corrected by the larger of the per-client and
    /// shared offsets.
    pub(crate) fn unix_time(&self) -> i64 {
        let shared = self.shared_unix_time_offset.load(Ordering::Relaxed);
        chrono::Utc::now().timestamp() + shared.max(self.local_unix_time_offset)
    }

    pub(crate) fn observe_unix_time(&mut self, reported: i64) {
        let offset = reported - chrono::Utc::now().timestamp();
        if offset > self.local_unix_time_offset {
            self.local_unix_time_offset = offset;
        }
        // The shared offset only ever moves forward.
        let mut shared = self.shared_unix_time_offset.load(Ordering::Relaxed);
        while offset > shared {
            match self.shared_unix_time_offset.compare_exchange(
                shared,
                offset,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => shared = actual,
            }
        }
    }

    // --- Closing-error mapping ---

    pub(crate) fn closing_error(&self) -> ApiError {
        if self.api_id_invalid {
            return ApiError::raw(401, "Unauthorized: invalid api-id/api-hash");
        }
        if let Some(next) = self.next_authorization_time {
            let seconds = next.saturating_duration_since(Instant::now()).as_secs() + 1;
            return ApiError::too_many_requests(seconds);
        }
        if self.logging_out {
            if self.clear_tqueue {
                return ApiError::raw(400, "Logged out");
            }
            return ApiError::raw(401, "Unauthorized");
        }
        ApiError::raw(500, "Internal Server Error: restart")
    }

    // --- Cache access used across submodules ---

    pub(crate) fn message(&self, chat_id: i64, message_id: i64) -> Option<&MessageInfo> {
        self.messages.get(&(chat_id, message_id))
    }

    pub(crate) fn chat_is_channel(&self, chat_id: i64) -> bool {
        match self.chats.get(&chat_id).map(|c| c.kind) {
            Some(crate::models::ChatInfoKind::Supergroup { supergroup_id }) => self
                .supergroups
                .get(&supergroup_id)
                .map(|s| s.is_channel)
                .unwrap_or(false),
            _ => false,
        }
    }

    pub(crate) fn sticker_set_name(&self, set_id: i64) -> Option<&str> {
        self.sticker_set_names.get(&set_id).map(|s| s.as_str())
    }
}
