// Webhook delivery actor. The client actor owns lifecycle state; this module
// owns the HTTPS push loop. The two sides exchange the small command and
// callback vocabulary below, so tests can substitute a recording connector.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::tqueue::TQueue;

/// Parameters of one installed webhook, as validated by setWebhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookParams {
    pub url: String,
    pub ip_address: String,
    pub max_connections: i32,
    pub secret_token: String,
    pub fix_ip_address: bool,
    pub cert_path: Option<String>,
}

#[derive(Debug)]
pub enum Command {
    /// New updates were pushed to the TQueue; resume draining.
    NewUpdates,
    Close,
}

#[derive(Debug, Clone)]
pub enum Callback {
    /// First delivery attempt reached the target; setWebhook can be answered.
    Verified { cached_ip: String },
    Success,
    Error { status: u16, message: String },
    Closed,
}

pub type CallbackFn = Arc<dyn Fn(Callback) + Send + Sync>;

/// Command side of a running delivery actor.
#[derive(Clone)]
pub struct WebhookHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl WebhookHandle {
    /// Handle plus the command stream its actor must consume.
    pub fn new() -> (WebhookHandle, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WebhookHandle { tx }, rx)
    }

    pub fn notify(&self) {
        let _ = self.tx.send(Command::NewUpdates);
    }

    pub fn close(&self) {
        let _ = self.tx.send(Command::Close);
    }
}

/// Spawns delivery actors. The HTTPS implementation is the production path;
/// tests install their own connector to observe lifecycle traffic.
pub trait Connector: Send + Sync {
    fn spawn(
        &self,
        params: WebhookParams,
        tqueue: Arc<TQueue>,
        queue_id: i64,
        callbacks: CallbackFn,
    ) -> WebhookHandle;
}

/// Production connector: one task per webhook, single in-flight POST,
/// events acknowledged (forgotten) only after a 2xx response so TQueue
/// order is preserved per queue tag.
pub struct HttpsConnector;

impl Connector for HttpsConnector {
    fn spawn(
        &self,
        params: WebhookParams,
        tqueue: Arc<TQueue>,
        queue_id: i64,
        callbacks: CallbackFn,
    ) -> WebhookHandle {
        let (handle, rx) = WebhookHandle::new();
        tokio::spawn(run_delivery(params, tqueue, queue_id, callbacks, rx));
        handle
    }
}

async fn run_delivery(
    params: WebhookParams,
    tqueue: Arc<TQueue>,
    queue_id: i64,
    callbacks: CallbackFn,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(30));
    if let Some(cert_path) = &params.cert_path {
        match std::fs::read(cert_path) {
            Ok(pem) => match reqwest::Certificate::from_pem(&pem) {
                Ok(cert) => builder = builder.add_root_certificate(cert),
                Err(e) => eprintln!("⚠️ Webhook {}: bad certificate: {e}", params.url),
            },
            Err(e) => eprintln!("⚠️ Webhook {}: can't read certificate: {e}", params.url),
        }
    }
    let client = match builder.build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("⚠️ Webhook {}: failed to create HTTP client: {e}", params.url);
            callbacks(Callback::Closed);
            return;
        }
    };

    let mut verified = false;
    // Nothing buffered yet still verifies the webhook: the install succeeded
    // and the first real update will exercise the connection.
    if tqueue.size(queue_id, chrono::Utc::now().timestamp()) == 0 {
        verified = true;
        callbacks(Callback::Verified {
            cached_ip: params.ip_address.clone(),
        });
    }

    let mut backoff = Duration::from_secs(1);
    loop {
        let now = chrono::Utc::now().timestamp();
        let batch = tqueue.get(queue_id, 0, 1, now);
        let Some(event) = batch.into_iter().next() else {
            // Drained; park until the client signals new updates.
            match rx.recv().await {
                Some(Command::NewUpdates) => continue,
                Some(Command::Close) | None => break,
            }
        };

        let body = match crate::client::stored_update_to_json(&event) {
            Some(body) => body,
            None => {
                tqueue.forget_before(queue_id, event.id + 1);
                continue;
            }
        };

        let mut request = client
            .post(&params.url)
            .header("Content-Type", "application/json");
        if !params.secret_token.is_empty() {
            request = request.header("X-Telegram-Bot-Api-Secret-Token", &params.secret_token);
        }

        match request.body(body).send().await {
            Ok(resp) => {
                if !verified {
                    verified = true;
                    callbacks(Callback::Verified {
                        cached_ip: params.ip_address.clone(),
                    });
                }
                if resp.status().is_success() {
                    tqueue.forget_before(queue_id, event.id + 1);
                    backoff = Duration::from_secs(1);
                    callbacks(Callback::Success);
                } else {
                    callbacks(Callback::Error {
                        status: resp.status().as_u16(),
                        message: format!("Wrong response from the webhook: {}", resp.status()),
                    });
                    if wait_or_close(&mut rx, backoff).await {
                        break;
                    }
                    backoff = (backoff * 2).min(Duration::from_secs(60));
                }
            }
            Err(e) => {
                callbacks(Callback::Error {
                    status: 0,
                    message: format!("Connection failed: {e}"),
                });
                if wait_or_close(&mut rx, backoff).await {
                    break;
                }
                backoff = (backoff * 2).min(Duration::from_secs(60));
            }
        }
    }
    callbacks(Callback::Closed);
}

/// Sleep through the backoff but react to Close immediately. Returns true
/// when the actor must shut down.
async fn wait_or_close(rx: &mut mpsc::UnboundedReceiver<Command>, backoff: Duration) -> bool {
    tokio::select! {
        cmd = rx.recv() => !matches!(cmd, Some(Command::NewUpdates)),
        _ = tokio::time::sleep(backoff) => false,
    }
}
