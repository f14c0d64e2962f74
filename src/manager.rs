// Client registry: one actor per bot token, spawned on first use, recycled
// after idling. Shared collaborators are created once and handed to every
// client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{Client, ClientHandle, ClientMsg, SharedDeps, Wake};
use crate::error::ApiError;
use crate::query::{ApiResponse, Query, UploadedFile};
use crate::settings::parse_bot_token;

/// Interval between idle sweeps over the client table.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct ClientManager {
    deps: SharedDeps,
    clients: Arc<Mutex<HashMap<String, ClientHandle>>>,
}

impl ClientManager {
    pub fn new(deps: SharedDeps) -> Self {
        ClientManager {
            deps,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Periodic sweep: nudge every live client to check its idle timer and
    /// drop table entries whose actors are gone. Spawned at liftoff, once a
    /// runtime exists.
    pub fn start_sweeper(&self) {
        let sweep_clients = self.clients.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                let mut table = sweep_clients.lock().unwrap_or_else(|e| e.into_inner());
                table.retain(|_, handle| {
                    if !handle.is_alive() {
                        return false;
                    }
                    handle.send(ClientMsg::Wake(Wake::IdleCheck));
                    true
                });
            }
        });
    }

    /// Route one HTTP query to its bot's client actor, spawning the actor
    /// on first use.
    pub async fn execute(
        &self,
        token: &str,
        method: &str,
        args: HashMap<String, String>,
        files: HashMap<String, UploadedFile>,
    ) -> ApiResponse {
        if parse_bot_token(token).is_none() {
            return ApiResponse::error(&ApiError::unauthorized("invalid token specified"));
        }
        let (query, rx) = Query::new(method, args, files);

        let handle = {
            let mut table = self.clients.lock().unwrap_or_else(|e| e.into_inner());
            match table.get(token) {
                Some(handle) if handle.is_alive() => handle.clone(),
                _ => {
                    let handle = Client::spawn(token.to_string(), &self.deps);
                    table.insert(token.to_string(), handle.clone());
                    handle
                }
            }
        };

        if !handle.send_query(query) {
            // The actor died between lookup and send; next request respawns.
            return ApiResponse::error(&ApiError::internal("restart"));
        }
        match rx.await {
            Ok(response) => response,
            Err(_) => ApiResponse::error(&ApiError::internal("restart")),
        }
    }
}
