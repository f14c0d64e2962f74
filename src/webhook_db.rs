use rusqlite::{Connection, params};
use std::sync::Mutex;

/// Webhook persistence collaborator: one row per bot, keyed `token:dc`,
/// holding the marker-encoded webhook string so an installed webhook
/// survives a gateway restart.
pub struct WebhookDb {
    conn: Mutex<Connection>,
}

impl WebhookDb {
    pub fn open(path: &str) -> Self {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path).expect("Failed to open webhook database");
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .expect("Failed to set pragmas");
        let db = WebhookDb {
            conn: Mutex::new(conn),
        };
        db.migrate();
        db
    }

    /// In-memory store for tests and single-shot runs.
    pub fn open_in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to open webhook database");
        let db = WebhookDb {
            conn: Mutex::new(conn),
        };
        db.migrate();
        db
    }

    fn migrate(&self) {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS webhooks (
                key TEXT PRIMARY KEY,
                info TEXT NOT NULL
            );",
        )
        .expect("Failed to run webhook migrations");
    }

    pub fn save(&self, key: &str, info: &str) {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO webhooks (key, info) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET info = excluded.info",
            params![key, info],
        )
        .ok();
    }

    pub fn load(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT info FROM webhooks WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .ok()
    }

    pub fn delete(&self, key: &str) {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM webhooks WHERE key = ?1", params![key])
            .ok();
    }
}
