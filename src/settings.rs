use std::env;
use std::time::Instant;

/// Gateway-wide settings, read once at startup. All values come from
/// environment variables with defaults that match the hosted Bot API.
///
/// Environment variables:
/// - `BOTGATE_API_ID` / `BOTGATE_API_HASH` — application credentials passed to the native client
/// - `BOTGATE_DIR` — base directory for per-bot storage (default: `data`)
/// - `BOTGATE_LOCAL_MODE` — relax upload limits and expose absolute file paths (default: off)
/// - `BOTGATE_ALLOW_USERS_REGISTRATION`-style knobs stay with the native client and are not read here
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_id: i32,
    pub api_hash: String,
    /// Base directory; each bot owns `<base_dir>/<bot_id>/`.
    pub base_dir: String,
    /// Local mode: `file:/` inputs allowed, no download cap, absolute paths in getFile.
    pub local_mode: bool,
    /// Datacenter flag recorded in the webhook persistence key (`token:dc`).
    pub test_dc: bool,
    /// Process start, used to skip flood admission during warm-up.
    pub start_time: Instant,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_id: 0,
            api_hash: String::new(),
            base_dir: "data".to_string(),
            local_mode: false,
            test_dc: false,
            start_time: Instant::now(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(val) = env::var("BOTGATE_API_ID")
            && let Ok(n) = val.parse::<i32>()
        {
            settings.api_id = n;
        }
        if let Ok(val) = env::var("BOTGATE_API_HASH") {
            settings.api_hash = val;
        }
        if let Ok(val) = env::var("BOTGATE_DIR") {
            settings.base_dir = val;
        }
        if let Ok(val) = env::var("BOTGATE_LOCAL_MODE") {
            settings.local_mode = val != "0" && val.to_lowercase() != "false";
        }
        if let Ok(val) = env::var("BOTGATE_TEST_DC") {
            settings.test_dc = val != "0" && val.to_lowercase() != "false";
        }
        settings
    }

    /// Storage directory for one bot.
    pub fn bot_dir(&self, bot_id: i64) -> String {
        format!("{}/{}", self.base_dir, bot_id)
    }

    /// Persistence key for the webhook row: `token:dc`.
    pub fn webhook_key(&self, token: &str) -> String {
        let dc = if self.test_dc { "test" } else { "main" };
        format!("{token}:{dc}")
    }
}

/// Validate the `<id>:<base64url>` token shape and extract the numeric bot id.
pub fn parse_bot_token(token: &str) -> Option<i64> {
    let (id_part, secret) = token.split_once(':')?;
    let id: i64 = id_part.parse().ok()?;
    if id <= 0 || secret.len() < 30 {
        return None;
    }
    let valid = secret
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid {
        return None;
    }
    Some(id)
}
