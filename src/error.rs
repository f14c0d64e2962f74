use serde::Serialize;

/// A Bot-API-level error: HTTP status code, human-readable description and an
/// optional Retry-After hint surfaced both in the JSON body and as a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        let message = prefix_message(code, message.into());
        ApiError {
            code,
            message,
            retry_after: None,
        }
    }

    /// Build an error without touching the message. Used when the text is
    /// already in its final Bot-API form.
    pub fn raw(code: u16, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    pub fn too_many_requests(retry_after: u64) -> Self {
        ApiError {
            code: 429,
            message: format!("Too Many Requests: retry after {retry_after}"),
            retry_after: Some(retry_after),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// The Bot-API response body: `{"ok":false,"error_code":…,"description":…}`
    /// plus `parameters.retry_after` when present.
    pub fn to_response_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "ok": false,
            "error_code": self.code,
            "description": self.message,
        });
        if let Some(retry_after) = self.retry_after {
            body["parameters"] = serde_json::json!({ "retry_after": retry_after });
        }
        body
    }
}

/// Translate a native-client error into its Bot-API form, applying the
/// synonym table and code reclassification.
pub fn from_td_error(code: i32, message: &str) -> ApiError {
    // `Too Many Requests: retry after N` carries a machine-readable delay.
    if let Some(rest) = message.strip_prefix("Too Many Requests: retry after") {
        if let Ok(seconds) = rest.trim().parse::<u64>() {
            return ApiError::too_many_requests(seconds);
        }
    }

    let (code, text): (u16, String) = match message {
        "MESSAGE_NOT_MODIFIED" => (
            400,
            "message is not modified: specified new message content and reply markup are \
             exactly the same as a current content and reply markup of the message"
                .to_string(),
        ),
        "WC_CONVERT_URL_INVALID" | "EXTERNAL_URL_INVALID" => {
            (400, "Wrong HTTP URL specified".to_string())
        }
        "USER_IS_BLOCKED" => (403, "bot was blocked by the user".to_string()),
        "INPUT_USER_DEACTIVATED" => (403, "user is deactivated".to_string()),
        "USER_NOT_FOUND" => (400, "user not found".to_string()),
        "CHAT_NOT_FOUND" => (400, "chat not found".to_string()),
        "MESSAGE_ID_INVALID" => (400, "message to be replied not found".to_string()),
        "MESSAGE_EMPTY" => (400, "message text is empty".to_string()),
        "WEBPAGE_CURL_FAILED" => (400, "failed to get HTTP URL content".to_string()),
        "WEBPAGE_MEDIA_EMPTY" => (400, "wrong type of the web page content".to_string()),
        "MEDIA_GROUPED_INVALID" => (400, "can't use the media of the specified type in the album".to_string()),
        "CHAT_ADMIN_REQUIRED" => (400, "need administrator rights in the chat".to_string()),
        "PEER_ID_INVALID" => (400, "chat not found".to_string()),
        "BOT_DOMAIN_INVALID" => (
            400,
            "invalid domain for the bot, you must add the domain in @BotFather".to_string(),
        ),
        "Internal Server Error" => (500, "Internal Server Error".to_string()),
        other => (reclass_code(code), other.to_string()),
    };

    ApiError::new(code, text)
}

fn reclass_code(code: i32) -> u16 {
    match code {
        400 | 401 | 403 | 404 | 409 | 429 => code as u16,
        500..=599 => 500,
        _ => 400,
    }
}

/// Prepend the status prefix (`Bad Request: …`) unless the message already
/// carries one, lowercasing the first character of the tail unless the word
/// looks like an opaque all-caps constant the Bot API must preserve.
fn prefix_message(code: u16, message: String) -> String {
    let prefix = match code {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => return message,
    };
    if message.starts_with(prefix) {
        return message;
    }
    let mut chars = message.chars();
    let tail = match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            let keep_case = message
                .chars()
                .nth(1)
                .map(|second| second.is_ascii_uppercase() || second == '_')
                .unwrap_or(false);
            if keep_case {
                message.clone()
            } else {
                let mut lowered = first.to_ascii_lowercase().to_string();
                lowered.push_str(chars.as_str());
                lowered
            }
        }
        _ => message.clone(),
    };
    format!("{prefix}: {tail}")
}
