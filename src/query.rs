use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::ApiError;

/// A file the HTTP layer received as a multipart part, referenced from
/// arguments via `attach://<field>`.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// The final answer for one HTTP query: the Bot-API envelope plus the
/// Retry-After value echoed as a header.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub code: u16,
    pub body: serde_json::Value,
    pub retry_after: Option<u64>,
}

impl ApiResponse {
    pub fn ok(result: serde_json::Value) -> Self {
        ApiResponse {
            code: 200,
            body: serde_json::json!({ "ok": true, "result": result }),
            retry_after: None,
        }
    }

    pub fn error(error: &ApiError) -> Self {
        ApiResponse {
            code: error.code,
            body: error.to_response_body(),
            retry_after: error.retry_after,
        }
    }
}

/// Runs its closure when dropped; used to release upload accounting when a
/// file-carrying query finishes, however it finishes.
pub struct DropNotice(Option<Box<dyn FnOnce() + Send>>);

impl DropNotice {
    pub fn new(notice: impl FnOnce() + Send + 'static) -> Self {
        DropNotice(Some(Box::new(notice)))
    }
}

impl Drop for DropNotice {
    fn drop(&mut self) {
        if let Some(notice) = self.0.take() {
            notice();
        }
    }
}

impl std::fmt::Debug for DropNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DropNotice")
    }
}

/// One parsed HTTP query on its way through a client actor. The router fills
/// arguments and files; handlers read them through the extractor helpers and
/// exactly one of `answer_ok` / `answer_error` fires the responder.
#[derive(Debug)]
pub struct Query {
    pub method: String,
    args: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
    responder: Option<oneshot::Sender<ApiResponse>>,
    pub arrived_at: Instant,
    pub(crate) upload_notice: Option<DropNotice>,
}

impl Query {
    pub fn new(
        method: &str,
        args: HashMap<String, String>,
        files: HashMap<String, UploadedFile>,
    ) -> (Query, oneshot::Receiver<ApiResponse>) {
        let (tx, rx) = oneshot::channel();
        let query = Query {
            method: method.to_ascii_lowercase(),
            args,
            files,
            responder: Some(tx),
            arrived_at: Instant::now(),
            upload_notice: None,
        };
        (query, rx)
    }

    /// Fire-and-forget variant for internal use where nobody awaits the
    /// answer.
    pub fn internal(method: &str, args: HashMap<String, String>) -> Query {
        Query {
            method: method.to_ascii_lowercase(),
            args,
            files: HashMap::new(),
            responder: None,
            arrived_at: Instant::now(),
            upload_notice: None,
        }
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(|s| s.as_str())
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.get(field)
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn files_total_size(&self) -> u64 {
        self.files.values().map(|f| f.data.len() as u64).sum()
    }

    pub fn answer_ok(&mut self, result: serde_json::Value) {
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(ApiResponse::ok(result));
        }
    }

    /// Success with the human-readable `description` some methods carry.
    pub fn answer_ok_described(&mut self, result: serde_json::Value, description: &str) {
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(ApiResponse {
                code: 200,
                body: serde_json::json!({
                    "ok": true,
                    "result": result,
                    "description": description,
                }),
                retry_after: None,
            });
        }
    }

    pub fn answer_error(&mut self, error: &ApiError) {
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(ApiResponse::error(error));
        }
    }

    pub fn is_answered(&self) -> bool {
        self.responder.is_none()
    }
}
