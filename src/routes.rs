// Thin HTTP surface: `/bot<token>/<method>`. The router only folds query
// parameters and an optional JSON body into a Query for the client manager;
// every Bot-API semantic lives behind the mailbox.

use std::collections::HashMap;

use rocket::http::{Header, Status};
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::{Request, State, get, post};

use crate::manager::ClientManager;
use crate::query::ApiResponse;

/// Bot-API envelope responder: JSON body, mirrored status code, Retry-After
/// header when the error carries one.
pub struct BotApiResponse(ApiResponse);

impl<'r, 'o: 'r> Responder<'r, 'o> for BotApiResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let mut response = Response::build_from(Json(self.0.body).respond_to(req)?)
            .status(Status::new(self.0.code))
            .finalize();
        if let Some(retry_after) = self.0.retry_after {
            response.set_header(Header::new("Retry-After", retry_after.to_string()));
        }
        Ok(response)
    }
}

#[post("/<token>/<method>?<params..>", data = "<body>")]
pub async fn bot_method_post(
    manager: &State<ClientManager>,
    token: &str,
    method: &str,
    params: HashMap<String, String>,
    body: Option<Json<serde_json::Value>>,
) -> BotApiResponse {
    execute(manager, token, method, params, body.map(|b| b.into_inner())).await
}

#[get("/<token>/<method>?<params..>")]
pub async fn bot_method_get(
    manager: &State<ClientManager>,
    token: &str,
    method: &str,
    params: HashMap<String, String>,
) -> BotApiResponse {
    execute(manager, token, method, params, None).await
}

async fn execute(
    manager: &State<ClientManager>,
    token: &str,
    method: &str,
    mut params: HashMap<String, String>,
    body: Option<serde_json::Value>,
) -> BotApiResponse {
    let Some(token) = token.strip_prefix("bot") else {
        return BotApiResponse(ApiResponse {
            code: 404,
            body: serde_json::json!({
                "ok": false,
                "error_code": 404,
                "description": "Not Found",
            }),
            retry_after: None,
        });
    };

    // JSON body fields override query parameters of the same name.
    if let Some(serde_json::Value::Object(fields)) = body {
        for (name, value) in fields {
            let rendered = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            params.insert(name, rendered);
        }
    }

    BotApiResponse(manager.execute(token, method, params, HashMap::new()).await)
}

#[rocket::catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": false,
        "error_code": 404,
        "description": "Not Found",
    }))
}

#[rocket::catch(429)]
pub fn too_many_requests() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": false,
        "error_code": 429,
        "description": "Too Many Requests",
    }))
}
