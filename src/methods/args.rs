// Shared argument extractors for method handlers. Every extractor returns
// the Bot-API error it wants surfaced, so handlers stay linear.

use serde_json::Value;

use crate::client::Client;
use crate::error::ApiError;
use crate::query::Query;
use crate::td;

pub fn integer(query: &Query, name: &str) -> Option<i64> {
    query.arg(name).and_then(|s| s.trim().parse().ok())
}

pub fn integer_in(
    query: &Query,
    name: &str,
    default: i64,
    min: i64,
    max: i64,
) -> i64 {
    integer(query, name).unwrap_or(default).clamp(min, max)
}

pub fn required_integer(query: &Query, name: &str) -> Result<i64, ApiError> {
    integer(query, name)
        .ok_or_else(|| ApiError::bad_request(format!("{name} is not specified")))
}

pub fn boolean(query: &Query, name: &str) -> bool {
    matches!(query.arg(name), Some("true") | Some("1") | Some("yes"))
}

pub fn string(query: &Query, name: &str) -> String {
    query.arg(name).unwrap_or("").to_string()
}

pub fn required_string(query: &Query, name: &str) -> Result<String, ApiError> {
    let value = string(query, name);
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{name} is empty")));
    }
    Ok(value)
}

pub fn chat_id(query: &Query) -> Result<i64, ApiError> {
    let raw = query
        .arg("chat_id")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("chat_id is empty"))?;
    raw.parse()
        .map_err(|_| ApiError::bad_request("chat not found"))
}

pub fn named_chat_id(query: &Query, name: &str) -> Result<i64, ApiError> {
    let raw = query
        .arg(name)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{name} is empty")))?;
    raw.parse()
        .map_err(|_| ApiError::bad_request("chat not found"))
}

pub fn user_id(query: &Query) -> Result<i64, ApiError> {
    let id = required_integer(query, "user_id")?;
    if id <= 0 {
        return Err(ApiError::bad_request("user not found"));
    }
    Ok(id)
}

/// External message id → internal id, with the round-trip check.
pub fn message_id(query: &Query, name: &str) -> Result<i64, ApiError> {
    let raw = integer(query, name)
        .ok_or_else(|| ApiError::bad_request("message identifier is not specified"))?;
    let client_id = i32::try_from(raw).map_err(|_| ApiError::bad_request("message not found"))?;
    if client_id <= 0 {
        return Err(ApiError::bad_request("message not found"));
    }
    Ok(td::message_id::from_client(client_id))
}

/// JSON array of external message ids.
pub fn message_ids(query: &Query, name: &str) -> Result<Vec<i64>, ApiError> {
    let raw = query
        .arg(name)
        .ok_or_else(|| ApiError::bad_request("message identifiers are not specified"))?;
    let Ok(Value::Array(items)) = serde_json::from_str(raw) else {
        return Err(ApiError::bad_request("expected an Array of message identifiers"));
    };
    if items.is_empty() || items.len() > 100 {
        return Err(ApiError::bad_request(
            "expected from 1 to 100 message identifiers",
        ));
    }
    items
        .iter()
        .map(|item| {
            item.as_i64()
                .and_then(|id| i32::try_from(id).ok())
                .filter(|id| *id > 0)
                .map(td::message_id::from_client)
                .ok_or_else(|| ApiError::bad_request("message not found"))
        })
        .collect()
}

/// `reply_parameters` with the legacy `reply_to_message_id` fallback.
pub fn reply_to(query: &Query, chat_id: i64) -> Result<Option<td::ReplyTo>, ApiError> {
    if let Some(raw) = query.arg("reply_parameters") {
        let value: Value = serde_json::from_str(raw)
            .map_err(|_| ApiError::bad_request("can't parse reply parameters JSON object"))?;
        let message_id = value
            .get("message_id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ApiError::bad_request("message identifier is not specified"))?;
        let reply_chat_id = value
            .get("chat_id")
            .and_then(|v| v.as_i64())
            .unwrap_or(chat_id);
        let client_id = i32::try_from(message_id)
            .map_err(|_| ApiError::bad_request("message to be replied not found"))?;
        return Ok(Some(td::ReplyTo::Message {
            chat_id: reply_chat_id,
            message_id: td::message_id::from_client(client_id),
        }));
    }
    if let Some(id) = integer(query, "reply_to_message_id")
        && id > 0
    {
        let client_id = i32::try_from(id)
            .map_err(|_| ApiError::bad_request("message to be replied not found"))?;
        return Ok(Some(td::ReplyTo::Message {
            chat_id,
            message_id: td::message_id::from_client(client_id),
        }));
    }
    Ok(None)
}

/// Any argument documented as a JSON object/array that the engine treats as
/// opaque: parsed for validity, passed through untouched.
pub fn json_arg(query: &Query, name: &str) -> Result<Option<Value>, ApiError> {
    let Some(raw) = query.arg(name) else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|_| ApiError::bad_request(format!("can't parse {name} JSON object")))
}

pub fn required_json_arg(query: &Query, name: &str) -> Result<Value, ApiError> {
    json_arg(query, name)?
        .ok_or_else(|| ApiError::bad_request(format!("{name} is not specified")))
}

/// Caption triple carried opaquely to the native client.
pub fn caption(query: &Query) -> Value {
    let mut body = serde_json::json!({ "text": string(query, "caption") });
    if let Some(parse_mode) = query.arg("parse_mode") {
        body["parse_mode"] = serde_json::json!(parse_mode);
    }
    if let Some(Ok(entities)) = query
        .arg("caption_entities")
        .map(serde_json::from_str::<Value>)
    {
        body["entities"] = entities;
    }
    if boolean(query, "show_caption_above_media") {
        body["show_caption_above_media"] = serde_json::json!(true);
    }
    body
}

pub fn text_entities(query: &Query, name: &str) -> Value {
    query
        .arg(name)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Array(Vec::new()))
}

/// Input-file resolution: a direct multipart part, an `attach://NAME`
/// reference, a `file:/` path (local mode only) or a remote file id.
pub fn input_file(
    query: &Query,
    name: &str,
    local_mode: bool,
) -> Result<Option<td::InputFile>, ApiError> {
    if let Some(file) = query.file(name) {
        return Ok(Some(td::InputFile::Memory {
            filename: file.filename.clone(),
            data: file.data.clone(),
        }));
    }
    let Some(value) = query.arg(name).map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    input_file_value(query, value, local_mode).map(Some)
}

/// Resolve a file reference that arrived as a bare string value, e.g. the
/// `media` field inside InputMedia objects.
pub fn input_file_value(
    query: &Query,
    value: &str,
    local_mode: bool,
) -> Result<td::InputFile, ApiError> {
    if let Some(field) = value.strip_prefix("attach://") {
        let file = query.file(field).ok_or_else(|| {
            ApiError::bad_request(format!("file not found in request: {field}"))
        })?;
        return Ok(td::InputFile::Memory {
            filename: file.filename.clone(),
            data: file.data.clone(),
        });
    }
    if value.starts_with("file:/") {
        if !local_mode {
            return Err(ApiError::bad_request(
                "files can be sent by path only in --local mode",
            ));
        }
        let path = value.trim_start_matches("file://").trim_start_matches("file:");
        let decoded = urlencoding::decode(path)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| path.to_string());
        return Ok(td::InputFile::Local(decoded));
    }
    Ok(td::InputFile::Remote(value.to_string()))
}

pub fn required_input_file(
    query: &Query,
    name: &str,
    local_mode: bool,
) -> Result<td::InputFile, ApiError> {
    input_file(query, name, local_mode)?
        .ok_or_else(|| ApiError::bad_request(format!("there is no {name} in the request")))
}

/// Thumbnails accept `thumbnail` with the legacy `thumb` fallback.
pub fn thumbnail(query: &Query, local_mode: bool) -> Result<Option<td::InputFile>, ApiError> {
    match input_file(query, "thumbnail", local_mode)? {
        Some(file) => Ok(Some(file)),
        None => input_file(query, "thumb", local_mode),
    }
}

// --- Reply markup ---

/// Parse `reply_markup`. Login-url buttons referencing other bots get
/// temporary ids from the client, to be rewritten after resolution.
pub fn reply_markup(
    client: &mut Client,
    query: &Query,
) -> Result<Option<td::ReplyMarkup>, ApiError> {
    let Some(raw) = query.arg("reply_markup") else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw)
        .map_err(|_| ApiError::bad_request("can't parse reply keyboard markup JSON object"))?;

    if let Some(rows) = value.get("inline_keyboard").and_then(|v| v.as_array()) {
        let mut parsed_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let buttons = row
                .as_array()
                .ok_or_else(|| ApiError::bad_request("field \"inline_keyboard\" must be an Array of Arrays"))?;
            let mut parsed_row = Vec::with_capacity(buttons.len());
            for button in buttons {
                parsed_row.push(inline_button(client, button)?);
            }
            parsed_rows.push(parsed_row);
        }
        return Ok(Some(td::ReplyMarkup::InlineKeyboard { rows: parsed_rows }));
    }
    if value.get("keyboard").is_some() {
        return Ok(Some(td::ReplyMarkup::ShowKeyboard(value)));
    }
    if value
        .get("remove_keyboard")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        return Ok(Some(td::ReplyMarkup::RemoveKeyboard {
            is_personal: value
                .get("selective")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }));
    }
    if value
        .get("force_reply")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        return Ok(Some(td::ReplyMarkup::ForceReply {
            is_personal: value
                .get("selective")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            input_field_placeholder: value
                .get("input_field_placeholder")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        }));
    }
    Ok(None)
}

fn inline_button(client: &mut Client, value: &Value) -> Result<td::InlineButton, ApiError> {
    let text = value
        .get("text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::bad_request("text of the inline keyboard button is empty"))?
        .to_string();

    let kind = if let Some(url) = value.get("url").and_then(|v| v.as_str()) {
        td::InlineButtonKind::Url {
            url: url.to_string(),
        }
    } else if let Some(login) = value.get("login_url").filter(|v| v.is_object()) {
        let url = login
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ApiError::bad_request("LoginUrl must have a url"))?
            .to_string();
        let forward_text = login
            .get("forward_text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let request_write_access = login
            .get("request_write_access")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let bot_username = login
            .get("bot_username")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim_start_matches('@')
            .to_string();
        let user_id = if bot_username.is_empty() {
            client.bot_user_id
        } else {
            client.temp_bot_user_id(&bot_username)
        };
        let magnitude = user_id.abs();
        td::InlineButtonKind::LoginUrl {
            url,
            id: if request_write_access { -magnitude } else { magnitude },
            forward_text,
        }
    } else if let Some(data) = value.get("callback_data").and_then(|v| v.as_str()) {
        td::InlineButtonKind::Callback {
            data: data.as_bytes().to_vec(),
        }
    } else if value.get("callback_game").is_some() {
        td::InlineButtonKind::CallbackGame
    } else if let Some(query_text) = value
        .get("switch_inline_query")
        .and_then(|v| v.as_str())
    {
        td::InlineButtonKind::SwitchInline {
            query: query_text.to_string(),
            target: serde_json::json!("any_chat"),
        }
    } else if let Some(query_text) = value
        .get("switch_inline_query_current_chat")
        .and_then(|v| v.as_str())
    {
        td::InlineButtonKind::SwitchInline {
            query: query_text.to_string(),
            target: serde_json::json!("current_chat"),
        }
    } else if let Some(web_app) = value.get("web_app").filter(|v| v.is_object()) {
        td::InlineButtonKind::WebApp {
            url: web_app
                .get("url")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        }
    } else if value.get("pay").and_then(|v| v.as_bool()).unwrap_or(false) {
        td::InlineButtonKind::Pay
    } else if let Some(copy) = value.get("copy_text").filter(|v| v.is_object()) {
        td::InlineButtonKind::CopyText {
            text: copy
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        }
    } else {
        return Err(ApiError::bad_request(
            "text buttons are unallowed in the inline keyboard",
        ));
    };

    Ok(td::InlineButton { text, kind })
}
