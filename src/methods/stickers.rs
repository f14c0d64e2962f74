// Sticker and sticker-set management handlers.

use serde_json::Value;

use crate::client::Client;
use crate::error::ApiError;
use crate::query::Query;
use crate::td;

use super::{args, try_parse};

pub fn get_sticker_set(client: &mut Client, query: Query) {
    let name = try_parse!(query, args::required_string(&query, "name"));
    let function = td::Function::SearchStickerSet { name };
    client.send_td_and_answer(query, function, |client, object| match object {
        td::Object::StickerSet(set) => {
            client.sticker_set_names.insert(set.id, set.name.clone());
            Ok(crate::render::sticker_set_json(client, &set))
        }
        other => super::object_to_value(client, other),
    });
}

pub fn get_custom_emoji_stickers(client: &mut Client, query: Query) {
    let ids = try_parse!(query, args::required_json_arg(&query, "custom_emoji_ids"));
    let Some(items) = ids.as_array() else {
        let mut query = query;
        query.answer_error(&ApiError::bad_request(
            "expected an Array of custom emoji identifiers",
        ));
        return;
    };
    if items.len() > 200 {
        let mut query = query;
        query.answer_error(&ApiError::bad_request(
            "expected from 0 to 200 custom emoji identifiers",
        ));
        return;
    }
    let custom_emoji_ids = items
        .iter()
        .filter_map(|item| {
            item.as_str()
                .and_then(|s| s.parse().ok())
                .or_else(|| item.as_i64())
        })
        .collect();
    let function = td::Function::GetCustomEmojiStickers { custom_emoji_ids };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn upload_sticker_file(client: &mut Client, query: Query) {
    let user_id = try_parse!(query, args::user_id(&query));
    let sticker_format = try_parse!(query, args::required_string(&query, "sticker_format"));
    let sticker = try_parse!(
        query,
        args::required_input_file(&query, "sticker", client.settings.local_mode)
    );
    let function = td::Function::UploadStickerFile {
        user_id,
        sticker_format,
        sticker,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn create_new_sticker_set(client: &mut Client, query: Query) {
    let user_id = try_parse!(query, args::user_id(&query));
    let name = try_parse!(query, args::required_string(&query, "name"));
    let title = try_parse!(query, args::required_string(&query, "title"));
    let stickers = try_parse!(query, args::required_json_arg(&query, "stickers"));
    let sticker_type = Value::String(args::string(&query, "sticker_type"));
    let function = td::Function::CreateNewStickerSet {
        user_id,
        title,
        name,
        sticker_type,
        needs_repainting: args::boolean(&query, "needs_repainting"),
        stickers,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn add_sticker_to_set(client: &mut Client, query: Query) {
    let user_id = try_parse!(query, args::user_id(&query));
    let name = try_parse!(query, args::required_string(&query, "name"));
    let sticker = try_parse!(query, args::required_json_arg(&query, "sticker"));
    let function = td::Function::AddStickerToSet {
        user_id,
        name,
        sticker,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn replace_sticker_in_set(client: &mut Client, query: Query) {
    let user_id = try_parse!(query, args::user_id(&query));
    let name = try_parse!(query, args::required_string(&query, "name"));
    let old_sticker = try_parse!(
        query,
        args::required_input_file(&query, "old_sticker", client.settings.local_mode)
    );
    let new_sticker = try_parse!(query, args::required_json_arg(&query, "sticker"));
    let function = td::Function::ReplaceStickerInSet {
        user_id,
        name,
        old_sticker,
        new_sticker,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_sticker_position_in_set(client: &mut Client, query: Query) {
    let sticker = try_parse!(
        query,
        args::required_input_file(&query, "sticker", client.settings.local_mode)
    );
    let position = try_parse!(query, args::required_integer(&query, "position"));
    let function = td::Function::SetStickerPositionInSet {
        sticker,
        position: position as i32,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn delete_sticker_from_set(client: &mut Client, query: Query) {
    let sticker = try_parse!(
        query,
        args::required_input_file(&query, "sticker", client.settings.local_mode)
    );
    let function = td::Function::RemoveStickerFromSet { sticker };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_sticker_emoji_list(client: &mut Client, query: Query) {
    let sticker = try_parse!(
        query,
        args::required_input_file(&query, "sticker", client.settings.local_mode)
    );
    let emoji_list = try_parse!(query, args::required_json_arg(&query, "emoji_list"));
    let emojis = emoji_list
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<String>()
        })
        .unwrap_or_default();
    let function = td::Function::SetStickerEmojis { sticker, emojis };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_sticker_keywords(client: &mut Client, query: Query) {
    let sticker = try_parse!(
        query,
        args::required_input_file(&query, "sticker", client.settings.local_mode)
    );
    let keywords = try_parse!(query, args::json_arg(&query, "keywords"))
        .and_then(|value| value.as_array().cloned())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    let function = td::Function::SetStickerKeywords { sticker, keywords };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_sticker_mask_position(client: &mut Client, query: Query) {
    let sticker = try_parse!(
        query,
        args::required_input_file(&query, "sticker", client.settings.local_mode)
    );
    let mask_position = try_parse!(query, args::json_arg(&query, "mask_position"))
        .unwrap_or(Value::Null);
    let function = td::Function::SetStickerMaskPosition {
        sticker,
        mask_position,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_sticker_set_title(client: &mut Client, query: Query) {
    let name = try_parse!(query, args::required_string(&query, "name"));
    let title = try_parse!(query, args::required_string(&query, "title"));
    let function = td::Function::SetStickerSetTitle { name, title };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_sticker_set_thumbnail(client: &mut Client, query: Query) {
    let user_id = try_parse!(query, args::user_id(&query));
    let name = try_parse!(query, args::required_string(&query, "name"));
    let thumbnail = try_parse!(
        query,
        args::input_file(&query, "thumbnail", client.settings.local_mode)
    );
    let thumbnail = match thumbnail {
        Some(file) => Some(file),
        None => try_parse!(
            query,
            args::input_file(&query, "thumb", client.settings.local_mode)
        ),
    };
    let function = td::Function::SetStickerSetThumbnail {
        user_id,
        name,
        thumbnail,
        format: args::string(&query, "format"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_custom_emoji_sticker_set_thumbnail(client: &mut Client, query: Query) {
    let name = try_parse!(query, args::required_string(&query, "name"));
    let custom_emoji_id = args::integer(&query, "custom_emoji_id").unwrap_or(0);
    let function = td::Function::SetCustomEmojiStickerSetThumbnail {
        name,
        custom_emoji_id,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn delete_sticker_set(client: &mut Client, query: Query) {
    let name = try_parse!(query, args::required_string(&query, "name"));
    let function = td::Function::DeleteStickerSet { name };
    client.send_td_and_answer(query, function, super::object_to_value);
}
