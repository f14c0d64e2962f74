// Bot profile and defaults: commands, menu button, administrator rights,
// name and descriptions.

use crate::client::Client;
use crate::query::Query;
use crate::td;

use super::{args, try_parse};

fn command_scope(query: &Query) -> Result<serde_json::Value, crate::error::ApiError> {
    Ok(args::json_arg(query, "scope")?.unwrap_or(serde_json::json!({ "type": "default" })))
}

pub fn set_my_commands(client: &mut Client, query: Query) {
    let commands = try_parse!(query, args::required_json_arg(&query, "commands"));
    let scope = try_parse!(query, command_scope(&query));
    let function = td::Function::SetCommands {
        scope,
        language_code: args::string(&query, "language_code"),
        commands,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_my_commands(client: &mut Client, query: Query) {
    let scope = try_parse!(query, command_scope(&query));
    let function = td::Function::GetCommands {
        scope,
        language_code: args::string(&query, "language_code"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn delete_my_commands(client: &mut Client, query: Query) {
    let scope = try_parse!(query, command_scope(&query));
    let function = td::Function::DeleteCommands {
        scope,
        language_code: args::string(&query, "language_code"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_chat_menu_button(client: &mut Client, query: Query) {
    let menu_button = try_parse!(query, args::json_arg(&query, "menu_button"))
        .unwrap_or(serde_json::json!({ "type": "default" }));
    let function = td::Function::SetChatMenuButton {
        user_id: args::integer(&query, "chat_id").unwrap_or(0),
        menu_button,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_chat_menu_button(client: &mut Client, query: Query) {
    let function = td::Function::GetChatMenuButton {
        user_id: args::integer(&query, "chat_id").unwrap_or(0),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_my_default_administrator_rights(client: &mut Client, query: Query) {
    let rights = try_parse!(query, args::json_arg(&query, "rights"))
        .unwrap_or(serde_json::json!({}));
    let function = td::Function::SetDefaultAdministratorRights {
        for_channels: args::boolean(&query, "for_channels"),
        rights,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_my_default_administrator_rights(client: &mut Client, query: Query) {
    let function = td::Function::GetDefaultAdministratorRights {
        for_channels: args::boolean(&query, "for_channels"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_my_name(client: &mut Client, query: Query) {
    let function = td::Function::SetBotName {
        language_code: args::string(&query, "language_code"),
        name: args::string(&query, "name"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_my_name(client: &mut Client, query: Query) {
    let function = td::Function::GetBotName {
        language_code: args::string(&query, "language_code"),
    };
    client.send_td_and_answer(query, function, |client, object| match object {
        td::Object::Text(name) => Ok(serde_json::json!({ "name": name })),
        other => super::object_to_value(client, other),
    });
}

pub fn set_my_description(client: &mut Client, query: Query) {
    let function = td::Function::SetBotInfoDescription {
        language_code: args::string(&query, "language_code"),
        description: args::string(&query, "description"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_my_description(client: &mut Client, query: Query) {
    let function = td::Function::GetBotInfoDescription {
        language_code: args::string(&query, "language_code"),
    };
    client.send_td_and_answer(query, function, |client, object| match object {
        td::Object::Text(description) => {
            Ok(serde_json::json!({ "description": description }))
        }
        other => super::object_to_value(client, other),
    });
}

pub fn set_my_short_description(client: &mut Client, query: Query) {
    let function = td::Function::SetBotInfoShortDescription {
        language_code: args::string(&query, "language_code"),
        short_description: args::string(&query, "short_description"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_my_short_description(client: &mut Client, query: Query) {
    let function = td::Function::GetBotInfoShortDescription {
        language_code: args::string(&query, "language_code"),
    };
    client.send_td_and_answer(query, function, |client, object| match object {
        td::Object::Text(short_description) => {
            Ok(serde_json::json!({ "short_description": short_description }))
        }
        other => super::object_to_value(client, other),
    });
}
