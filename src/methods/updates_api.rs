// The local methods: identity, lifecycle and update delivery. None of these
// load the native client with new work, so they bypass flood admission.

use crate::client::Client;
use crate::query::Query;
use crate::td;

pub fn get_me(client: &mut Client, query: Query) {
    if client.users.contains_key(&client.bot_user_id) {
        let body = crate::render::bot_user_json(client, client.bot_user_id);
        let mut query = query;
        query.answer_ok(body);
        return;
    }
    client.send_td_and_answer(query, td::Function::GetMe, |client, object| match object {
        td::Object::User(user) => {
            client.on_user_update(&user);
            Ok(crate::render::bot_user_json(client, user.id))
        }
        other => super::object_to_value(client, other),
    });
}

pub fn close(client: &mut Client, query: Query) {
    let mut query = query;
    query.answer_ok(serde_json::Value::Bool(true));
    client.close_client(false);
}

pub fn log_out(client: &mut Client, query: Query) {
    let mut query = query;
    query.answer_ok(serde_json::Value::Bool(true));
    client.log_out(true);
}

pub fn get_updates(client: &mut Client, query: Query) {
    client.get_updates(query);
}

pub fn set_webhook(client: &mut Client, query: Query) {
    client.set_webhook(query, false);
}

pub fn delete_webhook(client: &mut Client, query: Query) {
    client.set_webhook(query, true);
}

pub fn get_webhook_info(client: &mut Client, query: Query) {
    let body = client.webhook_info_json();
    let mut query = query;
    query.answer_ok(body);
}
