// Inline queries, callback answers, payments, games, passport and custom
// requests.

use crate::client::Client;
use crate::error::ApiError;
use crate::query::Query;
use crate::td;

use super::{args, try_parse};

pub fn answer_inline_query(client: &mut Client, query: Query) {
    let inline_query_id = try_parse!(query, args::required_integer(&query, "inline_query_id"));
    let results = try_parse!(query, args::required_json_arg(&query, "results"));
    let button = try_parse!(query, args::json_arg(&query, "button"))
        .unwrap_or(serde_json::Value::Null);
    let function = td::Function::AnswerInlineQuery {
        inline_query_id,
        is_personal: args::boolean(&query, "is_personal"),
        button,
        results,
        cache_time: args::integer_in(&query, "cache_time", 300, 0, 3600) as i32,
        next_offset: args::string(&query, "next_offset"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn answer_web_app_query(client: &mut Client, query: Query) {
    let web_app_query_id = try_parse!(query, args::required_string(&query, "web_app_query_id"));
    let result = try_parse!(query, args::required_json_arg(&query, "result"));
    let function = td::Function::AnswerWebAppQuery {
        web_app_query_id,
        result,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn answer_callback_query(client: &mut Client, query: Query) {
    let callback_query_id =
        try_parse!(query, args::required_integer(&query, "callback_query_id"));
    let function = td::Function::AnswerCallbackQuery {
        callback_query_id,
        text: args::string(&query, "text"),
        show_alert: args::boolean(&query, "show_alert"),
        url: args::string(&query, "url"),
        cache_time: args::integer_in(&query, "cache_time", 0, 0, 86400) as i32,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn answer_shipping_query(client: &mut Client, query: Query) {
    let shipping_query_id =
        try_parse!(query, args::required_integer(&query, "shipping_query_id"));
    let ok = args::boolean(&query, "ok");
    let shipping_options = if ok {
        try_parse!(query, args::required_json_arg(&query, "shipping_options"))
    } else {
        serde_json::Value::Null
    };
    let error_message = if ok {
        String::new()
    } else {
        try_parse!(query, args::required_string(&query, "error_message"))
    };
    let function = td::Function::AnswerShippingQuery {
        shipping_query_id,
        shipping_options,
        error_message,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn answer_pre_checkout_query(client: &mut Client, query: Query) {
    let pre_checkout_query_id =
        try_parse!(query, args::required_integer(&query, "pre_checkout_query_id"));
    let ok = args::boolean(&query, "ok");
    let error_message = if ok {
        String::new()
    } else {
        try_parse!(query, args::required_string(&query, "error_message"))
    };
    let function = td::Function::AnswerPreCheckoutQuery {
        pre_checkout_query_id,
        error_message,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn create_invoice_link(client: &mut Client, query: Query) {
    let title = try_parse!(query, args::required_string(&query, "title"));
    let prices = try_parse!(query, args::required_json_arg(&query, "prices"));
    let mut invoice = serde_json::json!({
        "title": title,
        "description": args::string(&query, "description"),
        "payload": args::string(&query, "payload"),
        "provider_token": args::string(&query, "provider_token"),
        "currency": args::string(&query, "currency"),
        "prices": prices,
    });
    for extra in [
        "max_tip_amount",
        "suggested_tip_amounts",
        "provider_data",
        "photo_url",
        "subscription_period",
    ] {
        if let Some(value) = query.arg(extra) {
            invoice[extra] = serde_json::json!(value);
        }
    }
    let function = td::Function::CreateInvoiceLink { invoice };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_star_transactions(client: &mut Client, query: Query) {
    let function = td::Function::GetStarTransactions {
        offset: args::integer(&query, "offset").unwrap_or(0),
        limit: args::integer_in(&query, "limit", 100, 1, 100) as i32,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn refund_star_payment(client: &mut Client, query: Query) {
    let user_id = try_parse!(query, args::user_id(&query));
    let telegram_payment_charge_id = try_parse!(
        query,
        args::required_string(&query, "telegram_payment_charge_id")
    );
    let function = td::Function::RefundStarPayment {
        user_id,
        telegram_payment_charge_id,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

fn game_target(query: &Query) -> Result<(i64, i64, String), ApiError> {
    if let Some(inline_message_id) = query.arg("inline_message_id") {
        return Ok((0, 0, inline_message_id.to_string()));
    }
    let chat_id = args::chat_id(query)?;
    let message_id = args::message_id(query, "message_id")?;
    Ok((chat_id, message_id, String::new()))
}

pub fn set_game_score(client: &mut Client, query: Query) {
    let (chat_id, message_id, inline_message_id) = try_parse!(query, game_target(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let score = try_parse!(query, args::required_integer(&query, "score"));
    let function = td::Function::SetGameScore {
        chat_id,
        message_id,
        inline_message_id,
        user_id,
        score: score as i32,
        force: args::boolean(&query, "force"),
        edit_message: !args::boolean(&query, "disable_edit_message"),
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_game_high_scores(client: &mut Client, query: Query) {
    let (chat_id, message_id, inline_message_id) = try_parse!(query, game_target(&query));
    let user_id = try_parse!(query, args::user_id(&query));
    let function = td::Function::GetGameHighScores {
        chat_id,
        message_id,
        inline_message_id,
        user_id,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn set_passport_data_errors(client: &mut Client, query: Query) {
    let user_id = try_parse!(query, args::user_id(&query));
    let errors = try_parse!(query, args::required_json_arg(&query, "errors"));
    let function = td::Function::SetPassportElementErrors { user_id, errors };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn send_custom_request(client: &mut Client, query: Query) {
    let method = try_parse!(query, args::required_string(&query, "method"));
    let parameters = args::string(&query, "parameters");
    let function = td::Function::SendCustomRequest { method, parameters };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn answer_custom_query(client: &mut Client, query: Query) {
    let custom_query_id = try_parse!(query, args::required_integer(&query, "custom_query_id"));
    let data = args::string(&query, "data");
    let function = td::Function::AnswerCustomQuery {
        custom_query_id,
        data,
    };
    client.send_td_and_answer(query, function, super::object_to_value);
}

pub fn get_business_connection(client: &mut Client, query: Query) {
    let connection_id = try_parse!(
        query,
        args::required_string(&query, "business_connection_id")
    );
    // Serve from the cache when the connection is already known.
    if let Some(connection) = client.business_connections.get(&connection_id) {
        let body = crate::render::business_connection_json(connection);
        let mut query = query;
        query.answer_ok(body);
        return;
    }
    let function = td::Function::GetBusinessConnection { connection_id };
    client.send_td_and_answer(query, function, |client, object| match object {
        td::Object::BusinessConnection(connection) => {
            client
                .business_connections
                .insert(connection.id.clone(), connection.clone());
            Ok(crate::render::business_connection_json(&connection))
        }
        other => super::object_to_value(client, other),
    });
}
