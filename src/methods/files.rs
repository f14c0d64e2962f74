// getFile: resolve the remote id, answer immediately for already-downloaded
// files, otherwise start a download and park the query as a listener.

use crate::client::Client;
use crate::error::ApiError;
use crate::query::Query;
use crate::td;

use super::{args, try_parse};

/// Non-local mode refuses downloads above this size.
const MAX_DOWNLOAD_SIZE: i64 = 20 << 20;

pub fn get_file(client: &mut Client, query: Query) {
    let remote_file_id = try_parse!(query, args::required_string(&query, "file_id"));
    let mut query = query;
    client.send_td(
        td::Function::GetRemoteFile { remote_file_id },
        Box::new(move |client, result| {
            let file = match result {
                Ok(td::Object::File(file)) => file,
                Ok(_) => {
                    query.answer_error(&ApiError::bad_request("invalid file_id"));
                    return;
                }
                Err(error) => {
                    // A malformed id surfaces as a parse failure downstream.
                    let error = if error.code == 400 {
                        ApiError::bad_request("invalid file_id")
                    } else {
                        crate::error::from_td_error(error.code, &error.message)
                    };
                    query.answer_error(&error);
                    return;
                }
            };

            let size = if file.size > 0 { file.size } else { file.expected_size };
            if !client.settings.local_mode && size > MAX_DOWNLOAD_SIZE {
                query.answer_error(&ApiError::bad_request("file is too big"));
                return;
            }

            if file.is_downloading_completed && !file.local_path.is_empty() {
                let body =
                    crate::render::file_json(&client.settings, client.bot_user_id, &file);
                query.answer_ok(body);
                return;
            }

            let file_id = file.id;
            client
                .file_download_listeners
                .entry(file_id)
                .or_default()
                .push(query);
            client.send_td(
                td::Function::DownloadFile {
                    file_id,
                    priority: 1,
                },
                Box::new(move |client, result| match result {
                    Ok(td::Object::File(file)) if file.is_downloading_completed => {
                        client.on_file_update(file);
                    }
                    Err(error) => {
                        let error = crate::error::from_td_error(error.code, &error.message);
                        if let Some(listeners) =
                            client.file_download_listeners.remove(&file_id)
                        {
                            for mut listener in listeners {
                                listener.answer_error(&error);
                            }
                        }
                    }
                    // Still downloading; the file update completes the query.
                    Ok(_) => {}
                }),
            );
        }),
    );
}
