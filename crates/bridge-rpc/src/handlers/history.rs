//! `messages.history` handler.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{invalid_params, run_blocking, shape, HandlerContext};
use crate::error::HandlerError;
use crate::filter::MessageFilter;
use crate::server::RpcServer;

#[derive(Debug, Deserialize)]
struct HistoryParams {
    chat_id: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    participants: Option<Vec<String>>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    attachments: bool,
}

fn default_limit() -> i64 {
    50
}

pub(crate) fn register(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("messages.history", move |params: Value| {
        let context = context.clone();
        async move {
            let params: HistoryParams =
                serde_json::from_value(params).map_err(invalid_params)?;
            let filter = MessageFilter::new(
                params.participants,
                params.start.as_deref(),
                params.end.as_deref(),
            )?;

            run_blocking(move || {
                if context.cache.chat_info(params.chat_id)?.is_none() {
                    return Err(HandlerError::InvalidParams(format!(
                        "unknown chat_id {}",
                        params.chat_id
                    )));
                }

                let messages = context.store.messages_by_chat(params.chat_id, params.limit)?;
                let mut shaped = Vec::new();
                for message in messages.iter().filter(|message| filter.matches(message)) {
                    shaped.push(shape::shape_message(
                        &context.store,
                        &context.cache,
                        message,
                        params.attachments,
                    )?);
                }
                Ok(json!({ "messages": shaped }))
            })
            .await
        }
    });
}
