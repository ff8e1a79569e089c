//! `chats.list` handler.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{invalid_params, run_blocking, shape, HandlerContext};
use crate::server::RpcServer;

#[derive(Debug, Deserialize)]
struct ChatsListParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

pub(crate) fn register(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("chats.list", move |params: Value| {
        let context = context.clone();
        async move {
            let params: ChatsListParams =
                serde_json::from_value(params).map_err(invalid_params)?;

            run_blocking(move || {
                let chats = context.store.list_chats(params.limit)?;
                let mut shaped = Vec::with_capacity(chats.len());
                for chat in &chats {
                    let participants = context
                        .cache
                        .chat_info(chat.id)?
                        .map(|info| info.participants)
                        .unwrap_or_default();
                    shaped.push(shape::shape_chat(chat, &participants));
                }
                Ok(json!({ "chats": shaped }))
            })
            .await
        }
    });
}
