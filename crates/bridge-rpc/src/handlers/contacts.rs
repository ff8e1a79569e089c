//! `contacts.search` and `contacts.resolve` handlers.
//!
//! An unauthorized contact store is not an error: both methods degrade to
//! an empty result carrying a `warning` so clients can keep working with
//! raw handles.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{invalid_params, run_blocking, HandlerContext};
use crate::error::HandlerError;
use crate::outbound::ContactsError;
use crate::server::RpcServer;

const UNAVAILABLE_WARNING: &str = "contacts_unavailable";

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
struct ResolveParams {
    handles: Vec<String>,
}

pub(crate) fn register(server: &mut RpcServer, context: HandlerContext) {
    register_search(server, context.clone());
    register_resolve(server, context);
}

fn register_search(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("contacts.search", move |params: Value| {
        let context = context.clone();
        async move {
            let params: SearchParams = serde_json::from_value(params).map_err(invalid_params)?;
            if params.query.is_empty() {
                return Err(HandlerError::InvalidParams("query is required".to_string()));
            }
            let limit = params.limit.max(1) as usize;

            run_blocking(move || match context.contacts.search(&params.query, limit) {
                Ok(matches) => Ok(json!({ "matches": matches })),
                Err(ContactsError::Unauthorized) => {
                    Ok(json!({ "matches": [], "warning": UNAVAILABLE_WARNING }))
                }
                Err(err) => Err(HandlerError::Internal(err.to_string())),
            })
            .await
        }
    });
}

fn register_resolve(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("contacts.resolve", move |params: Value| {
        let context = context.clone();
        async move {
            let params: ResolveParams = serde_json::from_value(params).map_err(invalid_params)?;
            if params.handles.is_empty() {
                return Err(HandlerError::InvalidParams(
                    "handles must be a non-empty list".to_string(),
                ));
            }

            run_blocking(move || match context.contacts.resolve(&params.handles) {
                Ok(contacts) => Ok(json!({ "contacts": contacts })),
                Err(ContactsError::Unauthorized) => {
                    Ok(json!({ "contacts": [], "warning": UNAVAILABLE_WARNING }))
                }
                Err(err) => Err(HandlerError::Internal(err.to_string())),
            })
            .await
        }
    });
}
