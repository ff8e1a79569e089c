//! `send` and `reactions.send` handlers.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{invalid_params, run_blocking, HandlerContext};
use crate::error::HandlerError;
use crate::outbound::{ReactionInput, ReactionOptions, SendError, SendOptions, ServiceKind};
use crate::server::RpcServer;

#[derive(Debug, Deserialize)]
struct SendParams {
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    chat_id: Option<i64>,
    #[serde(default)]
    chat_identifier: Option<String>,
    #[serde(default)]
    chat_guid: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default = "default_service")]
    service: String,
    #[serde(default = "default_region")]
    region: String,
}

fn default_service() -> String {
    "auto".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

#[derive(Debug, Deserialize)]
struct ReactionParams {
    guid: String,
    reaction: String,
    #[serde(default)]
    chat_id: Option<i64>,
    #[serde(default)]
    chat_identifier: Option<String>,
    #[serde(default)]
    chat_guid: Option<String>,
}

pub(crate) fn register(server: &mut RpcServer, context: HandlerContext) {
    register_send(server, context.clone());
    register_reactions_send(server, context);
}

fn register_send(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("send", move |params: Value| {
        let context = context.clone();
        async move {
            let params: SendParams = serde_json::from_value(params).map_err(invalid_params)?;

            let service = ServiceKind::parse(&params.service).ok_or_else(|| {
                HandlerError::InvalidParams(format!(
                    "unknown service {:?}; expected auto, imessage, or sms",
                    params.service
                ))
            })?;

            let text = params.text.unwrap_or_default();
            let file = params.file.filter(|file| !file.is_empty());
            if text.is_empty() && file.is_none() {
                return Err(HandlerError::InvalidParams(
                    "either text or file is required".to_string(),
                ));
            }

            let to = params.to.filter(|to| !to.is_empty());
            let chat_identifier = params.chat_identifier.filter(|value| !value.is_empty());
            let chat_guid = params.chat_guid.filter(|value| !value.is_empty());
            let has_chat_target =
                params.chat_id.is_some() || chat_identifier.is_some() || chat_guid.is_some();
            if to.is_some() && has_chat_target {
                return Err(HandlerError::InvalidParams(
                    "provide either to or a chat target, not both".to_string(),
                ));
            }
            if to.is_none() && !has_chat_target {
                return Err(HandlerError::InvalidParams(
                    "a recipient is required: to, chat_id, chat_identifier, or chat_guid"
                        .to_string(),
                ));
            }

            run_blocking(move || {
                let (chat_identifier, chat_guid) = match params.chat_id {
                    Some(chat_id) => {
                        let info = context.cache.chat_info(chat_id)?.ok_or_else(|| {
                            HandlerError::InvalidParams(format!("unknown chat_id {chat_id}"))
                        })?;
                        (
                            Some(info.identifier),
                            if info.guid.is_empty() {
                                None
                            } else {
                                Some(info.guid)
                            },
                        )
                    }
                    None => (chat_identifier, chat_guid),
                };

                let options = SendOptions {
                    to,
                    chat_identifier,
                    chat_guid,
                    text,
                    file,
                    service,
                    region: params.region,
                };
                dispatch_send(|| context.sender.send(&options))
            })
            .await
        }
    });
}

fn register_reactions_send(server: &mut RpcServer, context: HandlerContext) {
    server.register_handler("reactions.send", move |params: Value| {
        let context = context.clone();
        async move {
            let params: ReactionParams =
                serde_json::from_value(params).map_err(invalid_params)?;

            if params.guid.is_empty() {
                return Err(HandlerError::InvalidParams("guid is required".to_string()));
            }
            let reaction = ReactionInput::parse(&params.reaction).ok_or_else(|| {
                HandlerError::InvalidParams("reaction is required".to_string())
            })?;

            run_blocking(move || {
                let chat_identifier = params.chat_identifier.filter(|value| !value.is_empty());
                let chat_guid = params.chat_guid.filter(|value| !value.is_empty());

                let (chat_identifier, chat_guid, message_preview) = match params.chat_id {
                    Some(chat_id) => {
                        let info = context.cache.chat_info(chat_id)?.ok_or_else(|| {
                            HandlerError::InvalidParams(format!("unknown chat_id {chat_id}"))
                        })?;
                        (
                            Some(info.identifier),
                            if info.guid.is_empty() {
                                None
                            } else {
                                Some(info.guid)
                            },
                            None,
                        )
                    }
                    None if chat_identifier.is_none() && chat_guid.is_none() => {
                        // No chat target given: resolve it from the message
                        // itself.
                        let message =
                            context.store.message_by_guid(&params.guid)?.ok_or_else(|| {
                                HandlerError::InvalidParams(format!(
                                    "unknown message guid {:?}",
                                    params.guid
                                ))
                            })?;
                        let info = context.cache.chat_info(message.chat_id)?.ok_or_else(|| {
                            HandlerError::InvalidParams(format!(
                                "message {:?} has no resolvable chat",
                                params.guid
                            ))
                        })?;
                        (
                            Some(info.identifier),
                            if info.guid.is_empty() {
                                None
                            } else {
                                Some(info.guid)
                            },
                            Some(message.text),
                        )
                    }
                    None => (chat_identifier, chat_guid, None),
                };

                let options = ReactionOptions {
                    message_guid: params.guid,
                    reaction,
                    chat_identifier,
                    chat_guid,
                    message_preview,
                };
                dispatch_send(|| context.sender.send_reaction(&options))
            })
            .await
        }
    });
}

/// Maps collaborator failures onto JSON-RPC codes: semantic input problems
/// become invalid-params, automation failures internal.
fn dispatch_send<F>(send: F) -> Result<Value, HandlerError>
where
    F: FnOnce() -> Result<(), SendError>,
{
    match send() {
        Ok(()) => Ok(json!({ "ok": true })),
        Err(SendError::InvalidTarget(message)) => Err(HandlerError::InvalidParams(message)),
        Err(err) => Err(HandlerError::Internal(err.to_string())),
    }
}
