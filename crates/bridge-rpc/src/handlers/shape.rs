//! Wire shaping for chats and messages.

use bridge_database::{
    AttachmentMeta, ChatCache, ChatSummary, MessageRecord, MessageStore, ReactionRecord,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::error::HandlerError;

pub(crate) fn rfc3339(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn shape_chat(chat: &ChatSummary, participants: &[String]) -> Value {
    json!({
        "id": chat.id,
        "identifier": chat.identifier,
        "guid": chat.guid,
        "name": chat.name,
        "service": chat.service,
        "is_group": chat.is_group,
        "last_message_at": rfc3339(&chat.last_message_at),
        "participants": participants,
    })
}

/// Builds the wire shape for one message: the row itself, chat context from
/// the cache, and (only when requested) attachments and reactions together.
///
/// Blocking; call under `spawn_blocking`.
pub(crate) fn shape_message(
    store: &MessageStore,
    cache: &ChatCache,
    message: &MessageRecord,
    include_attachments: bool,
) -> Result<Value, HandlerError> {
    let chat = cache.chat_info(message.chat_id)?;

    let mut shaped = Map::new();
    shaped.insert("id".to_string(), json!(message.row_id));
    shaped.insert("chat_id".to_string(), json!(message.chat_id));
    shaped.insert("guid".to_string(), json!(message.guid));
    if let Some(reply_to) = &message.reply_to_guid {
        shaped.insert("reply_to_guid".to_string(), json!(reply_to));
    }
    shaped.insert("sender".to_string(), json!(message.sender));
    shaped.insert("is_from_me".to_string(), json!(message.is_from_me));
    shaped.insert("text".to_string(), json!(message.text));
    shaped.insert("service".to_string(), json!(message.service));
    shaped.insert("created_at".to_string(), json!(rfc3339(&message.created_at)));

    match &chat {
        Some(info) => {
            shaped.insert("chat_identifier".to_string(), json!(info.identifier));
            shaped.insert("chat_guid".to_string(), json!(info.guid));
            shaped.insert("chat_name".to_string(), json!(info.name));
            shaped.insert("participants".to_string(), json!(info.participants));
            shaped.insert("is_group".to_string(), json!(info.is_group));
        }
        None => {
            shaped.insert("chat_identifier".to_string(), json!(""));
            shaped.insert("chat_guid".to_string(), json!(""));
            shaped.insert("chat_name".to_string(), json!(""));
            shaped.insert("participants".to_string(), json!([]));
            shaped.insert("is_group".to_string(), json!(false));
        }
    }

    if include_attachments {
        let attachments: Vec<Value> = store
            .attachments_by_message(message.row_id)?
            .iter()
            .map(shape_attachment)
            .collect();
        let reactions: Vec<Value> = store
            .reactions_by_message(message.row_id)?
            .iter()
            .map(shape_reaction)
            .collect();
        shaped.insert("attachments".to_string(), Value::Array(attachments));
        shaped.insert("reactions".to_string(), Value::Array(reactions));
    }

    Ok(Value::Object(shaped))
}

fn shape_attachment(attachment: &AttachmentMeta) -> Value {
    json!({
        "filename": attachment.filename,
        "transfer_name": attachment.transfer_name,
        "uti": attachment.uti,
        "mime_type": attachment.mime_type,
        "total_bytes": attachment.total_bytes,
        "is_sticker": attachment.is_sticker,
        "path": attachment.path,
        "missing": attachment.missing,
    })
}

fn shape_reaction(reaction: &ReactionRecord) -> Value {
    json!({
        "id": reaction.row_id,
        "kind": reaction.kind.as_str(),
        "emoji": reaction.emoji,
        "sender": reaction.sender,
        "is_from_me": reaction.is_from_me,
        "created_at": rfc3339(&reaction.created_at),
    })
}
