//! Per-process chat metadata cache.
//!
//! Chat identifier/guid/name/service and participant lists change rarely and
//! the bridge restarts whenever a client reconnects, so entries are
//! populated lazily on first miss and never evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::models::ChatInfo;
use crate::store::MessageStore;
use crate::DatabaseResult;

/// Memoised chat lookups keyed by chat row id.
///
/// Reads are copy-out: callers get owned [`ChatInfo`] values, never
/// references into the map. The lock only guards map access, not the
/// database round-trip that fills a miss.
pub struct ChatCache {
    store: Arc<MessageStore>,
    entries: Mutex<HashMap<i64, ChatInfo>>,
}

impl ChatCache {
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self {
            store,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Chat metadata plus participants, or `None` for an unknown chat id.
    pub fn chat_info(&self, chat_id: i64) -> DatabaseResult<Option<ChatInfo>> {
        {
            let entries = self.entries.lock().expect("chat cache mutex poisoned");
            if let Some(info) = entries.get(&chat_id) {
                return Ok(Some(info.clone()));
            }
        }

        let Some(row) = self.store.chat_row(chat_id)? else {
            return Ok(None);
        };
        let participants = self.store.participants(chat_id)?;
        let info = ChatInfo {
            id: chat_id,
            identifier: row.identifier,
            guid: row.guid,
            name: row.name,
            service: row.service,
            is_group: row.is_group,
            participants,
        };
        debug!(chat_id, identifier = %info.identifier, "chat cache miss filled");

        let mut entries = self.entries.lock().expect("chat cache mutex poisoned");
        entries.entry(chat_id).or_insert_with(|| info.clone());
        Ok(Some(info))
    }

    /// Number of cached chats; used by tests.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("chat cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
