//! Polling watcher for newly appended messages.
//!
//! The Messages database exposes no trigger API, so new rows are discovered
//! by polling `messages_after` with a row-id watermark. The cadence starts
//! at `initial_interval` for freshness and backs off exponentially to
//! `max_interval` while the watched chats are quiet, trading latency for
//! CPU.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::models::MessageRecord;
use crate::store::MessageStore;
use crate::{DatabaseError, DatabaseResult};

/// Poll cadence and batch sizing for a watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Delay before the first re-poll after activity.
    pub initial_interval: Duration,
    /// Backoff ceiling while idle.
    pub max_interval: Duration,
    /// Maximum rows fetched per poll.
    pub batch_size: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            batch_size: 200,
        }
    }
}

/// A single-consumer stream of messages appended after a watermark.
///
/// The watermark is the highest row id already handed out; no row at or
/// below it is ever returned again, and batches arrive in ascending row-id
/// order.
pub struct MessageWatcher {
    store: Arc<MessageStore>,
    config: WatcherConfig,
    chat_filter: i64,
    watermark: i64,
    interval: Duration,
}

impl MessageWatcher {
    /// Creates a watcher. `chat_filter` of 0 watches every chat.
    ///
    /// The watermark starts at `since_rowid` when supplied, otherwise at the
    /// current highest row id so only rows appended after this call are
    /// emitted.
    pub fn new(
        store: Arc<MessageStore>,
        config: WatcherConfig,
        chat_filter: i64,
        since_rowid: Option<i64>,
    ) -> DatabaseResult<Self> {
        let watermark = match since_rowid {
            Some(rowid) => rowid,
            None => store.max_row_id()?,
        };
        let interval = config.initial_interval;
        Ok(Self {
            store,
            config,
            chat_filter,
            watermark,
            interval,
        })
    }

    /// The highest row id already handed out.
    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    /// Waits for the next non-empty batch, ascending by row id.
    ///
    /// A non-empty poll advances the watermark, resets the backoff, and
    /// returns at once so a backlog larger than one batch drains without
    /// waiting. An empty poll sleeps the current interval and doubles it up
    /// to the ceiling. Cancel-safe: the watermark only advances after a
    /// batch has been produced, so dropping the future mid-poll loses
    /// nothing.
    pub async fn next_batch(&mut self) -> DatabaseResult<Vec<MessageRecord>> {
        loop {
            let store = Arc::clone(&self.store);
            let (after, chat, limit) = (self.watermark, self.chat_filter, self.config.batch_size);
            let rows = tokio::task::spawn_blocking(move || {
                store.messages_after(after, chat, limit)
            })
            .await
            .map_err(|err| DatabaseError::Task(err.to_string()))??;

            if let Some(last) = rows.last() {
                trace!(
                    rows = rows.len(),
                    watermark = last.row_id,
                    "watcher poll returned rows"
                );
                self.watermark = last.row_id;
                self.interval = self.config.initial_interval;
                return Ok(rows);
            }

            tokio::time::sleep(self.interval).await;
            self.interval = self
                .interval
                .saturating_mul(2)
                .min(self.config.max_interval);
        }
    }
}
