//! Read-only access to the macOS Messages SQLite store.
//!
//! The database is owned and mutated by Messages.app; this crate only ever
//! reads it. New rows are discovered by polling with a row-id watermark
//! ([`MessageWatcher`]) because SQLite exposes no portable change feed.
//!
//! # Design Principles
//!
//! - The store never writes; Messages.app is the only writer
//! - Timestamps leave this crate as `DateTime<Utc>`, never raw Apple-epoch
//!   nanoseconds
//! - Schema drift (missing columns on older macOS releases) is probed once
//!   at open and projected away in SQL

mod cache;
mod decode;
mod error;
mod models;
mod pool;
mod store;
mod watcher;

pub use cache::ChatCache;
pub use decode::{apple_time, parse_stream_typed, APPLE_EPOCH_OFFSET};
pub use error::{DatabaseError, DatabaseResult};
pub use models::{
    AttachmentMeta, ChatInfo, ChatSummary, MessageRecord, ReactionRecord, TapbackKind,
};
pub use pool::{DatabasePool, PoolConfig};
pub use store::MessageStore;
pub use watcher::{MessageWatcher, WatcherConfig};
