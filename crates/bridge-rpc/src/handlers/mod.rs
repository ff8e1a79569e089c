//! RPC method handlers.
//!
//! Each module registers its methods on the server with closures cloning a
//! shared [`HandlerContext`]. Database and collaborator calls are blocking
//! and run under `spawn_blocking`.

mod chats;
mod contacts;
mod history;
mod send;
mod shape;
mod watch;

use std::sync::Arc;

use bridge_database::{ChatCache, MessageStore, WatcherConfig};

use crate::error::HandlerError;
use crate::outbound::{ContactsProvider, MessageSender};
use crate::server::{FrameWriter, RpcServer};
use crate::subscriptions::SubscriptionManager;

/// Shared state handed to every handler registration.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<MessageStore>,
    pub cache: Arc<ChatCache>,
    pub sender: Arc<dyn MessageSender>,
    pub contacts: Arc<dyn ContactsProvider>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub writer: FrameWriter,
    pub watcher_config: WatcherConfig,
}

/// Registers every bridge method on the server.
pub fn register_handlers(server: &mut RpcServer, context: HandlerContext) {
    chats::register(server, context.clone());
    history::register(server, context.clone());
    watch::register(server, context.clone());
    send::register(server, context.clone());
    contacts::register(server, context);
}

/// Runs blocking store/collaborator work off the async threads.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, HandlerError>
where
    F: FnOnce() -> Result<T, HandlerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| HandlerError::Internal(format!("blocking task failed: {err}")))?
}

/// Maps a serde params-decoding failure to invalid-params.
pub(crate) fn invalid_params(err: serde_json::Error) -> HandlerError {
    HandlerError::InvalidParams(format!("invalid params: {err}"))
}
