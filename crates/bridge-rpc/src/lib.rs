//! Line-delimited JSON-RPC 2.0 server for the Messages bridge.
//!
//! One JSON object per newline-terminated frame, in both directions. The
//! server multiplexes request/response traffic with `message` notifications
//! produced by per-subscription watcher workers; a shared [`FrameWriter`]
//! keeps outbound frames atomic.
//!
//! # Design Principles
//!
//! - The reader task never blocks on a handler; each request runs on its
//!   own task
//! - A malformed line gets a `-32700` reply and the session continues
//! - Subscription workers own their watcher and die silently on
//!   cancellation, loudly (one `error` notification) on failure

pub mod protocol;

mod error;
mod filter;
mod handlers;
mod outbound;
mod server;
mod subscriptions;

pub use error::{HandlerError, RpcError, RpcResult};
pub use filter::MessageFilter;
pub use handlers::{register_handlers, HandlerContext};
pub use outbound::{
    ContactMatch, ContactsError, ContactsProvider, MessageSender, ReactionInput,
    ReactionOptions, ResolvedHandle, SendError, SendOptions, ServiceKind,
};
pub use server::{FrameWriter, RpcServer};
pub use subscriptions::SubscriptionManager;
