//! Shared plumbing for the iMessage bridge.
//!
//! Everything here is ambient: filesystem paths and logging setup. The
//! interesting parts of the bridge live in `bridge-database` (the read-only
//! Messages store) and `bridge-rpc` (the JSON-RPC server).

mod error;
mod logging;
mod paths;

pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::{default_chat_db_path, expand_tilde};
