//! File system paths for the bridge.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Returns the default location of chat.db for the current user
/// (`~/Library/Messages/chat.db`).
pub fn default_chat_db_path() -> CoreResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CoreError::Path("could not determine home directory".to_string()))?;
    Ok(home.join("Library").join("Messages").join("chat.db"))
}

/// Expands a leading tilde against the home directory.
///
/// Attachment paths in the Messages database are stored tilde-prefixed.
/// Paths without a leading tilde are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            if rest.is_empty() {
                return home;
            }
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
