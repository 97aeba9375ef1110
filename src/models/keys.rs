//! Object key layout.
//!
//! | entity       | key                       |
//! |--------------|---------------------------|
//! | drawing      | `drawing-content/{title}` |
//! | session      | `sessions/{hex-id}`       |
//! | credentials  | `credentials`             |
//! | client asset | `client{path}`            |
//!
//! Segments are not escaped. Titles are validated instead, see
//! [`validate_title`].

use super::session::SessionId;
use crate::errors::{RepositoryError, RepositoryResult};

pub const KEY_SEPARATOR: char = '/';

pub const DRAWING_CONTENT_PREFIX: &str = "drawing-content";
pub const SESSIONS_PREFIX: &str = "sessions";
pub const CREDENTIALS_KEY: &str = "credentials";
/// Client asset keys are `CLIENT_PREFIX` immediately followed by the
/// requested path, which carries its own leading separator.
pub const CLIENT_PREFIX: &str = "client";

/// Reject titles that cannot be stored as exactly one key segment.
pub fn validate_title(title: &str) -> RepositoryResult<()> {
    if title.is_empty() {
        return Err(RepositoryError::InvalidTitle {
            title: title.to_string(),
            reason: "must not be empty",
        });
    }
    if title.contains(KEY_SEPARATOR) {
        return Err(RepositoryError::InvalidTitle {
            title: title.to_string(),
            reason: "must not contain `/`",
        });
    }
    Ok(())
}

pub fn drawing_key(title: &str) -> String {
    format!("{DRAWING_CONTENT_PREFIX}{KEY_SEPARATOR}{title}")
}

pub fn session_key(id: &SessionId) -> String {
    format!("{SESSIONS_PREFIX}{KEY_SEPARATOR}{id}")
}

pub fn client_asset_key(path: &str) -> String {
    format!("{CLIENT_PREFIX}{path}")
}
