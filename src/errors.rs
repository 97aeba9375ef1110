//! Errors surfaced by the repositories.
//!
//! Every store failure is wrapped with the operation and key it happened on.
//! A missing object is always reported as `NotFound`, whichever read path hit
//! it, so callers can branch on it without inspecting the backend error.

use crate::store::BackendError;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no object stored at `{key}` in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error("failed to {operation} `{key}`")]
    Storage {
        operation: &'static str,
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("failed to delete existing sessions while creating a new one")]
    SessionReplacement(#[source] Box<RepositoryError>),
    #[error("invalid drawing title `{title}`: {reason}")]
    InvalidTitle { title: String, reason: &'static str },
    #[error("content at `{key}` is not valid UTF-8")]
    Encoding {
        key: String,
        #[source]
        source: FromUtf8Error,
    },
    #[error("storage configuration: {0}")]
    Configuration(String),
    #[error("failed to generate a session id")]
    Randomness(#[source] rand::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    /// Attach operation/key context to a backend failure, lifting the
    /// backend's not-found signal into `RepositoryError::NotFound`.
    pub fn from_backend(operation: &'static str, key: &str, source: BackendError) -> Self {
        match source {
            BackendError::NotFound { bucket, .. } => Self::NotFound {
                bucket,
                key: key.to_string(),
            },
            source => Self::Storage {
                operation,
                key: key.to_string(),
                source,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
