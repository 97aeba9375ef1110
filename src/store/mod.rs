//! The object-storage capability the repositories are written against.
//!
//! Repositories never talk to S3 directly; they hold an `Arc<dyn ObjectStore>`
//! and a bucket name. `S3ObjectStore` is the production binding and
//! `MemoryObjectStore` is the in-process one used by tests.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error as StdError;
use thiserror::Error;

pub use memory::MemoryObjectStore;
pub use s3::{S3ObjectStore, S3Settings};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },
    #[error("store rejected deletion of `{key}`: {reason}")]
    DeleteRejected { key: String, reason: String },
    #[error("{message}")]
    Service {
        message: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl BackendError {
    /// Wrap an arbitrary transport or SDK failure.
    pub fn service<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Service {
            message: err.to_string(),
            source: Box::new(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// One page of a prefix listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObjectPage {
    /// Full object keys, in the order the store returned them.
    pub keys: Vec<String>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_continuation_token: Option<String>,
}

/// Put / get / paginated list / batch delete against a bucket.
///
/// Implementations must be cancel-safe in the sense that dropping a returned
/// future abandons the underlying request.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Write `body` at `key`, replacing whatever was there.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> BackendResult<()>;

    /// Read the full body at `key`. Absent objects yield `BackendError::NotFound`.
    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes>;

    /// Fetch one page of keys starting with `prefix`.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> BackendResult<ObjectPage>;

    /// Remove every key in `keys` in one logical batch request.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BackendResult<()>;
}
