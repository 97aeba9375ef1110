//! src/services/drawing_repository.rs
//!
//! DrawingRepository: named drawing documents stored one object per title
//! under `drawing-content/` in the bound bucket.

use crate::{
    errors::{RepositoryError, RepositoryResult},
    models::keys::{self, DRAWING_CONTENT_PREFIX},
    services::key_listing::list_keys,
    store::{ObjectStore, S3ObjectStore, S3Settings},
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bucket used when the caller does not name one.
pub const DEFAULT_DRAWING_BUCKET: &str = "drawing-store";

/// DrawingRepository provides:
/// - Put a drawing (full overwrite, no versioning)
/// - Get a drawing's content by title
/// - List every stored title
#[derive(Clone)]
pub struct DrawingRepository {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl DrawingRepository {
    /// Bind to `store`, using `bucket` or `DEFAULT_DRAWING_BUCKET` when it is
    /// absent or empty.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: Option<&str>) -> Self {
        let bucket = bucket
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DRAWING_BUCKET)
            .to_string();
        Self { store, bucket }
    }

    /// Build an S3-backed repository from the ambient AWS configuration.
    pub async fn connect(settings: &S3Settings, bucket: Option<&str>) -> RepositoryResult<Self> {
        let store = S3ObjectStore::connect(settings).await?;
        Ok(Self::new(Arc::new(store), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store `content` as the drawing called `title`, replacing any previous
    /// content.
    ///
    /// `modified_by` is accepted for auditing but not persisted yet.
    pub async fn put(
        &self,
        title: &str,
        content: Bytes,
        modified_by: &str,
    ) -> RepositoryResult<()> {
        keys::validate_title(title)?;
        let key = keys::drawing_key(title);
        debug!(bucket = %self.bucket, %key, modified_by, size = content.len(), "put drawing");

        self.store
            .put_object(&self.bucket, &key, content)
            .await
            .map_err(|err| RepositoryError::from_backend("put drawing", &key, err))
    }

    /// Full content of the drawing called `title`.
    pub async fn get(&self, title: &str) -> RepositoryResult<Bytes> {
        keys::validate_title(title)?;
        let key = keys::drawing_key(title);
        debug!(bucket = %self.bucket, %key, "get drawing");

        self.store
            .get_object(&self.bucket, &key)
            .await
            .map_err(|err| RepositoryError::from_backend("get drawing", &key, err))
    }

    /// Every stored title, in the order the store lists them.
    ///
    /// Keys nested deeper than one segment (written by something other than
    /// `put`) are skipped, since `get` could never read them back.
    pub async fn list_titles(&self) -> RepositoryResult<Vec<String>> {
        let names =
            list_keys(self.store.as_ref(), &self.bucket, DRAWING_CONTENT_PREFIX, true).await?;
        Ok(names
            .into_iter()
            .filter(|name| match keys::validate_title(name) {
                Ok(()) => true,
                Err(err) => {
                    warn!(bucket = %self.bucket, error = %err, "skipping unreadable drawing key");
                    false
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObjectStore;
    use rstest::rstest;

    fn repository() -> (MemoryObjectStore, DrawingRepository) {
        let store = MemoryObjectStore::new();
        let repo = DrawingRepository::new(Arc::new(store.clone()), Some("test-drawings"));
        (store, repo)
    }

    #[tokio::test]
    async fn put_then_get_returns_exact_bytes() {
        let (_, repo) = repository();
        let content = Bytes::from_static(b"{\"elements\":[]}\n\x00\xff");

        repo.put("sketch", content.clone(), "alice").await.unwrap();

        assert_eq!(repo.get("sketch").await.unwrap(), content);
    }

    #[tokio::test]
    async fn put_writes_under_the_drawing_prefix() {
        let (store, repo) = repository();

        repo.put("some title", Bytes::from_static(b"c"), "bob")
            .await
            .unwrap();

        assert_eq!(
            store.keys("test-drawings").await,
            vec!["drawing-content/some title"]
        );
    }

    #[tokio::test]
    async fn overwriting_replaces_content_without_duplicating_title() {
        let (_, repo) = repository();

        repo.put("t", Bytes::from_static(b"first"), "u").await.unwrap();
        repo.put("t", Bytes::from_static(b"second"), "u").await.unwrap();

        assert_eq!(repo.list_titles().await.unwrap(), vec!["t"]);
        assert_eq!(repo.get("t").await.unwrap(), Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn missing_drawing_is_not_found() {
        let (_, repo) = repository();

        let err = repo.get("absent").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn nested_keys_are_not_listed_as_titles() {
        let (store, repo) = repository();
        store
            .put_object("test-drawings", "drawing-content/a/b", Bytes::from_static(b"x"))
            .await
            .unwrap();
        repo.put("plain", Bytes::from_static(b"y"), "u").await.unwrap();

        let titles = repo.list_titles().await.unwrap();

        assert_eq!(titles, vec!["plain"]);
        for title in &titles {
            assert!(repo.get(title).await.is_ok());
        }
    }

    #[rstest]
    #[case("")]
    #[case("folder/title")]
    #[tokio::test]
    async fn invalid_titles_never_reach_the_store(#[case] title: &str) {
        let (store, repo) = repository();

        let err = repo
            .put(title, Bytes::from_static(b"c"), "u")
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::InvalidTitle { .. }));
        assert!(store.keys("test-drawings").await.is_empty());
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn falls_back_to_default_bucket(#[case] bucket: Option<&str>) {
        let repo = DrawingRepository::new(Arc::new(MemoryObjectStore::new()), bucket);
        assert_eq!(repo.bucket(), DEFAULT_DRAWING_BUCKET);
    }
}
