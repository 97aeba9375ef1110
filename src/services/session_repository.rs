//! src/services/session_repository.rs
//!
//! SessionRepository: the single active session token, plus the read-only
//! credentials blob and client assets that live in the same bucket.
//!
//! Replacing a session is delete-all-then-write and therefore not atomic.
//! Calls through one repository (and its clones) are serialized; separate
//! processes sharing a bucket can still race and leave zero or two sessions.

use crate::{
    errors::{RepositoryError, RepositoryResult},
    models::{
        keys::{self, CREDENTIALS_KEY, SESSIONS_PREFIX},
        session::SessionId,
    },
    services::key_listing::list_keys,
    store::{ObjectStore, S3ObjectStore, S3Settings},
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Bucket used when the caller does not name one.
pub const DEFAULT_SESSION_BUCKET: &str = "drawing-store";

/// Body written for every session object.
const SESSION_PLACEHOLDER: &[u8] = b"empty";

#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    create_lock: Arc<Mutex<()>>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: Option<&str>) -> Self {
        let bucket = bucket
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SESSION_BUCKET)
            .to_string();
        Self {
            store,
            bucket,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn connect(settings: &S3Settings, bucket: Option<&str>) -> RepositoryResult<Self> {
        let store = S3ObjectStore::connect(settings).await?;
        Ok(Self::new(Arc::new(store), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The externally provisioned credentials blob, verbatim.
    pub async fn get_allowed_credentials(&self) -> RepositoryResult<String> {
        let body = self
            .store
            .get_object(&self.bucket, CREDENTIALS_KEY)
            .await
            .map_err(|err| {
                RepositoryError::from_backend("get credentials", CREDENTIALS_KEY, err)
            })?;

        String::from_utf8(body.to_vec()).map_err(|source| RepositoryError::Encoding {
            key: CREDENTIALS_KEY.to_string(),
            source,
        })
    }

    /// Replace whatever sessions exist with a single new one and return its id.
    ///
    /// If clearing the old sessions fails nothing is written. A failure after
    /// the clear leaves no session at all.
    pub async fn create_session(&self) -> RepositoryResult<SessionId> {
        let _guard = self.create_lock.lock().await;

        if let Err(err) = self.delete_all_sessions().await {
            warn!(bucket = %self.bucket, error = %err, "could not clear existing sessions");
            return Err(RepositoryError::SessionReplacement(Box::new(err)));
        }

        let id = SessionId::generate().map_err(RepositoryError::Randomness)?;
        let key = keys::session_key(&id);
        self.store
            .put_object(&self.bucket, &key, Bytes::from_static(SESSION_PLACEHOLDER))
            .await
            .map_err(|err| RepositoryError::from_backend("put session", &key, err))?;

        info!(bucket = %self.bucket, session = %id, "created session");
        Ok(id)
    }

    /// Ids of the stored sessions, in store order.
    pub async fn list_sessions(&self) -> RepositoryResult<Vec<String>> {
        list_keys(self.store.as_ref(), &self.bucket, SESSIONS_PREFIX, true).await
    }

    /// Static client content at `client{path}`. `path` is expected to start
    /// with `/`.
    pub async fn serve_client_code(&self, path: &str) -> RepositoryResult<Bytes> {
        let key = keys::client_asset_key(path);
        debug!(bucket = %self.bucket, %key, "serving client code");

        let body = self
            .store
            .get_object(&self.bucket, &key)
            .await
            .map_err(|err| RepositoryError::from_backend("get client code", &key, err))?;

        debug!(%key, size = body.len(), "served client code");
        Ok(body)
    }

    async fn delete_all_sessions(&self) -> RepositoryResult<()> {
        let keys = list_keys(self.store.as_ref(), &self.bucket, SESSIONS_PREFIX, false).await?;
        if keys.is_empty() {
            return Ok(());
        }

        debug!(bucket = %self.bucket, count = keys.len(), "deleting sessions");
        self.store
            .delete_objects(&self.bucket, &keys)
            .await
            .map_err(|err| {
                RepositoryError::from_backend("delete sessions", SESSIONS_PREFIX, err)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObjectStore;

    const BUCKET: &str = "test-sessions";

    fn repository() -> (MemoryObjectStore, SessionRepository) {
        let store = MemoryObjectStore::new();
        let repo = SessionRepository::new(Arc::new(store.clone()), Some(BUCKET));
        (store, repo)
    }

    #[tokio::test]
    async fn only_the_latest_session_survives() {
        let (_, repo) = repository();

        let mut latest = None;
        for _ in 0..3 {
            latest = Some(repo.create_session().await.unwrap());
        }

        let sessions = repo.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(latest.unwrap(), sessions[0]);
    }

    #[tokio::test]
    async fn session_object_holds_the_placeholder() {
        let (store, repo) = repository();

        let id = repo.create_session().await.unwrap();

        let body = store
            .get_object(BUCKET, &format!("sessions/{id}"))
            .await
            .unwrap();
        assert_eq!(body, Bytes::from_static(b"empty"));
    }

    #[tokio::test]
    async fn clearing_no_sessions_sends_no_batch_delete() {
        let (store, repo) = repository();

        repo.delete_all_sessions().await.unwrap();

        assert_eq!(store.batch_delete_calls(), 0);
    }

    #[tokio::test]
    async fn replacing_a_session_uses_one_batch_delete() {
        let (store, repo) = repository();

        repo.create_session().await.unwrap();
        assert_eq!(store.batch_delete_calls(), 0);
        repo.create_session().await.unwrap();
        assert_eq!(store.batch_delete_calls(), 1);
    }

    #[tokio::test]
    async fn clearing_leaves_other_namespaces_alone() {
        let (store, repo) = repository();
        store
            .put_object(BUCKET, "drawing-content/keep", Bytes::from_static(b"d"))
            .await
            .unwrap();
        store
            .put_object(BUCKET, "sessions-archive", Bytes::from_static(b"a"))
            .await
            .unwrap();

        let id = repo.create_session().await.unwrap();

        assert_eq!(
            store.keys(BUCKET).await,
            vec![
                "drawing-content/keep".to_string(),
                "sessions-archive".to_string(),
                format!("sessions/{id}"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_clear_aborts_creation_without_writing() {
        let (store, repo) = repository();
        let existing = repo.create_session().await.unwrap();
        store.fail_listing_after(0);

        let err = repo.create_session().await.unwrap_err();

        let RepositoryError::SessionReplacement(cause) = &err else {
            panic!("expected a session replacement failure, got {err:?}");
        };
        assert!(matches!(**cause, RepositoryError::Storage { operation: "list", .. }));
        assert_eq!(
            err.to_string(),
            "failed to delete existing sessions while creating a new one"
        );
        assert_eq!(store.keys(BUCKET).await, vec![format!("sessions/{existing}")]);
    }

    #[tokio::test]
    async fn concurrent_creates_through_one_repository_keep_one_session() {
        let (_, repo) = repository();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create_session().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.list_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn credentials_are_returned_verbatim() {
        let (store, repo) = repository();
        store
            .put_object(BUCKET, "credentials", Bytes::from_static(b"qwer\n"))
            .await
            .unwrap();

        assert_eq!(repo.get_allowed_credentials().await.unwrap(), "qwer\n");
    }

    #[tokio::test]
    async fn missing_credentials_are_not_found() {
        let (_, repo) = repository();
        assert!(repo.get_allowed_credentials().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn non_utf8_credentials_are_an_encoding_error() {
        let (store, repo) = repository();
        store
            .put_object(BUCKET, "credentials", Bytes::from_static(b"\xff\xfe"))
            .await
            .unwrap();

        let err = repo.get_allowed_credentials().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Encoding { .. }));
    }

    #[tokio::test]
    async fn client_code_is_read_by_concatenated_path() {
        let (store, repo) = repository();
        store
            .put_object(BUCKET, "client/index.html", Bytes::from_static(b"<html/>"))
            .await
            .unwrap();

        assert_eq!(
            repo.serve_client_code("/index.html").await.unwrap(),
            Bytes::from_static(b"<html/>")
        );
    }

    #[tokio::test]
    async fn missing_client_code_is_not_found() {
        let (_, repo) = repository();

        let err = repo.serve_client_code("/missing.js").await.unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::NotFound { ref bucket, ref key }
                if bucket == BUCKET && key == "client/missing.js"
        ));
    }
}
