//! In-process `ObjectStore` with S3-like listing semantics.
//!
//! Keys are kept per bucket in a `BTreeMap`, so listings come back in
//! lexicographic order and pages are cut at `page_size` keys with the last
//! returned key acting as the continuation token. Buckets spring into
//! existence on first write.

use super::{BackendError, BackendResult, ObjectPage, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{BTreeMap, HashMap},
    io,
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::RwLock;

/// Same default as S3's `max-keys`.
const DEFAULT_PAGE_SIZE: usize = 1000;
const NO_LIST_FAILURE: usize = usize::MAX;

#[derive(Clone)]
pub struct MemoryObjectStore {
    inner: Arc<Inner>,
}

struct Inner {
    buckets: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
    page_size: usize,
    batch_deletes: AtomicUsize,
    /// Pages still allowed to succeed before listings start failing.
    list_budget: AtomicUsize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store whose listings return at most `page_size` keys per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                buckets: RwLock::new(HashMap::new()),
                page_size: page_size.max(1),
                batch_deletes: AtomicUsize::new(0),
                list_budget: AtomicUsize::new(NO_LIST_FAILURE),
            }),
        }
    }

    /// Number of `delete_objects` calls received so far.
    pub fn batch_delete_calls(&self) -> usize {
        self.inner.batch_deletes.load(Ordering::SeqCst)
    }

    /// Let `pages` more listing pages succeed, then fail every later one.
    pub fn fail_listing_after(&self, pages: usize) {
        self.inner.list_budget.store(pages, Ordering::SeqCst);
    }

    /// Snapshot of every key currently held in `bucket`, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let guard = self.inner.buckets.read().await;
        guard
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn take_list_budget(&self) -> BackendResult<()> {
        let remaining = self.inner.list_budget.load(Ordering::SeqCst);
        if remaining == NO_LIST_FAILURE {
            return Ok(());
        }
        if remaining == 0 {
            return Err(BackendError::service(io::Error::other(
                "injected listing failure",
            )));
        }
        self.inner.list_budget.store(remaining - 1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> BackendResult<()> {
        let mut guard = self.inner.buckets.write().await;
        guard
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes> {
        let guard = self.inner.buckets.read().await;
        guard
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> BackendResult<ObjectPage> {
        self.take_list_budget()?;

        let guard = self.inner.buckets.read().await;
        let Some(objects) = guard.get(bucket) else {
            return Ok(ObjectPage::default());
        };

        let lower = match continuation_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Included(prefix.to_string()),
        };
        let page_size = self.inner.page_size;
        let mut keys: Vec<String> = objects
            .range::<String, _>((lower, Bound::Unbounded))
            .map(|(key, _)| key)
            .skip_while(|key| key.as_str() < prefix)
            .take_while(|key| key.starts_with(prefix))
            .take(page_size + 1)
            .cloned()
            .collect();

        let next_continuation_token = if keys.len() > page_size {
            keys.truncate(page_size);
            keys.last().cloned()
        } else {
            None
        };

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BackendResult<()> {
        self.inner.batch_deletes.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.inner.buckets.write().await;
        if let Some(objects) = guard.get_mut(bucket) {
            for key in keys {
                objects.remove(key);
            }
        }
        Ok(())
    }
}
