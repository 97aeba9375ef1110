//! Enumerate every key under a namespace prefix, draining pagination.

use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::keys::KEY_SEPARATOR;
use crate::store::{BackendResult, ObjectStore};
use futures::{Stream, TryStreamExt, stream};
use tracing::{debug, warn};

/// Stream the store's listing of `scope` one page at a time.
///
/// State is `None` once exhausted, `Some(None)` before the first page and
/// `Some(Some(token))` while more pages remain.
fn key_pages<'a>(
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    scope: &'a str,
) -> impl Stream<Item = BackendResult<Vec<String>>> + 'a {
    stream::try_unfold(Some(None::<String>), move |cursor| async move {
        let Some(token) = cursor else {
            return BackendResult::Ok(None);
        };
        let page = store.list_objects_page(bucket, scope, token).await?;
        BackendResult::Ok(Some((page.keys, page.next_continuation_token.map(Some))))
    })
}

/// List all keys stored under `prefix/` in `bucket`, in store order.
///
/// With `strip_prefix` the `prefix/` part is removed from each key. A key
/// that is exactly `prefix/` names nothing and is skipped. The first failing
/// page aborts the listing; nothing partial is returned.
pub async fn list_keys(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    strip_prefix: bool,
) -> RepositoryResult<Vec<String>> {
    debug_assert!(!prefix.is_empty(), "listing needs a namespace prefix");

    let scope = format!("{prefix}{KEY_SEPARATOR}");
    let keys: Vec<String> = key_pages(store, bucket, &scope)
        .try_concat()
        .await
        .map_err(|source| RepositoryError::from_backend("list", prefix, source))?;

    debug!(bucket, prefix, count = keys.len(), "listed keys");

    if !strip_prefix {
        return Ok(keys);
    }

    Ok(keys
        .into_iter()
        .filter_map(|key| match key.strip_prefix(scope.as_str()) {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => {
                warn!(bucket, key = %key, "skipping key with no name below its prefix");
                None
            }
        })
        .collect())
}
