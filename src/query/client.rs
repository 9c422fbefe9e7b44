//! The query cache: keyed entries, in-flight de-duplication, invalidation
//! and direct writes.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::api::ApiError;

pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<AnyData, ApiError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Type-erased fetch function stored with its entry so invalidation can refetch
pub(crate) type ErasedFetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;

/// Status of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data yet
  Pending,
  /// Last fetch failed; previous data (if any) is retained but stale
  Error,
  /// Data present and fresh as of the last fetch or write
  Success,
}

/// Point-in-time view of one cache entry
#[derive(Debug)]
pub struct QuerySnapshot<T> {
  pub status: QueryStatus,
  pub data: Option<Arc<T>>,
  pub error: Option<ApiError>,
  pub is_fetching: bool,
  pub is_invalidated: bool,
  pub data_updated_at: Option<DateTime<Utc>>,
  /// Increments on every data write (fetch success or direct write)
  pub data_revision: u64,
  /// Increments on every change to the entry
  pub revision: u64,
}

impl<T> Clone for QuerySnapshot<T> {
  fn clone(&self) -> Self {
    Self {
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      is_fetching: self.is_fetching,
      is_invalidated: self.is_invalidated,
      data_updated_at: self.data_updated_at,
      data_revision: self.data_revision,
      revision: self.revision,
    }
  }
}

struct Entry {
  status: QueryStatus,
  data: Option<AnyData>,
  error: Option<ApiError>,
  is_invalidated: bool,
  /// Invalidated while a fetch was in flight; that fetch's result is already outdated
  refetch_pending: bool,
  data_updated_at: Option<DateTime<Utc>>,
  data_revision: u64,
  revision: u64,
  in_flight: Option<SharedFetch>,
  fetcher: Option<ErasedFetcher>,
  observers: usize,
}

impl Default for Entry {
  fn default() -> Self {
    Self {
      status: QueryStatus::Pending,
      data: None,
      error: None,
      is_invalidated: false,
      refetch_pending: false,
      data_updated_at: None,
      data_revision: 0,
      revision: 0,
      in_flight: None,
      fetcher: None,
      observers: 0,
    }
  }
}

impl Entry {
  fn is_fresh(&self) -> bool {
    self.status == QueryStatus::Success && !self.is_invalidated
  }

  fn write_data(&mut self, data: AnyData) {
    self.data = Some(data);
    self.error = None;
    self.status = QueryStatus::Success;
    self.is_invalidated = false;
    self.data_updated_at = Some(Utc::now());
    self.data_revision += 1;
    self.revision += 1;
  }

  fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QuerySnapshot<T> {
    let data = self.data.clone().and_then(|data| match data.downcast::<T>() {
      Ok(data) => Some(data),
      Err(_) => {
        warn!(%key, "cached value has a different type than requested");
        None
      }
    });

    QuerySnapshot {
      status: self.status,
      data,
      error: self.error.clone(),
      is_fetching: self.in_flight.is_some(),
      is_invalidated: self.is_invalidated,
      data_updated_at: self.data_updated_at,
      data_revision: self.data_revision,
      revision: self.revision,
    }
  }
}

#[derive(Default)]
struct Inner {
  entries: HashMap<QueryKey, Entry>,
}

/// Process-wide query cache.
///
/// Created once per application instance and shared by cloning; clones see
/// the same entries. Each read is addressed by a [`QueryKey`]. A read for a
/// key that is not fresh starts exactly one fetch; reads issued while that
/// fetch is in flight join it instead of starting another.
///
/// Fetches run as spawned tasks, so a result always lands in the cache even
/// when every observer has gone away. Must be used inside a tokio runtime.
#[derive(Clone, Default)]
pub struct QueryClient {
  inner: Arc<Mutex<Inner>>,
}

impl QueryClient {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Read `key`, fetching it with `fetcher` unless fresh data is cached.
  ///
  /// Concurrent calls for the same key share one underlying fetch. Views go
  /// through [`Query`](super::Query) instead, which never awaits.
  #[cfg(test)]
  pub async fn fetch_query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, ApiError>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let pending = {
      let mut inner = self.lock();
      let entry = inner.entries.entry(key.clone()).or_default();
      entry.fetcher = Some(erase_fetcher(fetcher));

      if entry.is_fresh() {
        if let Some(data) = entry.data.clone() {
          return downcast(&key, data);
        }
      }

      self
        .start_fetch(&key, entry)
        .ok_or_else(|| ApiError::Input(format!("No fetcher registered for {}", key)))?
    };

    let data = pending.await?;
    downcast(&key, data)
  }

  /// Cached data for `key`, fresh or not
  pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
    self.snapshot::<T>(key).and_then(|s| s.data)
  }

  /// Overwrite `key` with `value` without fetching
  pub fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
    let mut inner = self.lock();
    debug!(%key, "writing query data");
    inner.entries.entry(key).or_default().write_data(Arc::new(value));
  }

  /// Mark `key` stale.
  ///
  /// If a view is observing the key, a refetch starts right away; otherwise
  /// the next read refetches. Returns false when nothing is cached for `key`.
  pub fn invalidate(&self, key: &QueryKey) -> bool {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return false;
    };

    debug!(%key, observers = entry.observers, "invalidating query");
    entry.is_invalidated = true;
    entry.revision += 1;

    if entry.in_flight.is_some() {
      entry.refetch_pending = true;
    } else if entry.observers > 0 {
      self.start_fetch(key, entry);
    }
    true
  }

  /// Snapshot of the entry for `key`, if any
  pub fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QuerySnapshot<T>> {
    let inner = self.lock();
    inner.entries.get(key).map(|entry| entry.snapshot(key))
  }

  /// Register an observer for `key`, replacing the stored fetcher
  pub(crate) fn subscribe(&self, key: &QueryKey, fetcher: ErasedFetcher) {
    let mut inner = self.lock();
    let entry = inner.entries.entry(key.clone()).or_default();
    entry.observers += 1;
    entry.fetcher = Some(fetcher);
  }

  pub(crate) fn unsubscribe(&self, key: &QueryKey) {
    let mut inner = self.lock();
    if let Some(entry) = inner.entries.get_mut(key) {
      entry.observers = entry.observers.saturating_sub(1);
    }
  }

  /// Start a fetch for `key` unless its data is fresh or one is already running.
  /// Uses the fetcher registered by [`Self::subscribe`].
  pub(crate) fn ensure_fetched(&self, key: &QueryKey) {
    let mut inner = self.lock();
    if let Some(entry) = inner.entries.get_mut(key) {
      if !entry.is_fresh() && entry.in_flight.is_none() {
        self.start_fetch(key, entry);
      }
    }
  }

  /// Join the in-flight fetch for `key` or spawn a new one.
  /// Called with the lock held; returns None when no fetcher is registered.
  fn start_fetch(&self, key: &QueryKey, entry: &mut Entry) -> Option<SharedFetch> {
    if let Some(in_flight) = &entry.in_flight {
      debug!(%key, "joining in-flight fetch");
      return Some(in_flight.clone());
    }

    let fetcher = entry.fetcher.clone()?;
    debug!(%key, "starting fetch");

    // Nothing to retain: a retry after an error goes back to pending
    if entry.data.is_none() {
      entry.status = QueryStatus::Pending;
      entry.error = None;
    }

    let fetch = fetcher();
    let client = self.clone();
    let task_key = key.clone();
    let task = tokio::spawn(async move {
      let result = fetch.await;
      client.settle(&task_key, result.clone());
      result
    });

    let shared = async move {
      task
        .await
        .unwrap_or_else(|e| Err(ApiError::Network(format!("Fetch task failed: {}", e))))
    }
    .boxed()
    .shared();

    entry.in_flight = Some(shared.clone());
    entry.revision += 1;
    Some(shared)
  }

  /// Record the outcome of a fetch
  fn settle(&self, key: &QueryKey, result: FetchResult) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return;
    };

    entry.in_flight = None;
    match result {
      Ok(data) => {
        debug!(%key, "fetch succeeded");
        entry.write_data(data);
      }
      Err(e) => {
        warn!(%key, error = %e, "fetch failed");
        entry.status = QueryStatus::Error;
        entry.error = Some(e);
        entry.revision += 1;
      }
    }

    if entry.refetch_pending {
      entry.refetch_pending = false;
      entry.is_invalidated = true;
      if entry.observers > 0 {
        self.start_fetch(key, entry);
      }
    }
  }
}

impl std::fmt::Debug for QueryClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let inner = self.lock();
    f.debug_struct("QueryClient")
      .field("entries", &inner.entries.len())
      .finish_non_exhaustive()
  }
}

pub(crate) fn erase_fetcher<T, F, Fut>(fetcher: F) -> ErasedFetcher
where
  T: Send + Sync + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  Arc::new(move || {
    let fetch = fetcher();
    async move { fetch.await.map(|data| Arc::new(data) as AnyData) }.boxed()
  })
}

#[cfg(test)]
fn downcast<T: Send + Sync + 'static>(key: &QueryKey, data: AnyData) -> Result<Arc<T>, ApiError> {
  data
    .downcast::<T>()
    .map_err(|_| ApiError::Decode(format!("Cached value for {} has an unexpected type", key)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query_key;
  use crate::testing::eventually;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn counting_fetcher(
    counter: Arc<AtomicU32>,
    delay: Duration,
  ) -> impl Fn() -> BoxFuture<'static, Result<u32, ApiError>> + Send + Sync + 'static {
    move || {
      let counter = counter.clone();
      async move {
        tokio::time::sleep(delay).await;
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_fetch() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = query_key!["projects", "p1"];

    let (a, b) = tokio::join!(
      client.fetch_query(
        key.clone(),
        counting_fetcher(counter.clone(), Duration::from_millis(30))
      ),
      client.fetch_query(
        key.clone(),
        counting_fetcher(counter.clone(), Duration::from_millis(30))
      ),
    );

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(*a.unwrap(), 1);
    assert_eq!(*b.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_fresh_data_is_served_from_cache() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = query_key!["projects"];

    client
      .fetch_query(key.clone(), counting_fetcher(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    let second = client
      .fetch_query(key.clone(), counting_fetcher(counter.clone(), Duration::ZERO))
      .await
      .unwrap();

    assert_eq!(*second, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_different_keys_fetch_independently() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
      client.fetch_query(
        query_key!["projects", "a"],
        counting_fetcher(counter.clone(), Duration::from_millis(20))
      ),
      client.fetch_query(
        query_key!["projects", "b"],
        counting_fetcher(counter.clone(), Duration::from_millis(5))
      ),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_set_query_data_overwrites_without_fetch() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = query_key!["projects", "p1", "lyrics"];

    client
      .fetch_query(key.clone(), counting_fetcher(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    let before = client.snapshot::<u32>(&key).unwrap();

    client.set_query_data(key.clone(), 42u32);

    let after = client.snapshot::<u32>(&key).unwrap();
    assert_eq!(after.status, QueryStatus::Success);
    assert_eq!(after.data.as_deref(), Some(&42));
    assert_eq!(after.data_revision, before.data_revision + 1);

    let read = client
      .fetch_query(key.clone(), counting_fetcher(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    assert_eq!(*read, 42);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch_on_next_read() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = query_key!["projects", "p1", "source-clips"];

    client
      .fetch_query(key.clone(), counting_fetcher(counter.clone(), Duration::ZERO))
      .await
      .unwrap();

    assert!(client.invalidate(&key));
    let snapshot = client.snapshot::<u32>(&key).unwrap();
    assert!(snapshot.is_invalidated);
    // No observers, so nothing was started yet
    assert!(!snapshot.is_fetching);

    let read = client
      .fetch_query(key.clone(), counting_fetcher(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    assert_eq!(*read, 2);
    assert!(!client.snapshot::<u32>(&key).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_invalidate_is_scoped_to_exact_key() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let a = query_key!["projects", "a", "source-clips"];
    let b = query_key!["projects", "b", "source-clips"];

    for key in [&a, &b] {
      client
        .fetch_query(key.clone(), counting_fetcher(counter.clone(), Duration::ZERO))
        .await
        .unwrap();
    }

    client.invalidate(&a);
    assert!(client.snapshot::<u32>(&a).unwrap().is_invalidated);
    let other = client.snapshot::<u32>(&b).unwrap();
    assert!(!other.is_invalidated);
    assert_eq!(other.status, QueryStatus::Success);
    assert!(!client.invalidate(&query_key!["projects", "c", "source-clips"]));
  }

  #[tokio::test]
  async fn test_invalidate_with_observer_refetches_immediately() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = query_key!["projects", "p1", "source-clips"];

    client.subscribe(
      &key,
      erase_fetcher(counting_fetcher(counter.clone(), Duration::ZERO)),
    );
    client.ensure_fetched(&key);
    assert!(eventually(|| client.get_query_data::<u32>(&key).as_deref() == Some(&1)).await);

    client.invalidate(&key);
    assert!(eventually(|| client.get_query_data::<u32>(&key).as_deref() == Some(&2)).await);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_during_fetch_refetches_after_settle() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = query_key!["projects", "p1", "source-clips"];

    client.subscribe(
      &key,
      erase_fetcher(counting_fetcher(counter.clone(), Duration::from_millis(20))),
    );
    client.ensure_fetched(&key);
    client.invalidate(&key);

    assert!(eventually(|| client.get_query_data::<u32>(&key).as_deref() == Some(&2)).await);
    let snapshot = client.snapshot::<u32>(&key).unwrap();
    assert!(!snapshot.is_invalidated);
    assert_eq!(snapshot.status, QueryStatus::Success);
  }

  #[tokio::test]
  async fn test_error_retains_previous_data() {
    let client = QueryClient::new();
    let key = query_key!["projects", "p1"];

    client
      .fetch_query(key.clone(), || async { Ok::<_, ApiError>(7u32) })
      .await
      .unwrap();
    client.invalidate(&key);

    let err = client
      .fetch_query(key.clone(), || async {
        Err::<u32, _>(ApiError::Network("connection refused".into()))
      })
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "connection refused");

    let snapshot = client.snapshot::<u32>(&key).unwrap();
    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(snapshot.data.as_deref(), Some(&7));
    assert_eq!(
      snapshot.error,
      Some(ApiError::Network("connection refused".into()))
    );
  }

  #[tokio::test]
  async fn test_fetch_lands_after_observer_leaves() {
    let client = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = query_key!["projects"];

    client.subscribe(
      &key,
      erase_fetcher(counting_fetcher(counter.clone(), Duration::from_millis(20))),
    );
    client.ensure_fetched(&key);
    client.unsubscribe(&key);

    assert!(eventually(|| client.get_query_data::<u32>(&key).is_some()).await);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_type_mismatch_is_an_error_not_a_panic() {
    let client = QueryClient::new();
    let key = query_key!["projects"];
    client.set_query_data(key.clone(), 1u32);

    let err = client
      .fetch_query(key.clone(), || async { Ok::<_, ApiError>(String::new()) })
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert!(client.get_query_data::<String>(&key).is_none());
  }
}
