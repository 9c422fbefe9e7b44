use std::future::Future;
use std::sync::Arc;

use super::client::{erase_fetcher, QueryClient, QuerySnapshot, QueryStatus};
use super::key::QueryKey;
use crate::api::ApiError;

/// The state of a query as a view renders it
#[derive(Debug)]
pub enum QueryState<T> {
  /// Query is disabled or has not been started
  Idle,
  /// No data yet, fetch in flight
  Loading,
  /// Data present
  Success(Arc<T>),
  /// Last fetch failed
  Error(ApiError),
}

impl<T> QueryState<T> {
  fn from_snapshot(snapshot: &QuerySnapshot<T>) -> Self {
    match snapshot.status {
      QueryStatus::Success => match &snapshot.data {
        Some(data) => QueryState::Success(data.clone()),
        None => QueryState::Idle,
      },
      QueryStatus::Error => match &snapshot.error {
        Some(e) => QueryState::Error(e.clone()),
        None => QueryState::Idle,
      },
      QueryStatus::Pending if snapshot.is_fetching => QueryState::Loading,
      QueryStatus::Pending => QueryState::Idle,
    }
  }
}

/// A view's subscription to one cache key.
///
/// Holds no data of its own: `poll()` copies the latest state of the key out
/// of the [`QueryClient`], so every view observing a key renders the same
/// thing. Dropping the handle unsubscribes; a fetch it started still lands
/// in the cache.
///
/// ```ignore
/// let api = api.clone();
/// let id = project_id.clone();
/// let mut query = Query::new(&queries, keys::lyrics(&id), move || {
///     let api = api.clone();
///     let id = id.clone();
///     async move { api.get_lyrics(&id).await }
/// });
/// query.fetch();
///
/// // In event loop tick
/// if query.poll() {
///     // State changed, re-render
/// }
/// ```
pub struct Query<T> {
  client: QueryClient,
  key: QueryKey,
  enabled: bool,
  state: QueryState<T>,
  data: Option<Arc<T>>,
  data_revision: u64,
  revision: Option<u64>,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Subscribe to `key`. The fetcher is called each time the cache needs
  /// fresh data for the key (mount, refetch, invalidation).
  pub fn new<F, Fut>(client: &QueryClient, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    client.subscribe(&key, erase_fetcher(fetcher));

    let mut query = Self {
      client: client.clone(),
      key,
      enabled: true,
      state: QueryState::Idle,
      data: None,
      data_revision: 0,
      revision: None,
    };
    query.poll();
    query
  }

  /// A query that never fetches (e.g. its id is missing)
  pub fn disabled(client: &QueryClient, key: QueryKey) -> Self {
    Self {
      client: client.clone(),
      key,
      enabled: false,
      state: QueryState::Idle,
      data: None,
      data_revision: 0,
      revision: None,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Latest data, retained even while the last fetch is in error
  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  /// Bumps each time new data is written for the key
  pub fn data_revision(&self) -> u64 {
    self.data_revision
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self.state, QueryState::Error(_))
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Mount fetch: no-op when cached data is fresh or a fetch is in flight.
  pub fn fetch(&mut self) {
    if !self.enabled {
      return;
    }
    self.client.ensure_fetched(&self.key);
    self.poll();
  }

  /// Mark the key stale and fetch again.
  pub fn refetch(&mut self) {
    if !self.enabled {
      return;
    }
    self.client.invalidate(&self.key);
    self.client.ensure_fetched(&self.key);
    self.poll();
  }

  /// Copy the latest cache state for the key.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    if !self.enabled {
      return false;
    }

    let Some(snapshot) = self.client.snapshot::<T>(&self.key) else {
      return false;
    };
    if self.revision == Some(snapshot.revision) {
      return false;
    }

    self.revision = Some(snapshot.revision);
    self.state = QueryState::from_snapshot(&snapshot);
    self.data = snapshot.data;
    self.data_revision = snapshot.data_revision;
    true
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if self.enabled {
      self.client.unsubscribe(&self.key);
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("data_revision", &self.data_revision)
      .finish_non_exhaustive()
  }
}
