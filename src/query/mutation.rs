use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::client::QueryClient;
use crate::api::ApiError;

/// The state of the most recent `mutate` call
#[derive(Debug, Clone)]
pub enum MutationState<V> {
  Idle,
  Pending,
  Success(V),
  Error(ApiError),
}

type MutationFn<A, V> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;
type SuccessFn<V> = Arc<dyn Fn(&QueryClient, &V) + Send + Sync>;

/// A write operation bound to a view.
///
/// Runs independently of the read cache. When it succeeds, the `on_success`
/// effect (typically `set_query_data` or `invalidate`) runs inside the spawned
/// task, before the handle sees the result, so the cache is updated even if
/// the view is gone by then.
///
/// Calls are not queued: two `mutate` calls both run, and whichever response
/// arrives last is the one its effect leaves in the cache. The handle only
/// reports the most recent call.
pub struct Mutation<A, V> {
  client: QueryClient,
  mutation_fn: MutationFn<A, V>,
  on_success: Option<SuccessFn<V>>,
  state: MutationState<V>,
  receiver: Option<mpsc::UnboundedReceiver<Result<V, ApiError>>>,
}

impl<A: Send + 'static, V: Send + Sync + 'static> Mutation<A, V> {
  pub fn new<F, Fut>(client: &QueryClient, mutation_fn: F) -> Self
  where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
  {
    Self {
      client: client.clone(),
      mutation_fn: Arc::new(move |args| mutation_fn(args).boxed()),
      on_success: None,
      state: MutationState::Idle,
      receiver: None,
    }
  }

  /// Cache effect to apply when a call succeeds
  pub fn on_success<F>(mut self, effect: F) -> Self
  where
    F: Fn(&QueryClient, &V) + Send + Sync + 'static,
  {
    self.on_success = Some(Arc::new(effect));
    self
  }

  pub fn state(&self) -> &MutationState<V> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, MutationState::Success(_))
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    matches!(self.state, MutationState::Error(_))
  }

  #[cfg(test)]
  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Start the mutation with `args`.
  pub fn mutate(&mut self, args: A) {
    let (tx, rx) = mpsc::unbounded_channel();
    // Replacing the receiver detaches the handle from any earlier call
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    let future = (self.mutation_fn)(args);
    let client = self.client.clone();
    let on_success = self.on_success.clone();
    tokio::spawn(async move {
      let result = future.await;
      if let (Ok(value), Some(effect)) = (&result, &on_success) {
        debug!("mutation succeeded, applying cache effect");
        effect(&client, value);
      }
      // Ignore send errors - the handle may have been dropped
      let _ = tx.send(result);
    });
  }

  /// Poll for the result of the pending call.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Success(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Task ended without sending
        self.state = MutationState::Error(ApiError::Network("Request was cancelled".to_string()));
        self.receiver = None;
        true
      }
    }
  }

  /// Forget the last result
  pub fn reset(&mut self) {
    self.state = MutationState::Idle;
    self.receiver = None;
  }
}

impl<A, V: std::fmt::Debug> std::fmt::Debug for Mutation<A, V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query_key;
  use crate::testing::eventually;
  use std::time::Duration;

  #[tokio::test]
  async fn test_mutation_success_runs_effect_first() {
    let client = QueryClient::new();
    let key = query_key!["projects", "p1", "lyrics"];
    let effect_key = key.clone();

    let mut mutation = Mutation::new(&client, |text: String| async move { Ok(text.to_uppercase()) })
      .on_success(move |client, value: &String| {
        client.set_query_data(effect_key.clone(), value.clone());
      });

    assert!(matches!(mutation.state(), MutationState::Idle));
    mutation.mutate("verse".to_string());
    assert!(mutation.is_pending());

    assert!(eventually(|| {
      mutation.poll();
      mutation.is_success()
    })
    .await);
    assert_eq!(
      client.get_query_data::<String>(&key).as_deref().map(String::as_str),
      Some("VERSE")
    );
  }

  #[tokio::test]
  async fn test_failed_mutation_leaves_cache_untouched() {
    let client = QueryClient::new();
    let key = query_key!["projects", "p1", "lyrics"];
    client.set_query_data(key.clone(), "before".to_string());
    let effect_key = key.clone();

    let mut mutation = Mutation::new(&client, |_: String| async {
      Err::<String, _>(ApiError::Network("connection refused".into()))
    })
    .on_success(move |client, value: &String| {
      client.set_query_data(effect_key.clone(), value.clone());
    });

    mutation.mutate("after".to_string());
    assert!(eventually(|| {
      mutation.poll();
      mutation.is_error()
    })
    .await);
    assert_eq!(mutation.error().map(|e| e.to_string()).as_deref(), Some("connection refused"));
    assert_eq!(
      client.get_query_data::<String>(&key).as_deref().map(String::as_str),
      Some("before")
    );
  }

  #[tokio::test]
  async fn test_last_response_wins() {
    let client = QueryClient::new();
    let key = query_key!["projects", "p1", "lyrics"];
    let effect_key = key.clone();

    // The first call is slower than the second
    let mut mutation = Mutation::new(&client, |(text, delay_ms): (String, u64)| async move {
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
      Ok(text)
    })
    .on_success(move |client, value: &String| {
      client.set_query_data(effect_key.clone(), value.clone());
    });

    mutation.mutate(("first click".to_string(), 40));
    mutation.mutate(("second click".to_string(), 5));

    assert!(eventually(|| {
      mutation.poll();
      mutation.is_success()
    })
    .await);
    tokio::time::sleep(Duration::from_millis(60)).await;

    // The handle reports the latest call, the cache holds the latest response
    assert!(matches!(mutation.state(), MutationState::Success(v) if v == "second click"));
    assert_eq!(
      client.get_query_data::<String>(&key).as_deref().map(String::as_str),
      Some("first click")
    );
  }

  #[tokio::test]
  async fn test_reset() {
    let client = QueryClient::new();
    let mut mutation = Mutation::new(&client, |n: u32| async move { Ok(n + 1) });
    mutation.mutate(1);
    assert!(eventually(|| {
      mutation.poll();
      mutation.is_success()
    })
    .await);
    mutation.reset();
    assert!(matches!(mutation.state(), MutationState::Idle));
    assert!(!mutation.poll());
  }
}
