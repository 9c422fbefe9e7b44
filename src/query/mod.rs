//! Async query cache for views, inspired by TanStack Query.
//!
//! - [`QueryClient`]: the shared cache. One per application, passed to views.
//! - [`QueryKey`]: structural cache key, built with [`query_key!`](crate::query_key).
//! - [`Query`]: a view's subscription to one key (loading / error / data).
//! - [`Mutation`]: a write whose success updates the cache, either by writing
//!   the response into a key or by invalidating keys.

mod client;
mod key;
mod mutation;
mod observer;

pub use client::QueryClient;
pub use key::QueryKey;
pub use mutation::{Mutation, MutationState};
pub use observer::{Query, QueryState};
