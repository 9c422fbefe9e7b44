//! Beatmatchr HTTP API: records, the resource client, cache keys and the
//! query/mutation bindings views use.

pub mod client;
pub mod error;
pub mod keys;
pub mod queries;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
