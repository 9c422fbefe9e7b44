use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single API call.
///
/// `Display` is the message views render verbatim. `Clone` lets one in-flight
/// result be handed to every caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// The request never produced a response (connection refused, reset, ...)
  #[error("{0}")]
  Network(String),

  /// The server answered with a non-2xx status
  #[error("{}", status_message(*status, body))]
  Status { status: StatusCode, body: String },

  /// A 2xx response whose body could not be turned into the expected record
  #[error("{0}")]
  Decode(String),

  /// Rejected before any request was sent
  #[error("{0}")]
  Input(String),
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      ApiError::Decode(e.to_string())
    } else {
      ApiError::Network(e.to_string())
    }
  }
}

/// Body text if there is any, otherwise the status line ("404 Not Found")
fn status_message(status: StatusCode, body: &str) -> String {
  if body.is_empty() {
    status.to_string()
  } else {
    body.to_string()
  }
}
