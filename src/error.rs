//! Error types for the client and cache layer.
//!
//! `ApiError` is `Clone` so a settled in-flight request can hand the same
//! error to every caller that joined it.

use thiserror::Error;

/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Unified error type for the client and cache layer.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
  /// No backend base URL was configured.
  #[error("backend base URL not configured; set BOREALIS_API_URL or provide a config file")]
  MissingBaseUrl,

  /// Configuration file could not be read or parsed.
  #[error("configuration error: {0}")]
  Config(String),

  /// Connection, timeout, or request-build failure.
  #[error("transport error: {0}")]
  Transport(String),

  /// Upstream answered with a non-2xx status other than 404.
  #[error("upstream returned {status} {status_text}: {body}")]
  Status {
    status: u16,
    status_text: String,
    /// Bounded snippet of the response body.
    body: String,
  },

  /// Response body was not the JSON shape we expected.
  #[error("failed to decode response: {0}")]
  Decode(String),

  /// The request was cancelled before it settled.
  #[error("request cancelled")]
  Cancelled,
}

impl ApiError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, ApiError::Cancelled)
  }
}
