//! HTTP transport behind the cache layer.
//!
//! The orchestrator talks to the network through the [`Transport`] trait so
//! tests can script responses; [`HttpTransport`] is the reqwest-backed
//! implementation used in production.

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use super::cancel::CancelToken;
use crate::error::{ApiError, Result};

/// How much of an error body is kept in [`ApiError::Status`].
const BODY_SNIPPET_LEN: usize = 256;

/// Outcome of a transport-level GET.
#[derive(Debug)]
pub enum TransportResponse {
  /// 2xx with a parsed JSON body.
  Ok {
    value: Value,
    etag: Option<String>,
  },
  /// 404: "no such resource", not an error.
  NotFound,
  /// 304: the supplied validator still matches; no body.
  NotModified,
}

/// Seam between the cache orchestrator and the network.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
  /// Perform a JSON GET. `etag` is sent as `If-None-Match` when present.
  /// The call must settle promptly once `cancel` fires.
  async fn get_json(
    &self,
    url: &str,
    etag: Option<&str>,
    cancel: &CancelToken,
  ) -> Result<TransportResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(request_timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(request_timeout)
      .build()
      .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn get_json(
    &self,
    url: &str,
    etag: Option<&str>,
    cancel: &CancelToken,
  ) -> Result<TransportResponse> {
    // Transport-level caching stays off; freshness is this crate's job.
    let mut request = self.client.get(url).header(CACHE_CONTROL, "no-cache");
    if let Some(validator) = etag {
      request = request.header(IF_NONE_MATCH, validator);
    }

    let response = tokio::select! {
      _ = cancel.cancelled() => return Err(ApiError::Cancelled),
      result = request.send() => {
        result.map_err(|e| ApiError::Transport(format!("request to {} failed: {}", url, e)))?
      }
    };

    let status = response.status();
    match status {
      StatusCode::NOT_FOUND => Ok(TransportResponse::NotFound),
      StatusCode::NOT_MODIFIED => Ok(TransportResponse::NotModified),
      status if status.is_success() => {
        let etag = response
          .headers()
          .get(ETAG)
          .and_then(|v| v.to_str().ok())
          .map(String::from);

        let value = tokio::select! {
          _ = cancel.cancelled() => return Err(ApiError::Cancelled),
          body = response.json::<Value>() => {
            body.map_err(|e| ApiError::Decode(format!("invalid JSON from {}: {}", url, e)))?
          }
        };

        Ok(TransportResponse::Ok { value, etag })
      }
      status => {
        let status_text = status
          .canonical_reason()
          .unwrap_or("unknown status")
          .to_string();
        let body: String = response
          .text()
          .await
          .unwrap_or_default()
          .chars()
          .take(BODY_SNIPPET_LEN)
          .collect();

        Err(ApiError::Status {
          status: status.as_u16(),
          status_text,
          body,
        })
      }
    }
  }
}
