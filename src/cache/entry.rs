//! Cache entry types and TTL bookkeeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Payload of a cache entry.
///
/// A 404 from upstream is cached as `Missing` so that "known absent" can be
/// told apart from "never fetched" when inspecting the cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
  Json(Arc<Value>),
  Missing,
}

impl CachedValue {
  /// The JSON payload, or `None` for a cached 404.
  pub fn as_json(&self) -> Option<Arc<Value>> {
    match self {
      CachedValue::Json(value) => Some(Arc::clone(value)),
      CachedValue::Missing => None,
    }
  }
}

/// A single cached fetch result.
///
/// Entries are replaced wholesale on refresh and never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub value: CachedValue,
  pub expires_at: Instant,
  /// ETag validator from the last successful response, if any.
  pub etag: Option<String>,
}

impl CacheEntry {
  pub fn fresh(value: CachedValue, ttl: Duration, etag: Option<String>) -> Self {
    Self {
      value,
      expires_at: Instant::now() + ttl,
      etag,
    }
  }

  /// A short-lived negative entry for an upstream 404.
  pub fn missing(ttl: Duration) -> Self {
    Self::fresh(CachedValue::Missing, ttl, None)
  }

  pub fn is_expired(&self) -> bool {
    Instant::now() >= self.expires_at
  }

  /// Same value and validator with the TTL restarted. Used when upstream
  /// answers 304 to a conditional refresh.
  pub fn rearmed(&self, ttl: Duration) -> Self {
    Self {
      value: self.value.clone(),
      expires_at: Instant::now() + ttl,
      etag: self.etag.clone(),
    }
  }
}
