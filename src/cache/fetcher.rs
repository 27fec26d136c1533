//! Cache-aware fetch orchestration.
//!
//! [`FetchCache`] resolves JSON GETs cache-first: unexpired entries are
//! served without touching the network, expired entries can be served stale
//! while a background refresh runs, concurrent callers for the same key are
//! coalesced into a single upstream request, 404s are remembered briefly,
//! and fetch errors can be masked with a stale entry when the caller allows
//! it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::cancel::CancelToken;
use super::entry::{CacheEntry, CachedValue};
use super::lru::LruCache;
use super::transport::{Transport, TransportResponse};
use crate::config::CacheTuning;
use crate::error::{ApiError, Result};

/// A fetched payload; `None` means the upstream answered 404.
pub type Fetched = Option<Arc<Value>>;

type FlightResult = std::result::Result<Fetched, ApiError>;

/// One coalesced upstream request. Cloned to every caller that joins it.
type Flight = Shared<BoxFuture<'static, FlightResult>>;

/// Per-call fetch options.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
  /// Freshness window; the configured default when `None`.
  pub ttl: Option<Duration>,
  /// Serve an expired entry immediately and refresh it in the background.
  pub stale_while_revalidate: bool,
  /// Mask fetch errors with a (possibly expired) entry when one exists.
  pub allow_stale_if_error: bool,
  /// Caller-side cancellation, merged with the cache's own token.
  pub cancel: Option<CancelToken>,
  /// Skip the freshness check and go to the network.
  pub force_refresh: bool,
  /// Cache under this key instead of the request URL.
  pub cache_key: Option<String>,
}

struct CacheInner {
  entries: Mutex<LruCache>,
  in_flight: Mutex<HashMap<String, Flight>>,
  transport: Arc<dyn Transport>,
  tuning: CacheTuning,
  /// Fired by [`FetchCache::shutdown`]; merged into every upstream call.
  shutdown: CancelToken,
}

/// Cache-aware fetcher over a [`Transport`].
///
/// Constructed once per process and cloned into whoever needs it; clones
/// share the same cache and in-flight table. Both maps live behind plain
/// mutexes whose lock scopes never cross an await, which is what keeps the
/// at-most-one-flight-per-key invariant without async locks.
#[derive(Clone)]
pub struct FetchCache {
  inner: Arc<CacheInner>,
}

impl std::fmt::Debug for FetchCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FetchCache").finish_non_exhaustive()
  }
}

impl FetchCache {
  pub fn new(transport: Arc<dyn Transport>, tuning: CacheTuning) -> Self {
    Self {
      inner: Arc::new(CacheInner {
        entries: Mutex::new(LruCache::new(tuning.max_entries)),
        in_flight: Mutex::new(HashMap::new()),
        transport,
        tuning,
        shutdown: CancelToken::new(),
      }),
    }
  }

  /// Resolve a JSON GET for `url` through the cache.
  ///
  /// Returns `Ok(None)` when the upstream answered 404 (possibly remembered
  /// from a recent attempt).
  pub async fn fetch_value(&self, url: &str, opts: &FetchOptions) -> Result<Fetched> {
    let key = opts.cache_key.as_deref().unwrap_or(url).to_string();
    let ttl = opts.ttl.unwrap_or_else(|| self.inner.tuning.default_ttl());
    let cancel = opts.cancel.clone().unwrap_or_default();

    if !opts.force_refresh {
      // Check cache first
      if let Some((value, expired)) = self.cached_state(&key) {
        if !expired {
          debug!(key = %key, "cache hit");
          return Ok(value.as_json());
        }

        // Entry is stale; hand it back right away and refresh behind the
        // caller's back when asked to.
        if opts.stale_while_revalidate {
          debug!(key = %key, "serving stale entry, revalidating in background");
          self.spawn_revalidate(&key, url, ttl);
          return Ok(value.as_json());
        }
      }
    }

    // A fresh fetch is required.
    match self.load(&key, url, ttl, &cancel).await {
      Ok(fetched) => Ok(fetched),
      Err(err) if opts.allow_stale_if_error => match self.stale_value(&key) {
        Some(value) => {
          warn!(key = %key, error = %err, "fetch failed, serving stale entry");
          Ok(value.as_json())
        }
        None => Err(err),
      },
      Err(err) => Err(err),
    }
  }

  /// Typed variant of [`fetch_value`](Self::fetch_value): deserializes the
  /// cached payload at the call boundary instead of trusting it blindly.
  pub async fn fetch<T: DeserializeOwned>(&self, url: &str, opts: &FetchOptions) -> Result<Option<T>> {
    match self.fetch_value(url, opts).await? {
      Some(value) => {
        let typed = T::deserialize(value.as_ref())
          .map_err(|e| ApiError::Decode(format!("unexpected payload from {}: {}", url, e)))?;
        Ok(Some(typed))
      }
      None => Ok(None),
    }
  }

  /// Warm the cache for `url` without blocking the caller. Errors are
  /// logged, never surfaced.
  pub fn prefetch(&self, url: &str, opts: &FetchOptions) {
    let cache = self.clone();
    let url = url.to_string();
    let opts = FetchOptions {
      cancel: None,
      ..opts.clone()
    };
    tokio::spawn(async move {
      if let Err(err) = cache.fetch_value(&url, &opts).await {
        debug!(url = %url, error = %err, "prefetch failed");
      }
    });
  }

  /// Cancel every outstanding upstream request.
  pub fn shutdown(&self) {
    self.inner.shutdown.cancel();
  }

  pub fn len(&self) -> usize {
    self.inner.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.entries.lock().is_empty()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.inner.entries.lock().contains(key)
  }

  pub fn remove(&self, key: &str) {
    self.inner.entries.lock().remove(key);
  }

  pub fn clear(&self) {
    self.inner.entries.lock().clear();
  }

  pub fn in_flight_len(&self) -> usize {
    self.inner.in_flight.lock().len()
  }

  /// Join the key's in-flight request or become its leader.
  ///
  /// A joined request that fails falls through to one direct attempt
  /// instead of propagating the leader's failure blindly; a failure caused
  /// by our own token firing is not retried.
  async fn load(
    &self,
    key: &str,
    url: &str,
    ttl: Duration,
    cancel: &CancelToken,
  ) -> Result<Fetched> {
    let (flight, joined) = self.join_or_lead(key, url, ttl, cancel);
    match self.await_flight(flight, cancel).await {
      Ok(fetched) => Ok(fetched),
      Err(_) if cancel.is_cancelled() => Err(ApiError::Cancelled),
      Err(err) if joined => {
        debug!(key = %key, error = %err, "joined request failed, retrying directly");
        let (retry, _) = self.join_or_lead(key, url, ttl, cancel);
        self.await_flight(retry, cancel).await
      }
      Err(err) => Err(err),
    }
  }

  /// Returns the flight for `key`, creating it if none is up, and whether
  /// the caller joined an existing one.
  fn join_or_lead(
    &self,
    key: &str,
    url: &str,
    ttl: Duration,
    cancel: &CancelToken,
  ) -> (Flight, bool) {
    let mut in_flight = self.inner.in_flight.lock();
    if let Some(existing) = in_flight.get(key) {
      return (existing.clone(), true);
    }

    let flight = self.spawn_flight(key, url, ttl, cancel);
    in_flight.insert(key.to_string(), flight.clone());
    (flight, false)
  }

  /// Run the upstream fetch as its own task so it settles (and updates the
  /// cache) even if every caller goes away. The task clears the in-flight
  /// slot exactly once, whatever the outcome.
  fn spawn_flight(
    &self,
    key: &str,
    url: &str,
    ttl: Duration,
    cancel: &CancelToken,
  ) -> Flight {
    let inner = Arc::clone(&self.inner);
    // The leader's token is merged into the transport call; joiners only
    // ever detach themselves, they cannot abort the shared request.
    let merged = CancelToken::merge(cancel, &self.inner.shutdown);
    let key = key.to_string();
    let url = url.to_string();

    let handle = tokio::spawn(async move {
      let result = perform_fetch(&inner, &key, &url, ttl, &merged).await;
      inner.in_flight.lock().remove(&key);
      result
    });

    async move {
      match handle.await {
        Ok(result) => result,
        Err(join_err) => Err(ApiError::Transport(format!("fetch task failed: {}", join_err))),
      }
    }
    .boxed()
    .shared()
  }

  async fn await_flight(&self, flight: Flight, cancel: &CancelToken) -> Result<Fetched> {
    tokio::select! {
      _ = cancel.cancelled() => Err(ApiError::Cancelled),
      result = flight => result,
    }
  }

  /// Refresh one key without blocking the caller that noticed it was stale.
  /// Single-flight aware: a refresh already underway is left alone.
  fn spawn_revalidate(&self, key: &str, url: &str, ttl: Duration) {
    if self.inner.in_flight.lock().contains_key(key) {
      return;
    }

    let cache = self.clone();
    let key = key.to_string();
    let url = url.to_string();
    tokio::spawn(async move {
      // Fire-and-forget: the stale entry stays in place when this fails.
      if let Err(err) = cache.load(&key, &url, ttl, &CancelToken::new()).await {
        debug!(key = %key, error = %err, "background revalidation failed");
      }
    });
  }

  fn cached_state(&self, key: &str) -> Option<(CachedValue, bool)> {
    let mut entries = self.inner.entries.lock();
    entries.get(key).map(|e| (e.value.clone(), e.is_expired()))
  }

  fn stale_value(&self, key: &str) -> Option<CachedValue> {
    self.inner.entries.lock().peek(key).map(|e| e.value.clone())
  }
}

async fn perform_fetch(
  inner: &Arc<CacheInner>,
  key: &str,
  url: &str,
  ttl: Duration,
  cancel: &CancelToken,
) -> FlightResult {
  // Revalidate with the stored validator when the old entry is still around.
  let etag = inner
    .entries
    .lock()
    .peek(key)
    .and_then(|e| e.etag.clone());

  match inner.transport.get_json(url, etag.as_deref(), cancel).await? {
    TransportResponse::Ok { value, etag } => {
      let value = Arc::new(value);
      let entry = CacheEntry::fresh(CachedValue::Json(Arc::clone(&value)), ttl, etag);
      inner.entries.lock().insert(key.to_string(), entry);
      Ok(Some(value))
    }
    TransportResponse::NotFound => {
      // Remember the miss briefly so repeated lookups don't hammer
      // upstream, without poisoning the cache for long.
      let entry = CacheEntry::missing(inner.tuning.not_found_ttl());
      inner.entries.lock().insert(key.to_string(), entry);
      Ok(None)
    }
    TransportResponse::NotModified => {
      // Validator matched: keep the value, restart the clock.
      let mut entries = inner.entries.lock();
      match entries.peek(key) {
        Some(existing) => {
          let rearmed = existing.rearmed(ttl);
          let value = rearmed.value.as_json();
          entries.insert(key.to_string(), rearmed);
          Ok(value)
        }
        None => Err(ApiError::Transport(format!(
          "upstream returned 304 for {} but the cached entry is gone",
          url
        ))),
      }
    }
  }
}
