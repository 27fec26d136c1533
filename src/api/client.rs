//! Cached client for the booking backend.
//!
//! Wraps the backend's JSON API with the fetch cache and exposes typed
//! query helpers for the catalog pages. Results are deserialized at the
//! call boundary; list queries degrade to [`QueryOutcome::Empty`] on
//! malformed envelopes instead of crashing the page that asked.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::{FetchCache, FetchOptions, HttpTransport, Transport};
use crate::config::Config;
use crate::error::{ApiError, Result};

use super::envelope::{Envelope, Page};
use super::types::{detail_segment, QueryOutcome, Ship, ShipFilters, Trip, TripFilters};

/// Client for the Borealis booking backend with transparent caching.
///
/// Cheap to clone; clones share one cache and in-flight table.
#[derive(Clone, Debug)]
pub struct BorealisClient {
  cache: FetchCache,
  base_url: Arc<str>,
}

impl BorealisClient {
  pub fn new(config: &Config) -> Result<Self> {
    if config.api.base_url.trim().is_empty() {
      return Err(ApiError::MissingBaseUrl);
    }
    let transport = Arc::new(HttpTransport::new(config.api.request_timeout())?);
    Ok(Self::with_transport(transport, config))
  }

  /// Build a client from `BOREALIS_API_URL` and default tuning.
  pub fn from_env() -> Result<Self> {
    let config = Config::from_env()?;
    Self::new(&config)
  }

  /// Build a client over a custom transport. Tests use this seam; so can
  /// embedders that need request middleware.
  pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Self {
    Self {
      cache: FetchCache::new(transport, config.cache.clone()),
      base_url: config.api.base_url.trim_end_matches('/').into(),
    }
  }

  /// Fetch a page of the trip catalog.
  pub async fn fetch_trips(
    &self,
    filters: &TripFilters,
    opts: &FetchOptions,
  ) -> QueryOutcome<Trip> {
    let url = self.endpoint(&format!("/api/trips?{}", filters.to_query_string()));
    self.fetch_page::<Trip>(&url, opts).await
  }

  /// Fetch a page of the ship catalog.
  pub async fn fetch_ships(
    &self,
    filters: &ShipFilters,
    opts: &FetchOptions,
  ) -> QueryOutcome<Ship> {
    let url = self.endpoint(&format!("/api/ships?{}", filters.to_query_string()));
    self.fetch_page::<Ship>(&url, opts).await
  }

  /// Fetch a single trip.
  ///
  /// Tries the type-specific endpoint first; when that misses, falls back
  /// to the type-agnostic one. `Ok(None)` when both miss.
  pub async fn fetch_trip_detail(
    &self,
    id: u64,
    kind: &str,
    opts: &FetchOptions,
  ) -> Result<Option<Trip>> {
    if let Some(segment) = detail_segment(kind) {
      let url = self.endpoint(&format!("/api/trips/{}/{}", segment, id));
      if let Some(trip) = self.fetch_detail_at(&url, opts).await? {
        return Ok(Some(trip));
      }
      debug!(id, kind, "type-specific detail endpoint missed, falling back");
    }

    let url = self.endpoint(&format!("/api/trips/{}", id));
    self.fetch_detail_at(&url, opts).await
  }

  /// Warm the cache for a trips listing without blocking the caller.
  pub fn prefetch_trips(&self, filters: &TripFilters) {
    let url = self.endpoint(&format!("/api/trips?{}", filters.to_query_string()));
    self.cache.prefetch(&url, &FetchOptions::default());
  }

  /// Warm the cache for a trip detail without blocking the caller.
  pub fn prefetch_trip_detail(&self, id: u64, kind: &str) {
    let client = self.clone();
    let kind = kind.to_string();
    tokio::spawn(async move {
      if let Err(err) = client
        .fetch_trip_detail(id, &kind, &FetchOptions::default())
        .await
      {
        debug!(id, kind = %kind, error = %err, "trip detail prefetch failed");
      }
    });
  }

  /// The underlying fetch cache, for diagnostics and tests.
  pub fn cache(&self) -> &FetchCache {
    &self.cache
  }

  pub fn cache_len(&self) -> usize {
    self.cache.len()
  }

  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn fetch_page<T: DeserializeOwned>(
    &self,
    url: &str,
    opts: &FetchOptions,
  ) -> QueryOutcome<T> {
    match self.cache.fetch::<Envelope<Page<T>>>(url, opts).await {
      Ok(Some(envelope)) => match envelope.data {
        Some(page) if envelope.status => QueryOutcome::Loaded(page.into_page_result()),
        _ => QueryOutcome::Empty,
      },
      // 404: no such listing.
      Ok(None) => QueryOutcome::Empty,
      Err(ApiError::Decode(reason)) => {
        warn!(url, reason = %reason, "malformed catalog envelope, treating as empty");
        QueryOutcome::Empty
      }
      Err(err) => QueryOutcome::Failed(err),
    }
  }

  async fn fetch_detail_at(&self, url: &str, opts: &FetchOptions) -> Result<Option<Trip>> {
    match self.cache.fetch::<Envelope<Trip>>(url, opts).await? {
      Some(envelope) if envelope.status => Ok(envelope.data),
      _ => Ok(None),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{ApiConfig, CacheTuning};
  use serde_json::json;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn test_config(base_url: &str) -> Config {
    Config {
      api: ApiConfig {
        base_url: base_url.to_string(),
        request_timeout_ms: 2_000,
      },
      cache: CacheTuning::default(),
    }
  }

  fn trips_envelope() -> serde_json::Value {
    json!({
      "status": true,
      "message": "ok",
      "code": 200,
      "data": {
        "current_page": 1,
        "data": [
          {"id": 1, "title": "Svalbard Circumnavigation", "region": "arctic", "price": 9800.0},
          {"id": 2, "title": "Weddell Sea Voyage", "region": "antarctica", "price": 21500.0}
        ],
        "last_page": 3,
        "total": 30,
        "per_page": 12,
        "from": 1,
        "to": 12
      }
    })
  }

  #[tokio::test]
  async fn test_fetch_trips_normalizes_the_paginated_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips"))
      .and(query_param("page", "1"))
      .and(query_param("limit", "12"))
      .respond_with(ResponseTemplate::new(200).set_body_json(trips_envelope()))
      .expect(1)
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let outcome = client
      .fetch_trips(&TripFilters::default(), &FetchOptions::default())
      .await;

    let page = match outcome {
      QueryOutcome::Loaded(page) => page,
      other => panic!("expected Loaded, got {:?}", other),
    };
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].title, "Svalbard Circumnavigation");
    assert_eq!(page.current_page, 1);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_items, 30);
    assert_eq!(page.to, Some(12));
  }

  #[tokio::test]
  async fn test_repeat_fetch_within_ttl_hits_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips"))
      .respond_with(ResponseTemplate::new(200).set_body_json(trips_envelope()))
      .expect(1)
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let filters = TripFilters::default();

    let first = client.fetch_trips(&filters, &FetchOptions::default()).await;
    let second = client.fetch_trips(&filters, &FetchOptions::default()).await;

    assert!(first.is_loaded());
    assert!(second.is_loaded());
    assert_eq!(client.cache_len(), 1);
  }

  #[tokio::test]
  async fn test_malformed_envelope_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": "shape"})))
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let outcome = client
      .fetch_trips(&TripFilters::default(), &FetchOptions::default())
      .await;

    assert!(outcome.is_empty());
  }

  #[tokio::test]
  async fn test_refused_envelope_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": false,
        "message": "rate limited",
        "code": 429,
        "data": null
      })))
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let outcome = client
      .fetch_trips(&TripFilters::default(), &FetchOptions::default())
      .await;

    assert!(outcome.is_empty());
  }

  #[tokio::test]
  async fn test_server_error_is_reported_as_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips"))
      .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let outcome = client
      .fetch_trips(&TripFilters::default(), &FetchOptions::default())
      .await;

    match outcome {
      QueryOutcome::Failed(ApiError::Status { status, .. }) => assert_eq!(status, 500),
      other => panic!("expected Failed, got {:?}", other),
    }

    // Page layers can still degrade gracefully.
    let page = client
      .fetch_trips(&TripFilters::default(), &FetchOptions::default())
      .await
      .into_page();
    assert!(page.items.is_empty());
  }

  #[tokio::test]
  async fn test_detail_falls_back_to_type_agnostic_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips/two/42"))
      .respond_with(ResponseTemplate::new(404))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/trips/42"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": true,
        "message": "ok",
        "code": 200,
        "data": {"id": 42, "title": "Ross Sea Expedition"}
      })))
      .expect(1)
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let trip = client
      .fetch_trip_detail(42, "trip_two", &FetchOptions::default())
      .await
      .unwrap()
      .unwrap();

    assert_eq!(trip.id, 42);
    assert_eq!(trip.title, "Ross Sea Expedition");
  }

  #[tokio::test]
  async fn test_detail_sentinel_kind_skips_the_typed_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips/42"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": true,
        "message": "ok",
        "code": 200,
        "data": {"id": 42, "title": "Ross Sea Expedition"}
      })))
      .expect(1)
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let trip = client
      .fetch_trip_detail(42, "trip", &FetchOptions::default())
      .await
      .unwrap();

    assert_eq!(trip.unwrap().id, 42);
  }

  #[tokio::test]
  async fn test_detail_missing_everywhere_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let trip = client
      .fetch_trip_detail(999, "trip_two", &FetchOptions::default())
      .await
      .unwrap();

    assert!(trip.is_none());
  }

  #[tokio::test]
  async fn test_prefetch_populates_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/trips"))
      .respond_with(ResponseTemplate::new(200).set_body_json(trips_envelope()))
      .expect(1)
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    client.prefetch_trips(&TripFilters::default());

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(client.cache_len(), 1);

    // Served from cache; the mock's expect(1) holds.
    let outcome = client
      .fetch_trips(&TripFilters::default(), &FetchOptions::default())
      .await;
    assert!(outcome.is_loaded());
  }

  #[tokio::test]
  async fn test_fetch_ships_uses_the_ships_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/ships"))
      .and(query_param("page", "1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": true,
        "message": "ok",
        "code": 200,
        "data": {
          "current_page": 1,
          "data": [{"id": 5, "name": "MS Aurora", "capacity": 120}],
          "last_page": 1,
          "total": 1,
          "per_page": 12,
          "from": 1,
          "to": 1
        }
      })))
      .mount(&server)
      .await;

    let client = BorealisClient::new(&test_config(&server.uri())).unwrap();
    let outcome = client
      .fetch_ships(&ShipFilters::default(), &FetchOptions::default())
      .await;

    let page = match outcome {
      QueryOutcome::Loaded(page) => page,
      other => panic!("expected Loaded, got {:?}", other),
    };
    assert_eq!(page.items[0].name, "MS Aurora");
    assert_eq!(page.items[0].capacity, Some(120));
  }

  #[tokio::test]
  async fn test_base_url_trailing_slash_is_trimmed() {
    let config = test_config("https://api.borealis.example/");
    let client = BorealisClient::new(&config).unwrap();
    assert_eq!(
      client.endpoint("/api/trips"),
      "https://api.borealis.example/api/trips"
    );
  }

  #[test]
  fn test_blank_base_url_fails_fast() {
    let err = BorealisClient::new(&test_config("  ")).unwrap_err();
    assert!(matches!(err, ApiError::MissingBaseUrl));
  }
}
