//! Cached HTTP client for the Borealis polar-expedition booking backend.
//!
//! The crate wraps the backend's JSON API with an in-memory caching layer:
//! a bounded LRU map with TTL expiry, stale-while-revalidate background
//! refresh, single-flight request coalescing, and a short-lived negative
//! cache for 404s. On top of that sit typed query helpers for the trip and
//! ship catalogs.
//!
//! # Example
//!
//! ```ignore
//! let client = BorealisClient::from_env()?;
//!
//! let filters = TripFilters {
//!     region: Some("antarctica".to_string()),
//!     ..TripFilters::default()
//! };
//! let opts = FetchOptions {
//!     stale_while_revalidate: true,
//!     allow_stale_if_error: true,
//!     ..FetchOptions::default()
//! };
//!
//! match client.fetch_trips(&filters, &opts).await {
//!     QueryOutcome::Loaded(page) => render_catalog(page),
//!     QueryOutcome::Empty => render_empty_state(),
//!     QueryOutcome::Failed(err) => render_fallback(err),
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;

pub use api::client::BorealisClient;
pub use api::types::{PageResult, QueryOutcome, Ship, ShipFilters, Trip, TripFilters};
pub use cache::{CancelToken, FetchCache, FetchOptions, Fetched};
pub use config::Config;
pub use error::{ApiError, Result};
