//! In-memory caching layer for backend fetches.
//!
//! This module provides an endpoint-agnostic caching mechanism that:
//! - Bounds memory with LRU eviction over an ordered key map
//! - Expires entries by TTL, with optional stale-while-revalidate refresh
//! - Coalesces concurrent fetches for one key into a single upstream call
//! - Remembers 404s briefly and can mask fetch errors with stale entries

mod cancel;
mod entry;
mod fetcher;
mod lru;
mod transport;

pub use cancel::CancelToken;
pub use entry::{CacheEntry, CachedValue};
pub use fetcher::{FetchCache, FetchOptions, Fetched};
pub use lru::LruCache;
pub use transport::{HttpTransport, Transport, TransportResponse};
