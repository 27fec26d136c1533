//! Bounded LRU map for cache entries.

use std::collections::{HashMap, VecDeque};

use super::entry::CacheEntry;

/// Ordered map from request key to cache entry, bounded by entry count.
///
/// Recency is tracked purely by mutation order: `get` and `insert` move the
/// key to the most-recently-used end, and inserting past `max_entries`
/// evicts from the least-recently-used end. `len() <= max_entries` holds
/// after every mutation.
#[derive(Debug)]
pub struct LruCache {
  entries: HashMap<String, CacheEntry>,
  /// Front = most recently used, back = least recently used.
  order: VecDeque<String>,
  max_entries: usize,
}

impl LruCache {
  pub fn new(max_entries: usize) -> Self {
    let max_entries = max_entries.max(1);
    Self {
      entries: HashMap::with_capacity(max_entries),
      order: VecDeque::with_capacity(max_entries),
      max_entries,
    }
  }

  /// Look up an entry and mark it most-recently-used.
  pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
    if self.entries.contains_key(key) {
      self.touch(key);
    }
    self.entries.get(key)
  }

  /// Look up an entry without disturbing recency order.
  pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
    self.entries.get(key)
  }

  /// Insert or replace an entry, mark it most-recently-used, then evict
  /// least-recently-used entries until the bound holds.
  pub fn insert(&mut self, key: String, entry: CacheEntry) {
    self.entries.insert(key.clone(), entry);
    self.touch(&key);

    while self.entries.len() > self.max_entries {
      match self.order.pop_back() {
        Some(evicted) => {
          self.entries.remove(&evicted);
        }
        None => break,
      }
    }
  }

  pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
    self.order.retain(|k| k != key);
    self.entries.remove(key)
  }

  pub fn clear(&mut self) {
    self.entries.clear();
    self.order.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  /// The key that would be evicted next.
  #[cfg(test)]
  pub fn lru_key(&self) -> Option<&String> {
    self.order.back()
  }

  fn touch(&mut self, key: &str) {
    self.order.retain(|k| k != key);
    self.order.push_front(key.to_string());
  }
}
