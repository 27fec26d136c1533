//! Cooperative cancellation tokens.
//!
//! A [`CancelToken`] is a cheap clonable flag that async work can race
//! against. [`CancelToken::merge`] builds a first-to-fire-wins combinator:
//! the merged token reports cancelled as soon as either input does, without
//! spawning a watcher task, so nothing outlives the request that created it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Notify;

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
  inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
  fired: AtomicBool,
  notify: Notify,
  /// Tokens this one was merged from; firing any of them fires this one.
  parents: Vec<CancelToken>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fire the token. Idempotent; wakes every current waiter.
  pub fn cancel(&self) {
    if !self.inner.fired.swap(true, Ordering::SeqCst) {
      self.inner.notify.notify_waiters();
    }
  }

  pub fn is_cancelled(&self) -> bool {
    self.inner.fired.load(Ordering::SeqCst)
      || self.inner.parents.iter().any(|p| p.is_cancelled())
  }

  /// Resolve once the token (or any token it was merged from) fires.
  /// Resolves immediately when it already has.
  pub fn cancelled(&self) -> BoxFuture<'_, ()> {
    async move {
      if self.is_cancelled() {
        return;
      }
      let mut waits: Vec<BoxFuture<'_, ()>> = Vec::with_capacity(1 + self.inner.parents.len());
      waits.push(self.own_cancelled().boxed());
      for parent in &self.inner.parents {
        waits.push(parent.cancelled());
      }
      // select_all drops the losing futures, which deregisters their
      // waiters along with them.
      futures::future::select_all(waits).await;
    }
    .boxed()
  }

  /// Combine two tokens into one that fires as soon as either input fires.
  /// If an input has already fired, the merged token is born fired.
  pub fn merge(a: &CancelToken, b: &CancelToken) -> CancelToken {
    CancelToken {
      inner: Arc::new(Inner {
        fired: AtomicBool::new(false),
        notify: Notify::new(),
        parents: vec![a.clone(), b.clone()],
      }),
    }
  }

  async fn own_cancelled(&self) {
    let notified = self.inner.notify.notified();
    tokio::pin!(notified);
    // Register before re-checking the flag so a concurrent cancel() cannot
    // slip between the check and the wait.
    notified.as_mut().enable();
    if self.inner.fired.load(Ordering::SeqCst) {
      return;
    }
    notified.await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use tokio::time::timeout;

  #[tokio::test]
  async fn test_cancelled_resolves_after_cancel() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());

    let waiter = token.clone();
    let handle = tokio::spawn(async move { waiter.cancelled().await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    timeout(Duration::from_millis(200), handle)
      .await
      .expect("waiter should wake")
      .unwrap();
    assert!(token.is_cancelled());
  }

  #[tokio::test]
  async fn test_merge_fires_on_either_input() {
    let a = CancelToken::new();
    let b = CancelToken::new();
    let merged = CancelToken::merge(&a, &b);
    assert!(!merged.is_cancelled());

    b.cancel();
    assert!(merged.is_cancelled());
    timeout(Duration::from_millis(200), merged.cancelled())
      .await
      .expect("merged token should resolve");

    // The other input is untouched.
    assert!(!a.is_cancelled());
  }

  #[tokio::test]
  async fn test_merge_of_already_fired_token_is_born_fired() {
    let a = CancelToken::new();
    a.cancel();
    let merged = CancelToken::merge(&a, &CancelToken::new());
    assert!(merged.is_cancelled());
    timeout(Duration::from_millis(50), merged.cancelled())
      .await
      .expect("should resolve immediately");
  }

  #[tokio::test]
  async fn test_direct_cancel_on_merged_token_does_not_touch_inputs() {
    let a = CancelToken::new();
    let b = CancelToken::new();
    let merged = CancelToken::merge(&a, &b);

    merged.cancel();
    assert!(merged.is_cancelled());
    assert!(!a.is_cancelled());
    assert!(!b.is_cancelled());
  }
}
