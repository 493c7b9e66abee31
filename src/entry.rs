use std::sync::Arc;
use std::time::Instant;

/// A stored value plus the deadline the shard needs to expire it.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  value: Arc<V>,
  expires_at: Instant,
}

impl<V> CacheEntry<V> {
  pub(crate) fn new(value: V, expires_at: Instant) -> Self {
    Self {
      value: Arc::new(value),
      expires_at,
    }
  }

  /// Hands out shared ownership of the value.
  #[inline]
  pub(crate) fn value(&self) -> Arc<V> {
    self.value.clone()
  }

  /// Expiry is inclusive: an entry whose deadline equals `now` is expired.
  #[inline]
  pub(crate) fn is_expired(&self, now: Instant) -> bool {
    self.expires_at <= now
  }
}
