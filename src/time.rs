use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// The cache's source of "now".
///
/// Every time read inside a shard goes through its `Clock`, so tests can
/// freeze or advance time deterministically instead of sleeping.
#[derive(Clone)]
pub struct Clock {
  now: Arc<dyn Fn() -> Instant + Send + Sync>,
}

impl Clock {
  /// A clock backed by `Instant::now`.
  pub fn system() -> Self {
    Self {
      now: Arc::new(Instant::now),
    }
  }

  /// A clock driven by an arbitrary closure.
  pub fn from_fn<F>(f: F) -> Self
  where
    F: Fn() -> Instant + Send + Sync + 'static,
  {
    Self { now: Arc::new(f) }
  }

  /// Reads the current instant.
  #[inline]
  pub fn now(&self) -> Instant {
    (self.now)()
  }
}

impl Default for Clock {
  fn default() -> Self {
    Self::system()
  }
}

impl fmt::Debug for Clock {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Clock(..)")
  }
}
