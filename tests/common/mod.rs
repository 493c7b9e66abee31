#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tessera_cache::{Cache, CacheBuilder, Clock, PolicyKind};

/// A clock the tests advance by hand instead of sleeping.
#[derive(Clone)]
pub struct ManualClock {
  origin: Instant,
  offset_nanos: Arc<AtomicU64>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      origin: Instant::now(),
      offset_nanos: Arc::new(AtomicU64::new(0)),
    }
  }

  pub fn clock(&self) -> Clock {
    let origin = self.origin;
    let offset = Arc::clone(&self.offset_nanos);
    Clock::from_fn(move || origin + Duration::from_nanos(offset.load(Ordering::SeqCst)))
  }

  pub fn advance(&self, by: Duration) {
    self
      .offset_nanos
      .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
  }
}

/// A bounded cache with TTL disabled.
pub fn bounded_cache(policy: PolicyKind, capacity: usize, shards: usize) -> Cache<i32, String> {
  CacheBuilder::new()
    .capacity(capacity)
    .shards(shards)
    .policy(policy)
    .build()
    .unwrap()
}

/// A single-shard TTL cache on a caller-controlled clock. The janitor is
/// parked far in the future so only foreground paths reclaim entries.
pub fn ttl_cache(ttl: Duration, clock: Clock) -> Cache<i32, String> {
  CacheBuilder::new()
    .shards(1)
    .default_ttl(ttl)
    .clock(clock)
    .janitor_initial_delay(Duration::from_secs(3600))
    .build()
    .unwrap()
}

pub fn value(n: i32) -> String {
  format!("value-{n}")
}
