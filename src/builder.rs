use crate::cache::Cache;
use crate::error::BuildError;
use crate::hasher::{CacheKey, KeyHasher};
use crate::metrics::Metrics;
use crate::policy::PolicyKind;
use crate::shard::Shard;
use crate::task::janitor::Janitor;
use crate::time::Clock;

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// First wake of a freshly spawned janitor, and its re-arm delay while the
/// shard has nothing scheduled to expire.
const DEFAULT_JANITOR_INITIAL_DELAY: Duration = Duration::from_secs(10);

/// A builder for [`Cache`] instances.
///
/// Defaults: unbounded capacity, TTL disabled, FIFO eviction, and a
/// power-of-two shard count derived from the core count.
pub struct CacheBuilder<K, V> {
  capacity: usize,
  shards: usize,
  policy: PolicyKind,
  default_ttl: Duration,
  hasher: KeyHasher<K>,
  clock: Clock,
  janitor_initial_delay: Duration,
  _value_marker: PhantomData<V>,
}

impl<K, V> fmt::Debug for CacheBuilder<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("capacity", &self.capacity)
      .field("shards", &self.shards)
      .field("policy", &self.policy)
      .field("default_ttl", &self.default_ttl)
      .finish_non_exhaustive()
  }
}

impl<K: CacheKey, V> CacheBuilder<K, V> {
  /// A builder with the default canonical-bytes hasher for `K`.
  pub fn new() -> Self {
    Self::with_hasher(KeyHasher::new())
  }
}

impl<K: CacheKey, V> Default for CacheBuilder<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V> CacheBuilder<K, V> {
  /// A builder around a caller-supplied hasher; the route for key types
  /// the default encoding does not cover.
  pub fn with_hasher(hasher: KeyHasher<K>) -> Self {
    Self {
      capacity: 0,
      shards: default_shards(),
      policy: PolicyKind::default(),
      default_ttl: Duration::ZERO,
      hasher,
      clock: Clock::system(),
      janitor_initial_delay: DEFAULT_JANITOR_INITIAL_DELAY,
      _value_marker: PhantomData,
    }
  }

  /// Total entries across all shards; `0` (the default) is unbounded.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  /// Eviction policy used by every shard.
  pub fn policy(mut self, policy: PolicyKind) -> Self {
    self.policy = policy;
    self
  }

  /// Number of shards; must be a power of two, validated at build time.
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = shards;
    self
  }

  /// Time-to-live applied to inserts; `Duration::ZERO` (the default)
  /// disables expiration entirely.
  pub fn default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  /// Replaces the hasher.
  pub fn hasher(mut self, hasher: KeyHasher<K>) -> Self {
    self.hasher = hasher;
    self
  }

  /// Injects a time source; tests use this to freeze or advance time.
  pub fn clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  /// First wake delay of each shard's janitor, also its re-arm delay while
  /// that shard has nothing scheduled to expire.
  pub fn janitor_initial_delay(mut self, delay: Duration) -> Self {
    self.janitor_initial_delay = delay;
    self
  }
}

impl<K, V> CacheBuilder<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Validates the configuration and builds the cache, spawning one
  /// janitor per shard when TTL is enabled.
  pub fn build(self) -> Result<Cache<K, V>, BuildError> {
    self.validate()?;

    let shard_capacity = self.capacity / self.shards;
    let shards: Box<[Arc<Shard<K, V>>]> = (0..self.shards)
      .map(|_| {
        Arc::new(Shard::new(
          self.policy,
          shard_capacity,
          self.default_ttl,
          self.clock.clone(),
        ))
      })
      .collect();

    let janitors = if self.default_ttl.is_zero() {
      Vec::new()
    } else {
      shards
        .iter()
        .map(|shard| Janitor::spawn(Arc::clone(shard), self.janitor_initial_delay))
        .collect()
    };

    log::debug!(
      "cache built: {} shards, capacity {} per shard, policy {:?}, ttl {:?}",
      self.shards,
      shard_capacity,
      self.policy,
      self.default_ttl
    );

    Ok(Cache::assemble(shards, self.hasher, Metrics::new(), janitors))
  }

  fn validate(&self) -> Result<(), BuildError> {
    if self.shards == 0 {
      return Err(BuildError::ZeroShards);
    }
    if !self.shards.is_power_of_two() {
      return Err(BuildError::ShardsNotPowerOfTwo(self.shards));
    }
    Ok(())
  }
}

fn default_shards() -> usize {
  (num_cpus::get() * 4).max(1).next_power_of_two()
}
