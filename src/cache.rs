use crate::builder::CacheBuilder;
use crate::hasher::{CacheKey, KeyHasher};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::shard::{SetResult, Shard};
use crate::task::janitor::Janitor;

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;

/// A sharded, thread-safe key/value cache with bounded capacity and
/// time-to-live expiration.
///
/// Operations route to one of N independently locked shards by key hash,
/// so distinct keys rarely contend. Within a shard operations are
/// linearizable; across shards there is no ordering. Dropping the cache
/// stops every janitor after a final sweep.
pub struct Cache<K, V> {
  shards: Box<[Arc<Shard<K, V>>]>,
  hasher: KeyHasher<K>,
  metrics: Metrics,
  janitors: Vec<Janitor>,
}

impl<K, V> Cache<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Starts configuring a cache.
  pub fn builder() -> CacheBuilder<K, V>
  where
    K: CacheKey,
  {
    CacheBuilder::new()
  }

  pub(crate) fn assemble(
    shards: Box<[Arc<Shard<K, V>>]>,
    hasher: KeyHasher<K>,
    metrics: Metrics,
    janitors: Vec<Janitor>,
  ) -> Self {
    Self {
      shards,
      hasher,
      metrics,
      janitors,
    }
  }

  #[inline]
  fn shard_for(&self, key: &K) -> &Shard<K, V> {
    let hash = self.hasher.hash(key);
    let index = hash as usize & (self.shards.len() - 1);
    &self.shards[index]
  }

  /// Inserts with the default TTL. Returns whether the key was admitted
  /// and how many entries were evicted to make room.
  pub fn insert(&self, key: K, value: V) -> SetResult {
    let result = self.shard_for(&key).insert(key, value);
    self.record_evictions(result);
    result
  }

  /// Inserts with an explicit TTL. Only meaningful when the cache was
  /// built with a non-zero default TTL; otherwise expiration stays off.
  pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) -> SetResult {
    let result = self.shard_for(&key).insert_with_ttl(key, value, ttl);
    self.record_evictions(result);
    result
  }

  fn record_evictions(&self, result: SetResult) {
    if result.evicted > 0 {
      self
        .metrics
        .evictions
        .fetch_add(result.evicted as u64, Ordering::Relaxed);
    }
  }

  /// Looks up a key, refreshing its standing with the eviction policy.
  /// Expired entries are reclaimed and reported as misses.
  pub fn get(&self, key: &K) -> Option<Arc<V>> {
    match self.shard_for(key).get(key) {
      Some(value) => {
        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
      }
      None => {
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        None
      }
    }
  }

  /// Looks up a key without side effects: no policy reordering, no
  /// expiration check, no counters. Returns the stored value even if it
  /// has expired.
  pub fn peek(&self, key: &K) -> Option<Arc<V>> {
    self.shard_for(key).peek(key)
  }

  /// Removes a key; true when it was present.
  pub fn invalidate(&self, key: &K) -> bool {
    if self.shard_for(key).invalidate(key) {
      self.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
      true
    } else {
      false
    }
  }

  /// Empties every shard, fanning the work out over a bounded worker
  /// pool, and counts the clear once the last shard is done.
  pub fn clear(&self) {
    let workers = num_cpus::get().min(self.shards.len()).max(1);
    let (job_tx, job_rx) = bounded::<usize>(workers);

    thread::scope(|scope| {
      for _ in 0..workers {
        let job_rx = job_rx.clone();
        let shards = &self.shards;
        scope.spawn(move || {
          for index in job_rx.iter() {
            shards[index].clear();
          }
        });
      }
      for index in 0..self.shards.len() {
        if job_tx.send(index).is_err() {
          break;
        }
      }
      drop(job_tx);
    });

    self.metrics.clears.fetch_add(1, Ordering::Relaxed);
  }

  /// Best-effort total entry count, summed from per-shard atomic mirrors
  /// without taking any locks.
  pub fn len(&self) -> usize {
    self.shards.iter().map(|shard| shard.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// A point-in-time snapshot of the cache's counters.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache")
      .field("shards", &self.shards.len())
      .field("len", &self.len())
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V> Drop for Cache<K, V> {
  fn drop(&mut self) {
    for janitor in self.janitors.drain(..) {
      janitor.stop();
    }
  }
}
