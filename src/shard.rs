use crate::entry::CacheEntry;
use crate::expiry::ExpiryQueue;
use crate::policy::{self, EvictionPolicy, PolicyKind};
use crate::time::Clock;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::RandomState;
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

/// How many expired heads a hit may reap before returning.
///
/// Bounds the latency added to a hot-path read while still giving
/// foreground traffic a steady share of the cleanup work.
const HIT_SWEEP_BUDGET: usize = 4;

/// The outcome of an insert: whether the key was admitted, and how many
/// entries capacity pressure evicted along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetResult {
  pub admitted: bool,
  pub evicted: usize,
}

struct ShardInner<K, V> {
  store: HashMap<K, CacheEntry<V>, RandomState>,
  policy: Box<dyn EvictionPolicy<K>>,
  expiry: ExpiryQueue<K>,
}

/// One independently locked partition of the cache.
///
/// The store, the policy index and the expiry queue are co-owned behind a
/// single lock: every mutating operation holds the write half, `peek` only
/// the read half. Concurrency comes from partitioning the keyspace, not
/// from fine-grained locking inside a shard.
pub(crate) struct Shard<K, V> {
  inner: CachePadded<RwLock<ShardInner<K, V>>>,
  // Mirror of `store.len()`, maintained inside critical sections so the
  // front door can snapshot sizes without taking locks.
  len: CachePadded<AtomicUsize>,
  capacity: usize,
  default_ttl: Duration,
  clock: Clock,
}

impl<K, V> Shard<K, V>
where
  K: Eq + Hash + Clone + Send + Sync,
{
  pub(crate) fn new(kind: PolicyKind, capacity: usize, default_ttl: Duration, clock: Clock) -> Self
  where
    K: 'static,
  {
    let inner = ShardInner {
      store: HashMap::with_hasher(RandomState::new()),
      policy: policy::new_policy(kind),
      expiry: ExpiryQueue::new(default_ttl, clock.clone()),
    };
    Self {
      inner: CachePadded::new(RwLock::new(inner)),
      len: CachePadded::new(AtomicUsize::new(0)),
      capacity,
      default_ttl,
      clock,
    }
  }

  #[inline]
  fn ttl_enabled(&self) -> bool {
    !self.default_ttl.is_zero()
  }

  #[inline]
  pub(crate) fn clock(&self) -> &Clock {
    &self.clock
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.len.load(Ordering::Relaxed)
  }

  pub(crate) fn insert(&self, key: K, value: V) -> SetResult {
    let mut inner = self.inner.write();
    let entry = CacheEntry::new(value, self.clock.now() + self.default_ttl);
    if self.ttl_enabled() {
      inner.expiry.push_std(key.clone());
    }
    let result = self.admit(&mut inner, key, entry);
    self.len.store(inner.store.len(), Ordering::Relaxed);
    result
  }

  pub(crate) fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) -> SetResult {
    let mut inner = self.inner.write();
    let entry = CacheEntry::new(value, self.clock.now() + ttl);
    if self.ttl_enabled() {
      inner.expiry.push_with_ttl(key.clone(), ttl);
    }
    let result = self.admit(&mut inner, key, entry);
    self.len.store(inner.store.len(), Ordering::Relaxed);
    result
  }

  /// The insert-or-evict loop. The expiry entry is already scheduled at
  /// this point; a refused admission leaves it behind as a ghost, which
  /// the sweeps skip.
  fn admit(&self, inner: &mut ShardInner<K, V>, key: K, entry: CacheEntry<V>) -> SetResult {
    let exists = inner.store.contains_key(&key);
    let mut evicted = 0;

    if !exists && self.capacity > 0 {
      let mut attempts = 0;
      while inner.store.len() >= self.capacity {
        let Some(victim) = inner.policy.evict() else {
          return SetResult {
            admitted: false,
            evicted,
          };
        };
        if inner.store.remove(&victim).is_some() {
          evicted += 1;
        } else {
          // The policy handed back a key the store no longer has. Bounded
          // drift must not turn into a livelock.
          attempts += 1;
          if attempts > self.capacity {
            return SetResult {
              admitted: false,
              evicted,
            };
          }
        }
      }
    }

    inner.store.insert(key.clone(), entry);
    if exists {
      inner.policy.on_hit(&key);
    } else {
      inner.policy.on_set(key);
    }
    SetResult {
      admitted: true,
      evicted,
    }
  }

  pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> {
    let mut inner = self.inner.write();
    let now = self.clock.now();

    let (expired, value) = match inner.store.get(key) {
      None => return None,
      Some(entry) => (self.ttl_enabled() && entry.is_expired(now), entry.value()),
    };

    if expired {
      inner.store.remove(key);
      inner.policy.on_del(key);
      inner.expiry.remove(key);
      self.len.store(inner.store.len(), Ordering::Relaxed);
      return None;
    }

    if self.ttl_enabled() {
      // Only hits pay for cleanup; misses return untouched above.
      Self::sweep_locked(&mut inner, HIT_SWEEP_BUDGET);
      self.len.store(inner.store.len(), Ordering::Relaxed);
    }

    inner.policy.on_hit(key);
    Some(value)
  }

  /// Read-only lookup: no policy effects, no cleanup, no expiration check.
  /// Returns the stored value even if it has expired.
  pub(crate) fn peek(&self, key: &K) -> Option<Arc<V>> {
    let inner = self.inner.read();
    inner.store.get(key).map(CacheEntry::value)
  }

  /// Removes `key` if present. Its expiry entry stays behind to be reaped
  /// as a ghost.
  pub(crate) fn invalidate(&self, key: &K) -> bool {
    let mut inner = self.inner.write();
    if inner.store.remove(key).is_some() {
      inner.policy.on_del(key);
      self.len.store(inner.store.len(), Ordering::Relaxed);
      true
    } else {
      false
    }
  }

  pub(crate) fn clear(&self) {
    let mut inner = self.inner.write();
    inner.store.clear();
    inner.policy.reset();
    inner.expiry.reset();
    self.len.store(0, Ordering::Relaxed);
  }

  /// Reaps every expired head and reports the next deadline so the
  /// janitor can reschedule its wake-up.
  pub(crate) fn sweep_expired(&self) -> (u64, Option<Instant>) {
    let mut inner = self.inner.write();
    let reaped = Self::sweep_locked(&mut inner, usize::MAX);
    self.len.store(inner.store.len(), Ordering::Relaxed);
    let next_deadline = inner.expiry.peek().map(|entry| entry.expires_at);
    (reaped, next_deadline)
  }

  // Pops up to `budget` expired heads; keys still stored are deleted.
  // Ghost entries spend budget without counting toward the total.
  fn sweep_locked(inner: &mut ShardInner<K, V>, budget: usize) -> u64 {
    let mut reaped = 0;
    for _ in 0..budget {
      if !inner.expiry.has_expired() {
        break;
      }
      let Some(victim) = inner.expiry.pop_min() else {
        break;
      };
      if inner.store.remove(&victim.key).is_some() {
        inner.policy.on_del(&victim.key);
        reaped += 1;
      }
    }
    reaped
  }

  /// Asserts the cross-index invariants that must hold between operations:
  /// store and policy track the same keys, capacity is respected, every
  /// stored key is scheduled for expiry, and the heap is well-formed.
  #[cfg(test)]
  pub(crate) fn validate(&self) {
    let inner = self.inner.read();
    assert_eq!(
      inner.store.len(),
      inner.policy.len(),
      "store and policy out of sync"
    );
    if self.capacity > 0 {
      assert!(inner.store.len() <= self.capacity, "store over capacity");
    }
    if self.ttl_enabled() {
      for key in inner.store.keys() {
        assert!(
          inner.expiry.contains(key),
          "stored key missing from the expiry queue"
        );
      }
    }
    inner.expiry.check_invariants();
    assert_eq!(self.len.load(Ordering::Relaxed), inner.store.len());
  }
}
