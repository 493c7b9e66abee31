use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Thread-safe counters for cache activity.
///
/// All fields are relaxed atomics: increments are lock-free and are not
/// synchronized with the mutations they describe, so a reader may observe
/// a hit counted before the entry shows up in `len()`. Counters never
/// decrease.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,
  pub(crate) evictions: CachePadded<AtomicU64>,
  pub(crate) invalidations: CachePadded<AtomicU64>,
  pub(crate) clears: CachePadded<AtomicU64>,
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let lookups = hits + misses;
    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if lookups == 0 {
        0.0
      } else {
        hits as f64 / lookups as f64
      },
      evictions: self.evictions.load(Ordering::Relaxed),
      invalidations: self.invalidations.load(Ordering::Relaxed),
      clears: self.clears.load(Ordering::Relaxed),
    }
  }
}

/// A point-in-time view of the cache's counters.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Lookups that returned a live entry.
  pub hits: u64,
  /// Lookups that found nothing, or found only an expired entry.
  pub misses: u64,
  /// hits / (hits + misses); zero before the first lookup.
  pub hit_ratio: f64,
  /// Entries removed by capacity pressure.
  pub evictions: u64,
  /// Entries removed explicitly via `invalidate`.
  pub invalidations: u64,
  /// Completed `clear` calls.
  pub clears: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("evictions", &self.evictions)
      .field("invalidations", &self.invalidations)
      .field("clears", &self.clears)
      .finish()
  }
}
