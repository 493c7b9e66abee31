//! The expiration priority queue.
//!
//! A binary min-heap ordered by `(expires_at, seq)` with a key-to-position
//! side table, so rescheduling and removal by key stay O(log n). `seq` is a
//! strictly monotonic tie-breaker: among entries sharing a deadline, the
//! one scheduled first expires first, and a key whose deadline is pushed
//! forward orders after peers that already share the new deadline.

use crate::time::Clock;

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// One scheduled expiration.
#[derive(Debug, Clone)]
pub(crate) struct ExpiryEntry<K> {
  pub(crate) key: K,
  pub(crate) expires_at: Instant,
  seq: u64,
}

pub(crate) struct ExpiryQueue<K> {
  heap: Vec<ExpiryEntry<K>>,
  positions: HashMap<K, usize>,
  default_ttl: Duration,
  clock: Clock,
  seq: u64,
}

impl<K> ExpiryQueue<K>
where
  K: Eq + Hash + Clone,
{
  pub(crate) fn new(default_ttl: Duration, clock: Clock) -> Self {
    Self {
      heap: Vec::new(),
      positions: HashMap::new(),
      default_ttl,
      clock,
      seq: 0,
    }
  }

  /// Schedules `key` to expire `ttl` from now, inserting or rescheduling.
  pub(crate) fn push_with_ttl(&mut self, key: K, ttl: Duration) {
    if self.update(&key, ttl) {
      return;
    }
    let expires_at = self.clock.now() + ttl;
    self.seq += 1;
    let pos = self.heap.len();
    self.heap.push(ExpiryEntry {
      key: key.clone(),
      expires_at,
      seq: self.seq,
    });
    self.positions.insert(key, pos);
    self.sift_up(pos);
  }

  /// Schedules `key` with the queue's default TTL.
  pub(crate) fn push_std(&mut self, key: K) {
    let ttl = self.default_ttl;
    self.push_with_ttl(key, ttl);
  }

  /// The entry that expires earliest, without removing it.
  pub(crate) fn peek(&self) -> Option<&ExpiryEntry<K>> {
    self.heap.first()
  }

  /// Whether the earliest entry has expired. The comparison is inclusive:
  /// a deadline equal to now counts as expired.
  pub(crate) fn has_expired(&self) -> bool {
    match self.heap.first() {
      Some(entry) => entry.expires_at <= self.clock.now(),
      None => false,
    }
  }

  /// Removes and returns the entry that expires earliest.
  pub(crate) fn pop_min(&mut self) -> Option<ExpiryEntry<K>> {
    if self.heap.is_empty() {
      return None;
    }
    let last = self.heap.len() - 1;
    self.heap.swap(0, last);
    let entry = self.heap.pop()?;
    self.positions.remove(&entry.key);
    if !self.heap.is_empty() {
      self.sync_position(0);
      self.sift_down(0);
    }
    Some(entry)
  }

  /// Reschedules `key` to expire `ttl` from now; false when absent.
  pub(crate) fn update(&mut self, key: &K, ttl: Duration) -> bool {
    let Some(pos) = self.positions.get(key).copied() else {
      return false;
    };
    self.heap[pos].expires_at = self.clock.now() + ttl;
    self.seq += 1;
    self.heap[pos].seq = self.seq;
    self.resift(pos);
    true
  }

  /// Drops the entry for `key`; false when absent.
  pub(crate) fn remove(&mut self, key: &K) -> bool {
    let Some(pos) = self.positions.remove(key) else {
      return false;
    };
    let last = self.heap.len() - 1;
    self.heap.swap(pos, last);
    self.heap.pop();
    if pos < self.heap.len() {
      self.sync_position(pos);
      self.resift(pos);
    }
    true
  }

  /// Clears the queue and restarts the sequence counter.
  pub(crate) fn reset(&mut self) {
    self.heap.clear();
    self.positions.clear();
    self.seq = 0;
  }

  fn precedes(a: &ExpiryEntry<K>, b: &ExpiryEntry<K>) -> bool {
    (a.expires_at, a.seq) < (b.expires_at, b.seq)
  }

  // Re-point the side table at an entry's current slot.
  fn sync_position(&mut self, pos: usize) {
    let key = self.heap[pos].key.clone();
    self.positions.insert(key, pos);
  }

  // An entry whose deadline changed may need to move either way.
  fn resift(&mut self, pos: usize) {
    let settled = self.sift_up(pos);
    self.sift_down(settled);
  }

  fn sift_up(&mut self, mut pos: usize) -> usize {
    while pos > 0 {
      let parent = (pos - 1) / 2;
      if Self::precedes(&self.heap[pos], &self.heap[parent]) {
        self.heap.swap(pos, parent);
        self.sync_position(pos);
        self.sync_position(parent);
        pos = parent;
      } else {
        break;
      }
    }
    pos
  }

  fn sift_down(&mut self, mut pos: usize) {
    loop {
      let left = 2 * pos + 1;
      if left >= self.heap.len() {
        break;
      }
      let right = left + 1;
      let mut smallest = left;
      if right < self.heap.len() && Self::precedes(&self.heap[right], &self.heap[left]) {
        smallest = right;
      }
      if Self::precedes(&self.heap[smallest], &self.heap[pos]) {
        self.heap.swap(pos, smallest);
        self.sync_position(pos);
        self.sync_position(smallest);
        pos = smallest;
      } else {
        break;
      }
    }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.heap.len()
  }

  #[cfg(test)]
  pub(crate) fn contains(&self, key: &K) -> bool {
    self.positions.contains_key(key)
  }

  // Entries anywhere in the heap whose deadline has passed.
  #[cfg(test)]
  pub(crate) fn expired_count(&self) -> usize {
    let now = self.clock.now();
    self
      .heap
      .iter()
      .filter(|entry| entry.expires_at <= now)
      .count()
  }

  /// Asserts the structural invariants: the side table mirrors the heap
  /// exactly, and every parent precedes its children.
  #[cfg(test)]
  pub(crate) fn check_invariants(&self) {
    assert_eq!(
      self.heap.len(),
      self.positions.len(),
      "side table and heap disagree on size"
    );
    for (pos, entry) in self.heap.iter().enumerate() {
      assert_eq!(
        self.positions.get(&entry.key),
        Some(&pos),
        "side table points at the wrong slot"
      );
      if pos > 0 {
        let parent = &self.heap[(pos - 1) / 2];
        assert!(
          !Self::precedes(entry, parent),
          "min-heap property violated at slot {pos}"
        );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::time::test_support::ManualClock;

  use std::time::Duration;

  fn frozen_queue(default_ttl: Duration) -> (ExpiryQueue<i32>, ManualClock) {
    let manual = ManualClock::new();
    let queue = ExpiryQueue::new(default_ttl, manual.clock());
    (queue, manual)
  }

  #[test]
  fn pops_in_deadline_order() {
    let (mut queue, _manual) = frozen_queue(Duration::from_secs(60));
    queue.push_with_ttl(1, Duration::from_millis(300));
    queue.push_with_ttl(2, Duration::from_millis(100));
    queue.push_with_ttl(3, Duration::from_millis(200));
    queue.check_invariants();

    assert_eq!(queue.pop_min().map(|e| e.key), Some(2));
    assert_eq!(queue.pop_min().map(|e| e.key), Some(3));
    assert_eq!(queue.pop_min().map(|e| e.key), Some(1));
    assert_eq!(queue.pop_min().map(|e| e.key), None);
  }

  #[test]
  fn equal_deadlines_break_ties_by_schedule_order() {
    let (mut queue, _manual) = frozen_queue(Duration::from_millis(100));
    for key in 0..8 {
      queue.push_std(key);
    }
    queue.check_invariants();

    for key in 0..8 {
      assert_eq!(queue.pop_min().map(|e| e.key), Some(key));
    }
  }

  #[test]
  fn rescheduling_bumps_the_sequence() {
    let (mut queue, _manual) = frozen_queue(Duration::from_millis(100));
    queue.push_std(1);
    queue.push_std(2);

    // Re-scheduling key 1 onto the same deadline orders it after key 2.
    queue.push_std(1);
    queue.check_invariants();

    assert_eq!(queue.len(), 2, "reschedule must not duplicate the key");
    assert_eq!(queue.pop_min().map(|e| e.key), Some(2));
    assert_eq!(queue.pop_min().map(|e| e.key), Some(1));
  }

  #[test]
  fn update_moves_an_entry_both_ways() {
    let (mut queue, _manual) = frozen_queue(Duration::from_secs(60));
    queue.push_with_ttl(1, Duration::from_millis(100));
    queue.push_with_ttl(2, Duration::from_millis(200));
    queue.push_with_ttl(3, Duration::from_millis(300));

    assert!(queue.update(&1, Duration::from_millis(500)));
    assert!(queue.update(&3, Duration::from_millis(50)));
    assert!(!queue.update(&99, Duration::from_millis(50)));
    queue.check_invariants();

    assert_eq!(queue.pop_min().map(|e| e.key), Some(3));
    assert_eq!(queue.pop_min().map(|e| e.key), Some(2));
    assert_eq!(queue.pop_min().map(|e| e.key), Some(1));
  }

  #[test]
  fn remove_by_key_keeps_the_heap_consistent() {
    let (mut queue, _manual) = frozen_queue(Duration::from_secs(60));
    for key in 0..16 {
      queue.push_with_ttl(key, Duration::from_millis(100 + key as u64 * 10));
    }

    assert!(queue.remove(&0));
    assert!(queue.remove(&7));
    assert!(queue.remove(&15));
    assert!(!queue.remove(&7));
    queue.check_invariants();

    assert_eq!(queue.len(), 13);
    assert!(!queue.contains(&7));
    assert_eq!(queue.pop_min().map(|e| e.key), Some(1));
  }

  #[test]
  fn has_expired_is_inclusive() {
    let (mut queue, manual) = frozen_queue(Duration::from_millis(100));
    queue.push_std(1);

    assert!(!queue.has_expired());
    manual.advance(Duration::from_millis(99));
    assert!(!queue.has_expired());
    manual.advance(Duration::from_millis(1));
    assert!(queue.has_expired(), "a deadline equal to now is expired");
  }

  #[test]
  fn has_expired_on_empty_is_false() {
    let (queue, _manual) = frozen_queue(Duration::from_millis(100));
    assert!(!queue.has_expired());
  }

  #[test]
  fn reset_clears_state_and_sequence() {
    let (mut queue, _manual) = frozen_queue(Duration::from_millis(100));
    queue.push_std(1);
    queue.push_std(2);

    queue.reset();

    assert_eq!(queue.len(), 0);
    assert_eq!(queue.seq, 0);
    queue.push_std(3);
    assert_eq!(queue.seq, 1, "sequence restarts after reset");
    queue.check_invariants();
  }

  #[test]
  fn interleaved_operations_hold_the_invariants() {
    let (mut queue, manual) = frozen_queue(Duration::from_millis(50));
    for round in 0u64..40 {
      let key = (round % 13) as i32;
      match round % 4 {
        0 => queue.push_std(key),
        1 => queue.push_with_ttl(key, Duration::from_millis(round * 7)),
        2 => {
          queue.remove(&key);
        }
        _ => {
          if queue.has_expired() {
            queue.pop_min();
          }
          manual.advance(Duration::from_millis(11));
        }
      }
      queue.check_invariants();
    }
  }
}
