use super::EvictionPolicy;

use std::collections::VecDeque;

/// First-in, first-out: victims leave in insertion order.
#[derive(Debug)]
pub(crate) struct Fifo<K> {
  keys: VecDeque<K>,
}

impl<K> Fifo<K> {
  pub(crate) fn new() -> Self {
    Self {
      keys: VecDeque::new(),
    }
  }
}

impl<K> EvictionPolicy<K> for Fifo<K>
where
  K: PartialEq + Send + Sync,
{
  /// Reads do not reorder a FIFO queue.
  fn on_hit(&mut self, _key: &K) {}

  fn on_set(&mut self, key: K) {
    self.keys.push_back(key);
  }

  /// Removes the first occurrence. The queue holds one shard's slice of
  /// the keyspace, so the linear scan stays short.
  fn on_del(&mut self, key: &K) {
    if let Some(pos) = self.keys.iter().position(|k| k == key) {
      self.keys.remove(pos);
    }
  }

  fn evict(&mut self) -> Option<K> {
    self.keys.pop_front()
  }

  fn reset(&mut self) {
    self.keys.clear();
  }

  fn len(&self) -> usize {
    self.keys.len()
  }
}
