use super::lru_list::LruList;
use super::EvictionPolicy;

use std::hash::Hash;

/// Least recently used: reads refresh a key, victims come from the cold
/// end. All operations are O(1).
#[derive(Debug)]
pub(crate) struct Lru<K: Eq + Hash + Clone> {
  list: LruList<K>,
}

impl<K: Eq + Hash + Clone> Lru<K> {
  pub(crate) fn new() -> Self {
    Self {
      list: LruList::new(),
    }
  }
}

impl<K> EvictionPolicy<K> for Lru<K>
where
  K: Eq + Hash + Clone + Send + Sync,
{
  fn on_hit(&mut self, key: &K) {
    self.list.move_to_front(key);
  }

  fn on_set(&mut self, key: K) {
    self.list.push_front(key);
  }

  fn on_del(&mut self, key: &K) {
    self.list.remove(key);
  }

  fn evict(&mut self) -> Option<K> {
    self.list.pop_back()
  }

  fn reset(&mut self) {
    self.list.clear();
  }

  fn len(&self) -> usize {
    self.list.len()
  }
}
