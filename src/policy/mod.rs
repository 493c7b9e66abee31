//! Eviction policies: the ordered key index a shard consults for victims.

mod fifo;
mod lru;
mod lru_list;

pub(crate) use fifo::Fifo;
pub(crate) use lru::Lru;

use std::hash::Hash;

/// Selects the eviction policy every shard is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolicyKind {
  /// Evict in insertion order; reads do not reorder.
  #[default]
  Fifo,
  /// Evict the least recently used key; reads refresh recency.
  Lru,
}

/// The ordered index over keys that selects eviction victims.
///
/// Implementations are owned by a shard and called inside its critical
/// section, so methods take `&mut self` and carry no locking of their own.
/// `on_hit` and `on_del` on unknown keys are silent no-ops: the shard's
/// insert protocol briefly lets the policy and the store disagree.
pub(crate) trait EvictionPolicy<K>: Send + Sync {
  /// An existing key was read.
  fn on_hit(&mut self, key: &K);

  /// A new key was inserted.
  fn on_set(&mut self, key: K);

  /// A key was removed.
  fn on_del(&mut self, key: &K);

  /// Removes and returns the next victim, or `None` when empty.
  fn evict(&mut self) -> Option<K>;

  /// Clears all policy state.
  fn reset(&mut self);

  /// Number of tracked keys; used only for validation.
  fn len(&self) -> usize;
}

pub(crate) fn new_policy<K>(kind: PolicyKind) -> Box<dyn EvictionPolicy<K>>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
{
  match kind {
    PolicyKind::Fifo => Box::new(Fifo::new()),
    PolicyKind::Lru => Box::new(Lru::new()),
  }
}
