use std::collections::HashMap;
use std::hash::Hash;

use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K> {
  key: K,
  prev: Option<Index>,
  next: Option<Index>,
}

/// A doubly linked recency list over arena-allocated nodes.
///
/// The arena owns the nodes; the list itself is only prev/next handles, and
/// the lookup map resolves a key to its handle in O(1). Head is the most
/// recently used key, tail the least.
#[derive(Debug)]
pub(super) struct LruList<K: Eq + Hash + Clone> {
  nodes: Arena<Node<K>>,
  lookup: HashMap<K, Index>,
  head: Option<Index>,
  tail: Option<Index>,
}

impl<K: Eq + Hash + Clone> LruList<K> {
  pub(super) fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::new(),
      head: None,
      tail: None,
    }
  }

  pub(super) fn len(&self) -> usize {
    self.lookup.len()
  }

  /// Inserts `key` at the front, or moves it there if already tracked.
  pub(super) fn push_front(&mut self, key: K) {
    if self.lookup.contains_key(&key) {
      self.move_to_front(&key);
      return;
    }
    let index = self.nodes.insert(Node {
      key: key.clone(),
      prev: None,
      next: None,
    });
    self.lookup.insert(key, index);
    self.attach_front(index);
  }

  pub(super) fn move_to_front(&mut self, key: &K) {
    if let Some(&index) = self.lookup.get(key) {
      if self.head != Some(index) {
        self.detach(index);
        self.attach_front(index);
      }
    }
  }

  /// Removes and returns the least recently used key.
  pub(super) fn pop_back(&mut self) -> Option<K> {
    let tail = self.tail?;
    let key = self.nodes[tail].key.clone();
    self.remove(&key);
    Some(key)
  }

  pub(super) fn remove(&mut self, key: &K) -> bool {
    match self.lookup.remove(key) {
      Some(index) => {
        self.detach(index);
        self.nodes.remove(index);
        true
      }
      None => false,
    }
  }

  pub(super) fn clear(&mut self) {
    self.nodes.clear();
    self.lookup.clear();
    self.head = None;
    self.tail = None;
  }

  fn attach_front(&mut self, index: Index) {
    let old_head = self.head;
    {
      let node = &mut self.nodes[index];
      node.prev = None;
      node.next = old_head;
    }
    if let Some(old) = old_head {
      self.nodes[old].prev = Some(index);
    }
    self.head = Some(index);
    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  fn detach(&mut self, index: Index) {
    let (prev, next) = {
      let node = &self.nodes[index];
      (node.prev, node.next)
    };
    match prev {
      Some(p) => self.nodes[p].next = next,
      None => self.head = next,
    }
    match next {
      Some(n) => self.nodes[n].prev = prev,
      None => self.tail = prev,
    }
  }

  // Test helper: keys from most to least recently used.
  #[cfg(test)]
  pub(super) fn keys_front_to_back(&self) -> Vec<K> {
    let mut keys = Vec::with_capacity(self.lookup.len());
    let mut cursor = self.head;
    while let Some(index) = cursor {
      keys.push(self.nodes[index].key.clone());
      cursor = self.nodes[index].next;
    }
    keys
  }
}
