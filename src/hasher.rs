use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

use ahash::RandomState;

/// Writes a canonical byte representation of a key into a hash sink.
///
/// The writer must be deterministic: a key must always produce the same
/// byte stream, or shard routing falls apart. Implement this for key types
/// the default encoding does not cover.
pub trait KeyWriter<K>: Send + Sync {
  fn write_key(&self, sink: &mut dyn Hasher, key: &K);
}

/// Key types the default writer knows how to encode.
///
/// Integers and floats are written as their little-endian byte patterns
/// (floats by bit pattern, so `-0.0` and `0.0` hash apart), booleans as a
/// single byte, strings and byte buffers verbatim.
pub trait CacheKey {
  fn write_bytes(&self, sink: &mut dyn Hasher);
}

macro_rules! int_cache_key {
  ($($t:ty),* $(,)?) => {
    $(
      impl CacheKey for $t {
        #[inline]
        fn write_bytes(&self, sink: &mut dyn Hasher) {
          sink.write(&self.to_le_bytes());
        }
      }
    )*
  };
}

int_cache_key!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl CacheKey for f32 {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(&self.to_bits().to_le_bytes());
  }
}

impl CacheKey for f64 {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(&self.to_bits().to_le_bytes());
  }
}

impl CacheKey for bool {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(&[*self as u8]);
  }
}

impl CacheKey for char {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(&(*self as u32).to_le_bytes());
  }
}

impl CacheKey for &str {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(self.as_bytes());
  }
}

impl CacheKey for String {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(self.as_bytes());
  }
}

impl CacheKey for [u8; 16] {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(self);
  }
}

impl CacheKey for Vec<u8> {
  #[inline]
  fn write_bytes(&self, sink: &mut dyn Hasher) {
    sink.write(self);
  }
}

/// The default key encoder: delegates to [`CacheKey`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultKeyWriter;

impl<K: CacheKey> KeyWriter<K> for DefaultKeyWriter {
  #[inline]
  fn write_key(&self, sink: &mut dyn Hasher, key: &K) {
    key.write_bytes(sink);
  }
}

/// Maps keys to stable 64-bit digests.
///
/// Each instance carries its own random seed, fixed at construction: the
/// digest for a key is stable for the lifetime of the instance and
/// uniformly distributed for well-distributed keys, but differs between
/// instances (and between process runs).
pub struct KeyHasher<K> {
  state: RandomState,
  writer: Arc<dyn KeyWriter<K>>,
}

impl<K: CacheKey> KeyHasher<K> {
  /// A hasher using the default canonical-bytes encoding.
  pub fn new() -> Self {
    Self::with_writer(DefaultKeyWriter)
  }
}

impl<K: CacheKey> Default for KeyHasher<K> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K> KeyHasher<K> {
  /// A hasher with a custom key encoding.
  pub fn with_writer<W>(writer: W) -> Self
  where
    W: KeyWriter<K> + 'static,
  {
    Self {
      state: RandomState::new(),
      writer: Arc::new(writer),
    }
  }

  /// Hashes a key to a 64-bit digest.
  pub fn hash(&self, key: &K) -> u64 {
    let mut sink = self.state.build_hasher();
    self.writer.write_key(&mut sink, key);
    sink.finish()
  }
}

impl<K> Clone for KeyHasher<K> {
  fn clone(&self) -> Self {
    Self {
      state: self.state.clone(),
      writer: self.writer.clone(),
    }
  }
}

impl<K> fmt::Debug for KeyHasher<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("KeyHasher(..)")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::collections::HashSet;

  #[test]
  fn digest_is_stable_within_an_instance() {
    let hasher = KeyHasher::<u64>::new();
    for key in [0u64, 1, 42, u64::MAX] {
      assert_eq!(hasher.hash(&key), hasher.hash(&key));
    }
  }

  #[test]
  fn instances_are_seeded_independently() {
    let a = KeyHasher::<u64>::new();
    let b = KeyHasher::<u64>::new();
    let differs = (0u64..16).any(|key| a.hash(&key) != b.hash(&key));
    assert!(differs, "two hashers agreed on 16 keys; seeds are not random");
  }

  #[test]
  fn shard_mask_covers_every_shard() {
    let hasher = KeyHasher::<i64>::new();
    let mut seen = HashSet::new();
    for key in 0i64..4096 {
      seen.insert(hasher.hash(&key) as usize & 15);
    }
    assert_eq!(seen.len(), 16, "some shard was never selected");
  }

  #[test]
  fn string_and_float_keys_hash() {
    let strings = KeyHasher::<&str>::new();
    assert_eq!(strings.hash(&"alpha"), strings.hash(&"alpha"));
    assert_ne!(strings.hash(&"alpha"), strings.hash(&"beta"));

    let floats = KeyHasher::<f64>::new();
    assert_ne!(floats.hash(&0.0), floats.hash(&-0.0));
  }

  #[test]
  fn custom_writer_controls_the_encoding() {
    struct ConstantWriter;
    impl KeyWriter<u32> for ConstantWriter {
      fn write_key(&self, sink: &mut dyn Hasher, _key: &u32) {
        sink.write(&[0xab]);
      }
    }

    let hasher = KeyHasher::with_writer(ConstantWriter);
    assert_eq!(hasher.hash(&1), hasher.hash(&2));
  }
}
