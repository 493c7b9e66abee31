use tessera_cache::{Cache, CacheBuilder, PolicyKind};

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const THREADS: usize = 8;

#[test]
fn random_op_mix_holds_the_public_invariants() {
  const OPS_PER_THREAD: usize = 30_000;
  const KEY_SPACE: i64 = 10_000;
  const CAPACITY: usize = 4_096;

  let cache: Cache<i64, i64> = CacheBuilder::new()
    .capacity(CAPACITY)
    .shards(64)
    .policy(PolicyKind::Lru)
    .build()
    .unwrap();

  let lookups = AtomicU64::new(0);

  thread::scope(|scope| {
    for seed in 0..THREADS as u64 {
      let cache = &cache;
      let lookups = &lookups;
      scope.spawn(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..OPS_PER_THREAD {
          let key = rng.gen_range(0..KEY_SPACE);
          match rng.gen_range(0..6) {
            0..=2 => {
              let result = cache.insert(key, key * 3);
              assert!(result.admitted, "a healthy policy always finds victims");
            }
            3..=4 => {
              if let Some(found) = cache.get(&key) {
                assert_eq!(*found, key * 3, "values never cross keys");
              }
              lookups.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
              cache.invalidate(&key);
            }
          }
        }
      });
    }
  });

  assert!(cache.len() <= CAPACITY);

  let metrics = cache.metrics();
  assert_eq!(
    metrics.hits + metrics.misses,
    lookups.load(Ordering::Relaxed),
    "every lookup lands in exactly one counter"
  );
}

#[test]
fn concurrent_writers_on_one_key_leave_one_entry() {
  let cache: Cache<u32, u64> = CacheBuilder::new().shards(4).build().unwrap();

  thread::scope(|scope| {
    for writer in 0..THREADS as u64 {
      let cache = &cache;
      scope.spawn(move || {
        for round in 0..1_000 {
          cache.insert(7, writer * 10_000 + round);
        }
      });
    }
  });

  assert_eq!(cache.len(), 1);
  assert!(cache.get(&7).is_some());
}

#[test]
fn clear_races_with_writers() {
  let cache: Cache<i32, i32> = CacheBuilder::new()
    .capacity(2_048)
    .shards(16)
    .policy(PolicyKind::Fifo)
    .build()
    .unwrap();

  thread::scope(|scope| {
    for offset in 0..THREADS as i32 {
      let cache = &cache;
      scope.spawn(move || {
        for key in 0..5_000 {
          cache.insert(key * THREADS as i32 + offset, key);
        }
      });
    }

    let cache = &cache;
    scope.spawn(move || {
      for _ in 0..20 {
        cache.clear();
        thread::sleep(Duration::from_millis(1));
      }
    });
  });

  assert_eq!(cache.metrics().clears, 20);
  assert!(cache.len() <= 2_048);

  cache.clear();
  assert_eq!(cache.len(), 0);
}

#[test]
fn janitors_keep_up_with_concurrent_traffic() {
  let cache: Cache<i64, i64> = CacheBuilder::new()
    .shards(8)
    .default_ttl(Duration::from_millis(20))
    .janitor_initial_delay(Duration::from_millis(5))
    .build()
    .unwrap();

  thread::scope(|scope| {
    for seed in 0..4u64 {
      let cache = &cache;
      scope.spawn(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..2_000 {
          let key = rng.gen_range(0..500);
          if rng.gen_bool(0.7) {
            cache.insert(key, key);
          } else {
            cache.get(&key);
          }
        }
      });
    }
  });

  // Once the writers stop, every entry ages out and the janitors sweep.
  thread::sleep(Duration::from_millis(500));
  assert_eq!(cache.len(), 0);
}
