//! A sharded, in-process key/value cache for high-concurrency workloads.
//!
//! Keys are routed to independently locked shards by a seeded 64-bit hash,
//! so distinct keys rarely contend. Each shard coordinates three indices
//! under one lock: the primary store, an eviction policy (FIFO or LRU),
//! and an expiration priority queue. Expired entries are reclaimed on the
//! read that finds them, opportunistically on hits, and in the background
//! by one janitor thread per shard.
//!
//! ```
//! use std::time::Duration;
//! use tessera_cache::{CacheBuilder, PolicyKind};
//!
//! let cache = CacheBuilder::new()
//!   .capacity(10_000)
//!   .shards(16)
//!   .policy(PolicyKind::Lru)
//!   .default_ttl(Duration::from_secs(60))
//!   .build()
//!   .unwrap();
//!
//! cache.insert("session:1", 42u32);
//! assert_eq!(cache.get(&"session:1").as_deref(), Some(&42));
//! ```

mod builder;
mod cache;
mod entry;
mod error;
mod expiry;
mod hasher;
mod metrics;
mod policy;
mod shard;
mod task;
mod time;

pub use builder::CacheBuilder;
pub use cache::Cache;
pub use error::BuildError;
pub use hasher::{CacheKey, DefaultKeyWriter, KeyHasher, KeyWriter};
pub use metrics::MetricsSnapshot;
pub use policy::PolicyKind;
pub use shard::SetResult;
pub use time::Clock;
