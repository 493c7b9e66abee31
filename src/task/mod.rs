//! Background workers: the per-shard janitor that sweeps expired entries.

pub(crate) mod janitor;
