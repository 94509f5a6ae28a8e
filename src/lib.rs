//! meeting-kv - versioned key-value repositories for meeting data
//!
//! Persists meeting-domain entities in a store that offers only single-key
//! get / put / compare-and-swap / delete with a revision per key (NATS
//! JetStream KV in production). On top of that it provides entity
//! repositories with optimistic concurrency and hand-maintained secondary
//! indexes that tolerate partial failure.

pub mod config;
pub mod entities;
pub mod keys;
pub mod repository;
pub mod storage;
pub mod utils;
