//! Shared repository integration tests.
//!
//! Tests the KvStore contract and the repository layer built on it against
//! every store implementation. Each backend test binary imports these
//! functions and runs them through the `run_*_tests!` macros.
//!
//! Stores are shared across the functions of one run, so every test works on
//! its own keys and makes relative assertions about revisions (JetStream
//! revisions are bucket-wide sequence numbers, not per-key counters).

pub mod kv_store_tests;
pub mod repository_tests;
