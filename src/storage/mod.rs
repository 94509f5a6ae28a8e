//! Versioned key-value store clients.
//!
//! The repository layer talks to its backing store only through the
//! [`KvStore`] trait: single-key get / put / compare-and-swap update /
//! delete plus key enumeration, with a [`Revision`] attached to every key.
//! There are no multi-key transactions.
//!
//! Implementations:
//! - [`memory::MemoryKvStore`]: in-process map (tests, local development)
//! - `nats::NatsKvStore`: NATS JetStream KV bucket (feature `nats`)

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{StorageConfig, StorageType};

pub mod memory;

#[cfg(feature = "nats")]
pub mod nats;

pub use memory::MemoryKvStore;

/// Store-assigned version of a key.
///
/// Monotonic per key. Treat as an opaque token: compare it, hand it back on
/// update/delete, never do arithmetic on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    /// Raw revision number as reported by the store.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A live key with its current value and revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub value: Bytes,
    pub revision: Revision,
}

/// Errors reported by store clients.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Wrong last sequence for {key}: expected revision {expected}")]
    WrongLastSequence { key: String, expected: Revision },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Single-key versioned KV operations.
///
/// Implementations must be safe for unsynchronized concurrent use; all
/// consistency under concurrent writers comes from the revision check in
/// [`update`](KvStore::update) and [`delete`](KvStore::delete).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Bucket or namespace name, for diagnostics.
    fn name(&self) -> &str;

    /// All live keys.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Current value and revision. `NotFound` if absent or deleted.
    async fn get(&self, key: &str) -> Result<KvEntry>;

    /// Unconditional write. Returns the new revision.
    async fn put(&self, key: &str, value: Bytes) -> Result<Revision>;

    /// Write only if the key's current revision equals `expected`.
    ///
    /// `NotFound` if the key is absent, `WrongLastSequence` on mismatch.
    async fn update(&self, key: &str, value: Bytes, expected: Revision) -> Result<Revision>;

    /// Delete, optionally conditioned on `expected`.
    ///
    /// `NotFound` if the key is absent (backends that cannot tell may return
    /// `Ok` for unconditional deletes), `WrongLastSequence` on mismatch.
    async fn delete(&self, key: &str, expected: Option<Revision>) -> Result<()>;
}

/// Store handles keyed by entity type.
///
/// Each entity type normally gets its own bucket. An entity type without a
/// store is served by a detached repository.
#[derive(Clone, Default)]
pub struct StoreSet {
    stores: BTreeMap<String, Arc<dyn KvStore>>,
}

impl StoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// One fresh in-memory store per entity type.
    pub fn memory(entity_types: &[&str]) -> Self {
        let mut set = Self::new();
        for entity_type in entity_types {
            set.insert(entity_type, Arc::new(MemoryKvStore::with_name(*entity_type)));
        }
        set
    }

    pub fn insert(&mut self, entity_type: &str, store: Arc<dyn KvStore>) {
        self.stores.insert(entity_type.to_string(), store);
    }

    pub fn get(&self, entity_type: &str) -> Option<Arc<dyn KvStore>> {
        self.stores.get(entity_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

/// Initialize stores based on configuration.
///
/// Returns one store per configured bucket. Entity types whose bucket is
/// unset are left out of the set.
pub async fn init_storage(config: &StorageConfig) -> Result<StoreSet> {
    info!("Storage: {:?}", config.storage_type);

    match config.storage_type {
        StorageType::Memory => {
            let mut set = StoreSet::new();
            for (entity_type, bucket) in config.buckets.entries() {
                if let Some(bucket) = bucket {
                    set.insert(entity_type, Arc::new(MemoryKvStore::with_name(bucket)));
                }
            }
            Ok(set)
        }
        #[cfg(feature = "nats")]
        StorageType::Nats => nats::init_stores(config).await,
        #[cfg(not(feature = "nats"))]
        StorageType::Nats => {
            tracing::error!("NATS storage requested but 'nats' feature is not enabled");
            Err(StoreError::Unavailable("NATS feature not enabled".to_string()))
        }
    }
}
