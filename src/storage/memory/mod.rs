//! In-memory KvStore implementation.
//!
//! Mirrors JetStream KV semantics closely enough for tests and local
//! development: keys are validated against the same alphabet, the first
//! write of a key gets revision 1 and every successful write increments it
//! by one, and deleting a key forgets its revision.
//!
//! Failure toggles let tests simulate an unreachable or misbehaving store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{KvEntry, KvStore, Result, Revision, StoreError};

#[derive(Debug, Clone)]
struct StoredValue {
    value: Bytes,
    revision: Revision,
}

/// In-memory versioned KV store.
#[derive(Default)]
pub struct MemoryKvStore {
    name: String,
    entries: RwLock<BTreeMap<String, StoredValue>>,
    fail_on_get: RwLock<bool>,
    fail_on_put: RwLock<bool>,
    fail_on_delete: RwLock<bool>,
    fail_on_list: RwLock<bool>,
    unavailable: RwLock<bool>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        *self.fail_on_get.write().await = fail;
    }

    pub async fn set_fail_on_put(&self, fail: bool) {
        *self.fail_on_put.write().await = fail;
    }

    pub async fn set_fail_on_delete(&self, fail: bool) {
        *self.fail_on_delete.write().await = fail;
    }

    pub async fn set_fail_on_list(&self, fail: bool) {
        *self.fail_on_list.write().await = fail;
    }

    /// Make every operation fail with `Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    async fn check(&self, toggle: &RwLock<bool>, operation: &str) -> Result<()> {
        if *self.unavailable.read().await {
            return Err(StoreError::Unavailable(format!(
                "memory store {} is unavailable",
                self.name
            )));
        }
        if *toggle.read().await {
            return Err(StoreError::Backend(format!(
                "injected {} failure in memory store {}",
                operation, self.name
            )));
        }
        Ok(())
    }
}

/// Validate a key against the JetStream KV key rules.
///
/// Keys are non-empty, use only `[-/_=.a-zA-Z0-9]`, and have no empty
/// `.`-separated tokens.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key cannot be empty".to_string()));
    }
    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | '_' | '=' | '.')))
    {
        return Err(StoreError::InvalidKey(format!(
            "key {:?} contains illegal character {:?}",
            key, c
        )));
    }
    if key.split('.').any(str::is_empty) {
        return Err(StoreError::InvalidKey(format!(
            "key {:?} contains an empty token",
            key
        )));
    }
    Ok(())
}

#[async_trait]
impl KvStore for MemoryKvStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        self.check(&self.fail_on_list, "list").await?;
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<KvEntry> {
        self.check(&self.fail_on_get, "get").await?;
        validate_key(key)?;

        let entries = self.entries.read().await;
        let stored = entries
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        Ok(KvEntry {
            key: key.to_string(),
            value: stored.value.clone(),
            revision: stored.revision,
        })
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<Revision> {
        self.check(&self.fail_on_put, "put").await?;
        validate_key(key)?;

        let mut entries = self.entries.write().await;
        let revision = entries
            .get(key)
            .map(|stored| Revision(stored.revision.0 + 1))
            .unwrap_or(Revision(1));
        entries.insert(key.to_string(), StoredValue { value, revision });
        Ok(revision)
    }

    async fn update(&self, key: &str, value: Bytes, expected: Revision) -> Result<Revision> {
        self.check(&self.fail_on_put, "update").await?;
        validate_key(key)?;

        let mut entries = self.entries.write().await;
        let stored = entries
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if stored.revision != expected {
            return Err(StoreError::WrongLastSequence {
                key: key.to_string(),
                expected,
            });
        }

        stored.value = value;
        stored.revision = Revision(stored.revision.0 + 1);
        Ok(stored.revision)
    }

    async fn delete(&self, key: &str, expected: Option<Revision>) -> Result<()> {
        self.check(&self.fail_on_delete, "delete").await?;
        validate_key(key)?;

        let mut entries = self.entries.write().await;
        let current = entries
            .get(key)
            .map(|stored| stored.revision)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if let Some(expected) = expected {
            if current != expected {
                return Err(StoreError::WrongLastSequence {
                    key: key.to_string(),
                    expected,
                });
            }
        }

        entries.remove(key);
        Ok(())
    }
}
