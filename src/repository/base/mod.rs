//! Generic entity repository.
//!
//! Stores one JSON document per key. Keyed operations take the logical path
//! (`registrant/abc-123`); encoding into the store alphabet happens here.

use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::{Entity, RepositoryError, RepositoryResult};
use crate::keys::{decode_key, encode_key, entity_key};
use crate::storage::{KvStore, Revision};

/// CRUD with revision checks for one entity type.
pub struct EntityRepository<T> {
    store: Option<Arc<dyn KvStore>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> EntityRepository<T> {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store: Some(store),
            _entity: PhantomData,
        }
    }

    /// Repository without a backing store. Every operation fails
    /// `Unavailable`.
    pub fn detached() -> Self {
        Self {
            store: None,
            _entity: PhantomData,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        T::ENTITY_TYPE
    }

    pub fn is_attached(&self) -> bool {
        self.store.is_some()
    }

    /// Logical key of the entity with `uid`.
    pub fn key_for(&self, uid: &str) -> String {
        entity_key(T::ENTITY_TYPE, uid)
    }

    pub(crate) fn store(&self) -> RepositoryResult<&Arc<dyn KvStore>> {
        self.store.as_ref().ok_or_else(|| {
            RepositoryError::Unavailable(format!("no store configured for {}", T::ENTITY_TYPE))
        })
    }

    /// Fetch and decode the entity at `key`.
    #[tracing::instrument(name = "kv.get", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %key))]
    pub async fn get(&self, key: &str) -> RepositoryResult<T> {
        let (entity, _) = self.fetch(&encode_key(key)?).await?;
        Ok(entity)
    }

    /// Fetch and decode the entity at `key` with its current revision.
    #[tracing::instrument(name = "kv.get_with_revision", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %key))]
    pub async fn get_with_revision(&self, key: &str) -> RepositoryResult<(T, Revision)> {
        self.fetch(&encode_key(key)?).await
    }

    /// Whether `key` currently holds an entity.
    #[tracing::instrument(name = "kv.exists", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %key))]
    pub async fn exists(&self, key: &str) -> RepositoryResult<bool> {
        let encoded = encode_key(key)?;
        match self.store()?.get(&encoded).await {
            Ok(_) => Ok(true),
            Err(e) => match RepositoryError::from(e) {
                RepositoryError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    /// Write `entity` at `key` unconditionally.
    ///
    /// Does not check for an existing entity; callers needing uniqueness
    /// call [`exists`](Self::exists) first and accept the race.
    #[tracing::instrument(name = "kv.create", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %key))]
    pub async fn create(&self, key: &str, entity: &T) -> RepositoryResult<Revision> {
        let encoded = encode_key(key)?;
        let value = Bytes::from(serde_json::to_vec(entity)?);
        let revision = self.store()?.put(&encoded, value).await?;
        debug!(%revision, "Entity created");
        Ok(revision)
    }

    /// Replace the entity at `key` if it is still at `revision`.
    #[tracing::instrument(name = "kv.update", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %key, %revision))]
    pub async fn update(&self, key: &str, entity: &T, revision: Revision) -> RepositoryResult<Revision> {
        let encoded = encode_key(key)?;
        let value = Bytes::from(serde_json::to_vec(entity)?);
        let new_revision = self.store()?.update(&encoded, value, revision).await?;
        debug!(%new_revision, "Entity updated");
        Ok(new_revision)
    }

    /// Delete the entity at `key` if it is still at `revision`.
    #[tracing::instrument(name = "kv.delete", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %key, %revision))]
    pub async fn delete(&self, key: &str, revision: Revision) -> RepositoryResult<()> {
        let encoded = encode_key(key)?;
        self.store()?.delete(&encoded, Some(revision)).await?;
        debug!("Entity deleted");
        Ok(())
    }

    /// Delete the entity at `key` whatever its revision.
    #[tracing::instrument(name = "kv.delete_without_revision", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %key))]
    pub async fn delete_without_revision(&self, key: &str) -> RepositoryResult<()> {
        let encoded = encode_key(key)?;
        self.store()?.delete(&encoded, None).await?;
        debug!("Entity deleted without revision check");
        Ok(())
    }

    /// All keys in the store, encoded.
    #[tracing::instrument(name = "kv.list_keys", skip_all, fields(entity_type = T::ENTITY_TYPE))]
    pub async fn list_keys(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.store()?.list_keys().await?)
    }

    /// Entities whose encoded key contains `pattern` (all keys if `None`).
    ///
    /// Entries that vanish or fail to decode are logged and skipped.
    #[tracing::instrument(name = "kv.list_entities", skip_all, fields(entity_type = T::ENTITY_TYPE, pattern = ?pattern))]
    pub async fn list_entities(&self, pattern: Option<&str>) -> RepositoryResult<Vec<T>> {
        let keys = self.list_keys().await?;
        let matching = keys
            .into_iter()
            .filter(|key| pattern.map_or(true, |p| key.contains(p)));

        Ok(self.fetch_all(matching).await)
    }

    /// Entities whose decoded key contains `pattern`.
    ///
    /// Keys that do not decode are skipped.
    #[tracing::instrument(name = "kv.list_entities_encoded", skip_all, fields(entity_type = T::ENTITY_TYPE, pattern = ?pattern))]
    pub async fn list_entities_encoded(&self, pattern: Option<&str>) -> RepositoryResult<Vec<T>> {
        let keys = self.list_keys().await?;
        let matching = keys.into_iter().filter(|key| match decode_key(key) {
            Ok(decoded) => pattern.map_or(true, |p| decoded.contains(p)),
            Err(e) => {
                debug!(%key, error = %e, "Skipping undecodable key");
                false
            }
        });

        Ok(self.fetch_all(matching).await)
    }

    /// Entities whose decoded key starts with `prefix` (`/registrant/`).
    #[tracing::instrument(name = "kv.list_entities_with_prefix", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %prefix))]
    pub async fn list_entities_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<T>> {
        let keys = self.list_keys().await?;
        let matching = keys
            .into_iter()
            .filter(|key| decode_key(key).is_ok_and(|decoded| decoded.starts_with(prefix)));

        Ok(self.fetch_all(matching).await)
    }

    /// Get and decode by encoded key.
    pub(crate) async fn fetch(&self, encoded: &str) -> RepositoryResult<(T, Revision)> {
        let entry = self.store()?.get(encoded).await?;
        let entity = serde_json::from_slice(&entry.value).map_err(|e| {
            RepositoryError::Internal(format!("Failed to decode {} at {}: {}", T::ENTITY_TYPE, encoded, e))
        })?;
        Ok((entity, entry.revision))
    }

    async fn fetch_all(&self, keys: impl Iterator<Item = String>) -> Vec<T> {
        let mut entities = Vec::new();
        for key in keys {
            match self.fetch(&key).await {
                Ok((entity, _)) => entities.push(entity),
                Err(e) => warn!(%key, error = %e, "Skipping entry during list"),
            }
        }
        entities
    }
}
