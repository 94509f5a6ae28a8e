//! Entity repository with secondary indexes kept alongside.
//!
//! The store cannot write a document and its index entries atomically, so
//! every mutation is an ordered sequence with a known crash window:
//!
//! | operation | sequence | crash leaves |
//! |-----------|----------|--------------|
//! | create | put document, put entries | entity missing from lookups |
//! | delete | check revision, delete entries, CAS delete | entity missing from lookups |
//! | update | check revision, delete old-only entries, put new-only entries, CAS update | extra or missing entries |
//!
//! Extra entries are filtered at read time. Missing entries are repaired by
//! [`IndexedRepository::reindex_all`]. When the final CAS loses a race the
//! index changes are rolled back from a fresh read before the error is
//! returned.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{
    require_uid, validate_uid, Entity, EntityRepository, IndexManager, IndexedField, PruneReport,
    RepositoryError, RepositoryResult,
};
use crate::keys::entity_prefix;
use crate::storage::{KvStore, Revision};

/// [`EntityRepository`] plus [`IndexManager`] for one entity type.
///
/// Keyed by UID rather than logical path.
pub struct IndexedRepository<T> {
    base: EntityRepository<T>,
    indexes: IndexManager<T>,
}

impl<T> Clone for IndexedRepository<T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<T: Entity> IndexedRepository<T> {
    /// Repository maintaining `T`'s declared indexes.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_fields(store, T::indexed_fields())
    }

    pub fn with_fields(store: Arc<dyn KvStore>, fields: Vec<IndexedField<T>>) -> Self {
        Self {
            base: EntityRepository::new(store.clone()),
            indexes: IndexManager::new(store, fields),
        }
    }

    /// Repository without a store; every operation fails `Unavailable`.
    pub fn detached() -> Self {
        Self {
            base: EntityRepository::detached(),
            indexes: IndexManager::detached(T::indexed_fields()),
        }
    }

    pub fn base(&self) -> &EntityRepository<T> {
        &self.base
    }

    pub fn indexes(&self) -> &IndexManager<T> {
        &self.indexes
    }

    fn key(uid: &str) -> RepositoryResult<String> {
        validate_uid(T::ENTITY_TYPE, uid)?;
        Ok(crate::keys::entity_key(T::ENTITY_TYPE, uid))
    }

    /// Store `entity`, then its index entries.
    ///
    /// Index failures are logged; the entity is still created.
    #[tracing::instrument(name = "repository.create", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %entity.uid()))]
    pub async fn create(&self, entity: &T) -> RepositoryResult<Revision> {
        let key = Self::key(require_uid(entity)?)?;
        let revision = self.base.create(&key, entity).await?;

        if let Err(e) = self.indexes.create_indices(entity).await {
            warn!(error = %e, "Entity created but index entries incomplete");
        }
        Ok(revision)
    }

    #[tracing::instrument(name = "repository.get", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %uid))]
    pub async fn get(&self, uid: &str) -> RepositoryResult<T> {
        self.base.get(&Self::key(uid)?).await
    }

    #[tracing::instrument(name = "repository.get_with_revision", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %uid))]
    pub async fn get_with_revision(&self, uid: &str) -> RepositoryResult<(T, Revision)> {
        self.base.get_with_revision(&Self::key(uid)?).await
    }

    #[tracing::instrument(name = "repository.exists", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %uid))]
    pub async fn exists(&self, uid: &str) -> RepositoryResult<bool> {
        self.base.exists(&Self::key(uid)?).await
    }

    /// Replace the stored entity if it is still at `revision`, moving index
    /// entries for every indexed field whose value changed.
    #[tracing::instrument(name = "repository.update", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %entity.uid(), %revision))]
    pub async fn update(&self, entity: &T, revision: Revision) -> RepositoryResult<Revision> {
        let key = Self::key(require_uid(entity)?)?;

        let (current, current_revision) = self.base.get_with_revision(&key).await?;
        if current_revision != revision {
            return Err(RepositoryError::Conflict(format!(
                "{} is at revision {}, not {}",
                key, current_revision, revision
            )));
        }

        let old_keys: BTreeSet<String> = self.indexes.index_keys(&current)?.into_iter().collect();
        let new_keys: BTreeSet<String> = self.indexes.index_keys(entity)?.into_iter().collect();
        let removed: Vec<String> = old_keys.difference(&new_keys).cloned().collect();
        let added: Vec<String> = new_keys.difference(&old_keys).cloned().collect();

        if let Err(e) = self.indexes.delete_entries(&removed).await {
            warn!(error = %e, "Failed to remove old index entries");
        }
        if let Err(e) = self.indexes.create_entries(&added).await {
            warn!(error = %e, "Failed to write new index entries");
        }

        match self.base.update(&key, entity, revision).await {
            Ok(new_revision) => Ok(new_revision),
            Err(e) => {
                debug!(error = %e, "Update rejected, rolling back index changes");
                if let Err(rollback) = self.indexes.delete_entries(&added).await {
                    warn!(error = %rollback, "Failed to roll back new index entries");
                }
                self.restore_indices(&key, &removed).await;
                Err(e)
            }
        }
    }

    /// Delete the entity if it is still at `revision`, index entries first.
    #[tracing::instrument(name = "repository.delete", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %uid, %revision))]
    pub async fn delete(&self, uid: &str, revision: Revision) -> RepositoryResult<()> {
        let key = Self::key(uid)?;

        let (current, current_revision) = self.base.get_with_revision(&key).await?;
        if current_revision != revision {
            return Err(RepositoryError::Conflict(format!(
                "{} is at revision {}, not {}",
                key, current_revision, revision
            )));
        }

        let index_keys = self.indexes.index_keys(&current)?;
        if let Err(e) = self.indexes.delete_entries(&index_keys).await {
            warn!(error = %e, "Failed to remove index entries before delete");
        }

        match self.base.delete(&key, revision).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict(msg)) => {
                debug!(%msg, "Delete lost a race, restoring index entries");
                self.restore_indices(&key, &index_keys).await;
                Err(RepositoryError::Conflict(msg))
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the entity and its index entries without a revision check.
    #[tracing::instrument(name = "repository.delete_without_revision", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %uid))]
    pub async fn delete_without_revision(&self, uid: &str) -> RepositoryResult<()> {
        let key = Self::key(uid)?;

        match self.base.get(&key).await {
            Ok(current) => {
                if let Err(e) = self.indexes.delete_indices(&current).await {
                    warn!(error = %e, "Failed to remove index entries before delete");
                }
            }
            // unreadable documents still get deleted; their entries go stale
            Err(RepositoryError::Internal(msg)) => {
                warn!(%msg, "Deleting undecodable entity");
            }
            Err(e) => return Err(e),
        }

        self.base.delete_without_revision(&key).await
    }

    /// Every entity of this type. Index entries are not fetched.
    #[tracing::instrument(name = "repository.list", skip_all, fields(entity_type = T::ENTITY_TYPE))]
    pub async fn list(&self) -> RepositoryResult<Vec<T>> {
        self.base
            .list_entities_with_prefix(&entity_prefix(T::ENTITY_TYPE))
            .await
    }

    /// Entities whose `index_type` field currently equals `value`.
    pub async fn list_by_index(&self, index_type: &str, value: &str) -> RepositoryResult<Vec<T>> {
        self.indexes.list_by_index(index_type, value).await
    }

    /// Remove index entries that no longer agree with their entity.
    pub async fn prune_stale_indices(&self) -> RepositoryResult<PruneReport> {
        self.indexes.prune_stale().await
    }

    /// Rewrite the index entries of one entity.
    pub async fn reindex(&self, entity: &T) -> RepositoryResult<()> {
        self.indexes.create_indices(entity).await
    }

    /// Rewrite the index entries of every entity. Returns how many entities
    /// were fully reindexed.
    #[tracing::instrument(name = "repository.reindex_all", skip_all, fields(entity_type = T::ENTITY_TYPE))]
    pub async fn reindex_all(&self) -> RepositoryResult<usize> {
        let entities = self.list().await?;
        let total = entities.len();
        let mut reindexed = 0;

        for entity in &entities {
            match self.reindex(entity).await {
                Ok(()) => reindexed += 1,
                Err(e) => warn!(uid = %entity.uid(), error = %e, "Failed to reindex entity"),
            }
        }

        info!(total, reindexed, "Reindex complete");
        Ok(reindexed)
    }

    /// Re-create index entries from a fresh read of `key`, falling back to
    /// `fallback` when the entity cannot be read.
    async fn restore_indices(&self, key: &str, fallback: &[String]) {
        let restored = match self.base.get(key).await {
            Ok(latest) => self.indexes.create_indices(&latest).await,
            Err(RepositoryError::NotFound(_)) => Ok(()),
            Err(_) => self.indexes.create_entries(fallback).await,
        };
        if let Err(e) = restored {
            warn!(%key, error = %e, "Failed to restore index entries");
        }
    }
}
