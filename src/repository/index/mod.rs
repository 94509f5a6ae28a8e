//! Secondary index maintenance.
//!
//! An index entry is a zero-length value at
//! `/index/{field}/{value}/{uid}`. Its existence is the whole record.
//! Entries are hints only: the entity document is authoritative, and every
//! lookup re-reads the entity and drops entries that no longer agree with it.
//!
//! Index names are not namespaced by entity type, so a bucket must not be
//! shared between entity types that declare the same index name.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::{require_uid, Entity, EntityRepository, IndexedField, RepositoryError, RepositoryResult};
use crate::keys::{decode_key, entity_key_encoded, index_key_encoded, parse_index_path};
use crate::storage::{KvStore, StoreError};

/// Outcome of [`IndexManager::prune_stale`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Index entries examined.
    pub scanned: usize,
    /// Stale entries deleted.
    pub removed: usize,
    /// Entries that could not be checked or deleted.
    pub failed: usize,
}

impl PruneReport {
    pub fn merge(&mut self, other: PruneReport) {
        self.scanned += other.scanned;
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// Maintains the index entries declared by `T`'s indexed fields.
pub struct IndexManager<T> {
    entities: EntityRepository<T>,
    fields: Vec<IndexedField<T>>,
}

impl<T> Clone for IndexManager<T> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            fields: self.fields.clone(),
        }
    }
}

impl<T: Entity> IndexManager<T> {
    pub fn new(store: Arc<dyn KvStore>, fields: Vec<IndexedField<T>>) -> Self {
        Self {
            entities: EntityRepository::new(store),
            fields,
        }
    }

    pub fn detached(fields: Vec<IndexedField<T>>) -> Self {
        Self {
            entities: EntityRepository::detached(),
            fields,
        }
    }

    pub fn fields(&self) -> &[IndexedField<T>] {
        &self.fields
    }

    fn field(&self, name: &str) -> Option<&IndexedField<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Encoded index keys `entity` owns. Blank field values own none.
    pub fn index_keys(&self, entity: &T) -> RepositoryResult<Vec<String>> {
        let uid = require_uid(entity)?;
        self.fields
            .iter()
            .filter_map(|field| field.value(entity).map(|value| (field.name, value)))
            .map(|(name, value)| index_key_encoded(name, value, uid).map_err(RepositoryError::from))
            .collect()
    }

    /// Write every index entry for `entity`.
    ///
    /// All entries are attempted; the first failure is returned.
    #[tracing::instrument(name = "kv.create_indices", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %entity.uid()))]
    pub async fn create_indices(&self, entity: &T) -> RepositoryResult<()> {
        let keys = self.index_keys(entity)?;
        self.create_entries(&keys).await
    }

    /// Remove every index entry for `entity`. Already-absent entries are
    /// not an error.
    #[tracing::instrument(name = "kv.delete_indices", skip_all, fields(entity_type = T::ENTITY_TYPE, key = %entity.uid()))]
    pub async fn delete_indices(&self, entity: &T) -> RepositoryResult<()> {
        let keys = self.index_keys(entity)?;
        self.delete_entries(&keys).await
    }

    /// Entities whose `index_type` field currently equals `value`.
    ///
    /// Entries pointing at missing entities, or at entities whose field has
    /// moved on, are stale and skipped.
    #[tracing::instrument(name = "kv.list_by_index", skip_all, fields(entity_type = T::ENTITY_TYPE, index = %index_type, value = %value))]
    pub async fn list_by_index(&self, index_type: &str, value: &str) -> RepositoryResult<Vec<T>> {
        let field = *self.field(index_type).ok_or_else(|| {
            RepositoryError::Validation(format!(
                "{} has no index named {}",
                T::ENTITY_TYPE,
                index_type
            ))
        })?;

        let keys = self.entities.list_keys().await?;
        let mut entities = Vec::new();
        for key in keys {
            let Ok(decoded) = decode_key(&key) else {
                continue;
            };
            let Some(path) = parse_index_path(&decoded) else {
                continue;
            };
            if path.index_type != index_type || path.index_value != value {
                continue;
            }

            match self.dereference(path.entity_uid).await {
                Ok(entity) if field.value(&entity) == Some(value) => entities.push(entity),
                Ok(_) => {
                    warn!(uid = %path.entity_uid, "Stale index entry: value changed, skipping")
                }
                Err(RepositoryError::NotFound(_)) => {
                    warn!(uid = %path.entity_uid, "Stale index entry: entity missing, skipping")
                }
                Err(e) => warn!(uid = %path.entity_uid, error = %e, "Skipping index entry"),
            }
        }

        Ok(entities)
    }

    /// Delete index entries that no longer agree with their entity.
    ///
    /// Entries for index names `T` does not declare are left alone. Per-entry
    /// failures are counted, not returned. Racing a concurrent update can
    /// remove an entry the update just wrote; run [`reindex`] afterwards.
    ///
    /// [`reindex`]: super::IndexedRepository::reindex
    #[tracing::instrument(name = "kv.prune_stale", skip_all, fields(entity_type = T::ENTITY_TYPE))]
    pub async fn prune_stale(&self) -> RepositoryResult<PruneReport> {
        let store = self.entities.store()?.clone();
        let keys = store.list_keys().await?;
        let mut report = PruneReport::default();

        for key in keys {
            let Ok(decoded) = decode_key(&key) else {
                continue;
            };
            let Some(path) = parse_index_path(&decoded) else {
                continue;
            };
            report.scanned += 1;

            let Some(field) = self.field(path.index_type) else {
                debug!(index = %path.index_type, "Undeclared index, leaving entry");
                continue;
            };

            let stale = match self.dereference(path.entity_uid).await {
                Ok(entity) => field.value(&entity) != Some(path.index_value),
                Err(RepositoryError::NotFound(_)) => true,
                Err(e) => {
                    warn!(%decoded, error = %e, "Could not check index entry");
                    report.failed += 1;
                    continue;
                }
            };
            if !stale {
                continue;
            }

            match store.delete(&key, None).await {
                Ok(()) | Err(StoreError::NotFound(_)) => {
                    debug!(%decoded, "Removed stale index entry");
                    report.removed += 1;
                }
                Err(e) => {
                    warn!(%decoded, error = %e, "Failed to remove stale index entry");
                    report.failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "Index prune complete"
        );
        Ok(report)
    }

    async fn dereference(&self, uid: &str) -> RepositoryResult<T> {
        let key = entity_key_encoded(T::ENTITY_TYPE, uid)?;
        let (entity, _) = self.entities.fetch(&key).await?;
        Ok(entity)
    }

    /// Write zero-length entries at `keys`.
    pub(crate) async fn create_entries(&self, keys: &[String]) -> RepositoryResult<()> {
        let store = self.entities.store()?;
        let mut first_error = None;
        for key in keys {
            if let Err(e) = store.put(key, Bytes::new()).await {
                warn!(%key, error = %e, "Failed to write index entry");
                first_error.get_or_insert(RepositoryError::from(e));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Remove entries at `keys`, ignoring ones already gone.
    pub(crate) async fn delete_entries(&self, keys: &[String]) -> RepositoryResult<()> {
        let store = self.entities.store()?;
        let mut first_error = None;
        for key in keys {
            match store.delete(key, None).await {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => {
                    warn!(%key, error = %e, "Failed to delete index entry");
                    first_error.get_or_insert(RepositoryError::from(e));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
