//! Entity repositories over a versioned KV store.
//!
//! Three layers, each usable on its own:
//!
//! - [`EntityRepository`]: JSON documents at `/{entity_type}/{uid}` with
//!   revision-checked update and delete
//! - [`IndexManager`]: marker keys at `/index/{field}/{value}/{uid}` that
//!   make "find by field" an enumeration instead of a full decode
//! - [`IndexedRepository`]: the two combined, keeping markers in step with
//!   the primary document and compensating when a revision check fails
//!
//! The store has no multi-key transactions. Index markers are therefore
//! hints: a marker may outlive its entity or point at an entity whose field
//! has since changed, and every read through an index re-checks the entity.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::keys::{PATH_SEPARATOR, WILDCARD_TAIL, WILDCARD_TOKEN};

mod base;
mod error;
mod index;
mod indexed;

pub use base::EntityRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use index::{IndexManager, PruneReport};
pub use indexed::IndexedRepository;

/// A record stored by the repository layer.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// First segment of every key of this type (`"registrant"`).
    const ENTITY_TYPE: &'static str;

    /// Unique identifier. Keyed operations reject an empty UID.
    fn uid(&self) -> &str;

    /// Fields maintained as secondary indexes.
    fn indexed_fields() -> Vec<IndexedField<Self>>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// A secondary index declaration: index name plus value extractor.
pub struct IndexedField<T> {
    pub name: &'static str,
    pub extract: fn(&T) -> Option<&str>,
}

impl<T> IndexedField<T> {
    pub const fn new(name: &'static str, extract: fn(&T) -> Option<&str>) -> Self {
        Self { name, extract }
    }

    /// Indexable value of this field, if any.
    ///
    /// Blank values are never indexed.
    pub fn value<'a>(&self, entity: &'a T) -> Option<&'a str> {
        (self.extract)(entity).filter(|v| !v.trim().is_empty())
    }
}

// Manual impls: derive would require `T: Clone`.
impl<T> Clone for IndexedField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IndexedField<T> {}

impl<T> std::fmt::Debug for IndexedField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedField").field("name", &self.name).finish()
    }
}

/// Reject UIDs that cannot be stored as a single key segment.
///
/// A UID must be non-blank, must not contain the path separator, and must
/// not be a bare wildcard token.
pub(crate) fn validate_uid(entity_type: &str, uid: &str) -> RepositoryResult<()> {
    if uid.trim().is_empty() {
        return Err(RepositoryError::Validation(format!(
            "{} uid is required",
            entity_type
        )));
    }
    if uid.contains(PATH_SEPARATOR) {
        return Err(RepositoryError::Validation(format!(
            "{} uid {:?} must not contain '{}'",
            entity_type, uid, PATH_SEPARATOR
        )));
    }
    if uid == WILDCARD_TOKEN || uid == WILDCARD_TAIL {
        return Err(RepositoryError::Validation(format!(
            "{} uid {:?} is a reserved wildcard",
            entity_type, uid
        )));
    }
    Ok(())
}

/// UID of `entity`, validated.
pub(crate) fn require_uid<T: Entity>(entity: &T) -> RepositoryResult<&str> {
    let uid = entity.uid();
    validate_uid(T::ENTITY_TYPE, uid)?;
    Ok(uid)
}

#[cfg(test)]
pub(crate) mod test_support;
