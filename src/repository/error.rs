//! Repository error types.

use crate::keys::KeyError;
use crate::storage::StoreError;

/// Errors surfaced to repository callers.
///
/// Store-level kinds are folded into these five so callers never match on
/// backend types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The presented revision is not the key's current revision.
    #[error("Revision conflict: {0}")]
    Conflict(String),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Internal repository error: {0}")]
    Internal(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

impl RepositoryError {
    /// Whether re-running the same operation later may succeed.
    ///
    /// A `Conflict` is only worth retrying after re-reading the entity.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RepositoryError::Conflict(_)
                | RepositoryError::Unavailable(_)
                | RepositoryError::Internal(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::Conflict(_))
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => RepositoryError::NotFound(key),
            StoreError::WrongLastSequence { key, expected } => RepositoryError::Conflict(format!(
                "{} is no longer at revision {}",
                key, expected
            )),
            StoreError::Unavailable(msg) => RepositoryError::Unavailable(msg),
            StoreError::InvalidKey(msg) | StoreError::Backend(msg) => RepositoryError::Internal(msg),
        }
    }
}

impl From<KeyError> for RepositoryError {
    fn from(err: KeyError) -> Self {
        RepositoryError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Internal(format!("JSON: {}", err))
    }
}
