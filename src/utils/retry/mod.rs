//! Retry utilities: backoff builders and conflict retry.
//!
//! Uses `backon` for exponential backoff with jitter. The repository never
//! retries on its own: a `Conflict` means the caller's view of the entity is
//! stale. Callers that can rebuild their change from a fresh read (read,
//! modify, update) wrap the whole cycle in [`retry_on_conflict`].

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder, Retryable};
use tracing::debug;

use crate::repository::{RepositoryError, RepositoryResult};

/// Standard backoff for read-modify-write retries on revision conflicts.
///
/// - Min delay: 10ms
/// - Max delay: 1s
/// - Max retries: 5
/// - Jitter enabled
pub fn conflict_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_secs(1))
        .with_max_times(5)
        .with_jitter()
}

/// Backoff for store connection retries at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max retries: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}

/// Run `op`, re-running it after a backoff each time it fails with
/// [`RepositoryError::Conflict`].
///
/// Any other error, or a conflict once `backoff` is exhausted, is returned
/// as-is. `op` must re-read the entity on every call; re-sending the same
/// stale revision will only conflict again.
pub async fn retry_on_conflict<T, B, F, Fut>(backoff: B, op: F) -> RepositoryResult<T>
where
    B: BackoffBuilder,
    F: FnMut() -> Fut,
    Fut: Future<Output = RepositoryResult<T>>,
{
    op.retry(backoff)
        .when(RepositoryError::is_conflict)
        .notify(|err: &RepositoryError, delay: Duration| {
            debug!(error = %err, ?delay, "Revision conflict, retrying");
        })
        .await
}

#[cfg(test)]
mod tests;
