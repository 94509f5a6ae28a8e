use std::sync::atomic::{AtomicU32, Ordering};

use backon::ConstantBuilder;

use super::*;

fn immediate(max_retries: usize) -> ConstantBuilder {
    ConstantBuilder::default()
        .with_delay(Duration::ZERO)
        .with_max_times(max_retries)
}

#[test]
fn test_conflict_backoff_bounds() {
    let delays: Vec<Duration> = conflict_backoff().build().collect();
    assert_eq!(delays.len(), 5);
    for delay in delays {
        assert!(delay >= Duration::from_millis(10), "Delay {:?} too low", delay);
        // jitter adds at most one more max_delay
        assert!(delay <= Duration::from_secs(2), "Delay {:?} too high", delay);
    }
}

#[test]
fn test_connection_backoff_bounds() {
    let delays: Vec<Duration> = connection_backoff().build().collect();
    assert_eq!(delays.len(), 30);
    assert!(delays[0] >= Duration::from_millis(100));
    assert!(delays.iter().all(|d| *d <= Duration::from_secs(10)));
}

#[tokio::test]
async fn test_retry_on_conflict_until_success() {
    let calls = AtomicU32::new(0);

    let result = retry_on_conflict(immediate(5), || async {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(RepositoryError::Conflict("stale".to_string()))
        } else {
            Ok(42)
        }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_on_conflict_gives_up() {
    let calls = AtomicU32::new(0);

    let result: RepositoryResult<()> = retry_on_conflict(immediate(2), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Conflict("stale".to_string()))
    })
    .await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    // initial attempt plus two retries
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_on_conflict_passes_other_errors_through() {
    let calls = AtomicU32::new(0);

    let result: RepositoryResult<()> = retry_on_conflict(immediate(5), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::NotFound("gone".to_string()))
    })
    .await;

    assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_on_conflict_with_default_backoff() {
    let calls = AtomicU32::new(0);

    let result = retry_on_conflict(conflict_backoff(), || async {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(RepositoryError::Conflict("stale".to_string()))
        } else {
            Ok("updated")
        }
    })
    .await;

    assert_eq!(result.unwrap(), "updated");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
