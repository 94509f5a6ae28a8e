//! KvStore interface tests.
//!
//! These tests verify the contract of the KvStore trait.
//! Each store implementation should run these tests.

use bytes::Bytes;
use uuid::Uuid;

use meeting_kv::storage::{KvStore, Revision, StoreError};

/// A key no other test touches.
pub fn unique_key(name: &str) -> String {
    format!("contract.{}.{}", name, Uuid::new_v4())
}

// =============================================================================
// get / put
// =============================================================================

pub async fn test_get_missing<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("get_missing");

    let result = store.get(&key).await;
    assert!(
        matches!(result, Err(StoreError::NotFound(_))),
        "missing key should be NotFound, got {:?}",
        result
    );
}

pub async fn test_put_then_get<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("put_get");

    let revision = store
        .put(&key, Bytes::from_static(b"{\"v\":1}"))
        .await
        .expect("put should succeed");

    let entry = store.get(&key).await.expect("get should succeed");
    assert_eq!(entry.value, Bytes::from_static(b"{\"v\":1}"));
    assert_eq!(entry.revision, revision);
}

pub async fn test_put_advances_revision<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("put_twice");

    let first = store.put(&key, Bytes::from_static(b"1")).await.unwrap();
    let second = store.put(&key, Bytes::from_static(b"2")).await.unwrap();
    assert!(second > first, "{} should follow {}", second, first);
}

pub async fn test_empty_value<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("empty");

    store.put(&key, Bytes::new()).await.unwrap();
    let entry = store.get(&key).await.unwrap();
    assert!(entry.value.is_empty());
}

// =============================================================================
// update
// =============================================================================

pub async fn test_update_with_current_revision<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("update_current");

    let first = store.put(&key, Bytes::from_static(b"1")).await.unwrap();
    let second = store
        .update(&key, Bytes::from_static(b"2"), first)
        .await
        .expect("update with current revision should succeed");

    assert!(second > first);
    let entry = store.get(&key).await.unwrap();
    assert_eq!(entry.value, Bytes::from_static(b"2"));
    assert_eq!(entry.revision, second);
}

pub async fn test_update_with_stale_revision<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("update_stale");

    let first = store.put(&key, Bytes::from_static(b"1")).await.unwrap();
    store
        .update(&key, Bytes::from_static(b"2"), first)
        .await
        .unwrap();

    let result = store.update(&key, Bytes::from_static(b"3"), first).await;
    assert!(
        matches!(result, Err(StoreError::WrongLastSequence { .. })),
        "stale update should be rejected, got {:?}",
        result
    );
    assert_eq!(
        store.get(&key).await.unwrap().value,
        Bytes::from_static(b"2")
    );
}

pub async fn test_update_missing<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("update_missing");

    let result = store.update(&key, Bytes::from_static(b"1"), Revision(1)).await;
    assert!(
        matches!(result, Err(StoreError::NotFound(_))),
        "update of missing key should be NotFound, got {:?}",
        result
    );
}

// =============================================================================
// delete
// =============================================================================

pub async fn test_delete_with_revision<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("delete_rev");

    let revision = store.put(&key, Bytes::from_static(b"1")).await.unwrap();
    store
        .delete(&key, Some(revision))
        .await
        .expect("delete with current revision should succeed");

    assert!(matches!(store.get(&key).await, Err(StoreError::NotFound(_))));
}

pub async fn test_delete_with_stale_revision<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("delete_stale");

    let first = store.put(&key, Bytes::from_static(b"1")).await.unwrap();
    store.put(&key, Bytes::from_static(b"2")).await.unwrap();

    let result = store.delete(&key, Some(first)).await;
    assert!(
        matches!(result, Err(StoreError::WrongLastSequence { .. })),
        "stale delete should be rejected, got {:?}",
        result
    );
    assert!(store.get(&key).await.is_ok(), "entry should survive");
}

pub async fn test_delete_missing<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("delete_missing");

    let result = store.delete(&key, None).await;
    assert!(
        matches!(result, Err(StoreError::NotFound(_))),
        "delete of missing key should be NotFound, got {:?}",
        result
    );
}

pub async fn test_delete_then_recreate<S: KvStore + ?Sized>(store: &S) {
    let key = unique_key("recreate");

    store.put(&key, Bytes::from_static(b"old")).await.unwrap();
    store.delete(&key, None).await.unwrap();
    assert!(matches!(
        store.delete(&key, None).await,
        Err(StoreError::NotFound(_))
    ));

    let revision = store.put(&key, Bytes::from_static(b"new")).await.unwrap();
    let entry = store.get(&key).await.unwrap();
    assert_eq!(entry.value, Bytes::from_static(b"new"));
    assert_eq!(entry.revision, revision);
}

// =============================================================================
// list_keys
// =============================================================================

pub async fn test_list_keys<S: KvStore + ?Sized>(store: &S) {
    let kept = unique_key("list_kept");
    let dropped = unique_key("list_dropped");

    store.put(&kept, Bytes::from_static(b"1")).await.unwrap();
    store.put(&dropped, Bytes::from_static(b"1")).await.unwrap();
    store.delete(&dropped, None).await.unwrap();

    let keys = store.list_keys().await.expect("list_keys should succeed");
    assert!(keys.contains(&kept), "live key should be listed");
    assert!(!keys.contains(&dropped), "deleted key should not be listed");
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all KvStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_kv_store_tests {
    ($store:expr) => {
        use $crate::repository::kv_store_tests::*;

        // get / put
        test_get_missing($store).await;
        println!("  test_get_missing: PASSED");

        test_put_then_get($store).await;
        println!("  test_put_then_get: PASSED");

        test_put_advances_revision($store).await;
        println!("  test_put_advances_revision: PASSED");

        test_empty_value($store).await;
        println!("  test_empty_value: PASSED");

        // update
        test_update_with_current_revision($store).await;
        println!("  test_update_with_current_revision: PASSED");

        test_update_with_stale_revision($store).await;
        println!("  test_update_with_stale_revision: PASSED");

        test_update_missing($store).await;
        println!("  test_update_missing: PASSED");

        // delete
        test_delete_with_revision($store).await;
        println!("  test_delete_with_revision: PASSED");

        test_delete_with_stale_revision($store).await;
        println!("  test_delete_with_stale_revision: PASSED");

        test_delete_missing($store).await;
        println!("  test_delete_missing: PASSED");

        test_delete_then_recreate($store).await;
        println!("  test_delete_then_recreate: PASSED");

        // list_keys
        test_list_keys($store).await;
        println!("  test_list_keys: PASSED");
    };
}
