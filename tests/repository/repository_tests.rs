//! Repository layer tests.
//!
//! Exercise IndexedRepository over a real KvStore: optimistic concurrency,
//! index maintenance, partial-failure tolerance and stale-index filtering.
//! Registrants are used throughout since they carry two indexes.

use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use meeting_kv::entities::{Registrant, RegistrantRepository};
use meeting_kv::keys::{decode_key, entity_key_encoded, entity_types};
use meeting_kv::repository::{IndexedRepository, RepositoryError};
use meeting_kv::storage::KvStore;

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

fn unique_email() -> String {
    format!("{}@example.com", Uuid::new_v4().simple())
}

fn repo(store: &Arc<dyn KvStore>) -> RegistrantRepository {
    IndexedRepository::new(store.clone())
}

pub async fn test_create_and_get(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let registrant = Registrant::new(unique("m"), unique_email());

    repo.create(&registrant).await.expect("create should succeed");

    let fetched = repo.get(&registrant.uid).await.expect("get should succeed");
    assert_eq!(fetched, registrant);
    assert!(repo.exists(&registrant.uid).await.unwrap());
    assert!(!repo.exists(&unique("r")).await.unwrap());
}

pub async fn test_optimistic_concurrency(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let mut registrant = Registrant::new(unique("m"), unique_email());

    let rev1 = repo.create(&registrant).await.unwrap();

    registrant.first_name = "Ada".to_string();
    let rev2 = repo.update(&registrant, rev1).await.expect("update should succeed");
    assert!(rev2 > rev1);

    let mut stale = registrant.clone();
    stale.first_name = "Grace".to_string();
    let err = repo.update(&stale, rev1).await.unwrap_err();
    assert!(
        matches!(err, RepositoryError::Conflict(_)),
        "stale update should conflict, got {:?}",
        err
    );

    let (current, revision) = repo.get_with_revision(&registrant.uid).await.unwrap();
    assert_eq!(current.first_name, "Ada");
    assert_eq!(revision, rev2);

    assert!(matches!(
        repo.delete(&registrant.uid, rev1).await,
        Err(RepositoryError::Conflict(_))
    ));
    repo.delete(&registrant.uid, rev2).await.expect("delete should succeed");
    assert!(repo.get(&registrant.uid).await.unwrap_err().is_not_found());
}

pub async fn test_lookups_by_index(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let meeting = unique("m");
    let email = unique_email();

    let first = Registrant::new(&meeting, &email);
    let second = Registrant::new(&meeting, unique_email());
    let elsewhere = Registrant::new(unique("m"), &email);
    for r in [&first, &second, &elsewhere] {
        repo.create(r).await.unwrap();
    }

    assert_eq!(repo.list_by_meeting(&meeting).await.unwrap().len(), 2);
    assert_eq!(repo.list_by_email(&email).await.unwrap().len(), 2);

    let found = repo.get_by_meeting_and_email(&meeting, &email).await.unwrap();
    assert_eq!(found.uid, first.uid);
    assert!(repo.exists_by_meeting_and_email(&meeting, &email).await.unwrap());
    assert!(!repo
        .exists_by_meeting_and_email(&unique("m"), &email)
        .await
        .unwrap());
}

pub async fn test_delete_indices_twice(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let registrant = Registrant::new(unique("m"), unique_email());
    repo.create(&registrant).await.unwrap();

    repo.indexes()
        .delete_indices(&registrant)
        .await
        .expect("first delete_indices should succeed");
    repo.indexes()
        .delete_indices(&registrant)
        .await
        .expect("second delete_indices should succeed");

    assert!(repo
        .list_by_meeting(&registrant.meeting_uid)
        .await
        .unwrap()
        .is_empty());
}

pub async fn test_list_skips_corrupt_entries(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let meeting = unique("m");

    for _ in 0..4 {
        repo.create(&Registrant::new(&meeting, unique_email()))
            .await
            .unwrap();
    }
    for _ in 0..2 {
        let key = entity_key_encoded(entity_types::REGISTRANT, &unique("corrupt")).unwrap();
        store.put(&key, Bytes::from_static(b"{\"uid\":")).await.unwrap();
    }

    let listed = repo.list().await.expect("list should tolerate corrupt entries");
    let ours = listed.iter().filter(|r| r.meeting_uid == meeting).count();
    assert_eq!(ours, 4);
}

pub async fn test_stale_index_is_filtered(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let registrant = Registrant::new(unique("m"), unique_email());
    repo.create(&registrant).await.unwrap();

    // remove the document behind the index's back
    repo.base()
        .delete_without_revision(&repo.base().key_for(&registrant.uid))
        .await
        .unwrap();

    let found = repo
        .list_by_email(&registrant.email)
        .await
        .expect("stale entries are not an error");
    assert!(found.is_empty());
}

pub async fn test_empty_email_is_not_indexed(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let meeting = unique("m");
    let anonymous = Registrant::new(&meeting, "");
    let named = Registrant::new(&meeting, unique_email());
    repo.create(&anonymous).await.unwrap();
    repo.create(&named).await.unwrap();

    let keys = store.list_keys().await.unwrap();
    let email_entries_for_anonymous = keys
        .iter()
        .filter_map(|k| decode_key(k).ok())
        .filter(|p| p.starts_with("/index/email/") && p.ends_with(&anonymous.uid))
        .count();
    assert_eq!(email_entries_for_anonymous, 0);

    assert_eq!(repo.list_by_meeting(&meeting).await.unwrap().len(), 2);
    assert_eq!(repo.list_by_email(&named.email).await.unwrap().len(), 1);
}

pub async fn test_update_moves_index(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let old_email = unique_email();
    let mut registrant = Registrant::new(unique("m"), &old_email);
    let revision = repo.create(&registrant).await.unwrap();

    registrant.email = unique_email();
    repo.update(&registrant, revision).await.unwrap();

    assert!(repo.list_by_email(&old_email).await.unwrap().is_empty());
    assert_eq!(repo.list_by_email(&registrant.email).await.unwrap().len(), 1);
}

pub async fn test_prune_and_reindex(store: &Arc<dyn KvStore>) {
    let repo = repo(store);
    let registrant = Registrant::new(unique("m"), unique_email());
    repo.create(&registrant).await.unwrap();
    repo.base()
        .delete_without_revision(&repo.base().key_for(&registrant.uid))
        .await
        .unwrap();

    let report = repo.prune_stale_indices().await.expect("prune should succeed");
    assert!(report.removed >= 2, "expected at least 2 removals: {:?}", report);

    let again = repo.prune_stale_indices().await.unwrap();
    assert_eq!(again.removed, 0);

    // an entity whose index entries were lost is found again after reindex
    let orphan = Registrant::new(unique("m"), unique_email());
    repo.base()
        .create(&repo.base().key_for(&orphan.uid), &orphan)
        .await
        .unwrap();
    assert!(repo.list_by_meeting(&orphan.meeting_uid).await.unwrap().is_empty());

    repo.reindex_all().await.unwrap();
    assert_eq!(repo.list_by_meeting(&orphan.meeting_uid).await.unwrap().len(), 1);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all repository tests against a store implementation.
#[macro_export]
macro_rules! run_repository_tests {
    ($store:expr) => {
        use $crate::repository::repository_tests::*;

        test_create_and_get($store).await;
        println!("  test_create_and_get: PASSED");

        test_optimistic_concurrency($store).await;
        println!("  test_optimistic_concurrency: PASSED");

        test_lookups_by_index($store).await;
        println!("  test_lookups_by_index: PASSED");

        test_delete_indices_twice($store).await;
        println!("  test_delete_indices_twice: PASSED");

        test_list_skips_corrupt_entries($store).await;
        println!("  test_list_skips_corrupt_entries: PASSED");

        test_stale_index_is_filtered($store).await;
        println!("  test_stale_index_is_filtered: PASSED");

        test_empty_email_is_not_indexed($store).await;
        println!("  test_empty_email_is_not_indexed: PASSED");

        test_update_moves_index($store).await;
        println!("  test_update_moves_index: PASSED");

        test_prune_and_reindex($store).await;
        println!("  test_prune_and_reindex: PASSED");
    };
}
