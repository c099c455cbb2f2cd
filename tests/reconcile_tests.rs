/// Reconciliation tests
///
/// Orphan cleanup across collections, batching, exemptions and halts
/// Run with: cargo test --test reconcile_tests

use docsweep::storage::{CommitRecord, FaultPlan};
use docsweep::{
    CollectionSpec, CommitMode, InMemoryDocumentStore, MaintError, MaintenanceConfig, RunWarning,
    reconcile,
};
use serde_json::json;

async fn seed_users(store: &InMemoryDocumentStore, ids: &[&str]) {
    for id in ids {
        store.insert("users", id, json!({"name": id})).await;
    }
}

async fn seed_orphans(store: &InMemoryDocumentStore, collection: &str, count: usize) {
    for i in 0..count {
        let id = format!("{collection}-orphan-{i}");
        store.insert(collection, &id, json!({"userId": "ghost"})).await;
    }
}

fn config_for(collections: &[&str]) -> MaintenanceConfig {
    MaintenanceConfig::new().reconcile_collections(
        collections
            .iter()
            .map(|name| CollectionSpec::new(name, "userId"))
            .collect(),
    )
}

#[tokio::test]
async fn test_notes_scenario() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1", "u2"]).await;
    store.insert("notes", "n1", json!({"userId": "u1"})).await;
    store.insert("notes", "n2", json!({"userId": "u9"})).await;
    store.insert("notes", "n3", json!({"title": "no owner"})).await;
    store.insert("notes", "n4", json!({"userId": "u2"})).await;

    let report = reconcile(&store, &config_for(&["notes"]), CommitMode::Apply).await;

    assert!(report.is_success());
    let notes = report.collection("notes").unwrap();
    assert_eq!(notes.scanned, 4);
    assert_eq!(notes.matched, 1);
    assert_eq!(notes.mutated, 1);
    assert_eq!(notes.commits, 1);

    assert!(!store.contains("notes", "n2").await);
    assert!(store.contains("notes", "n3").await);
    assert_eq!(store.document_count("notes").await, 3);
}

#[tokio::test]
async fn test_capacity_plus_one_splits_into_two_commits() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    seed_orphans(&store, "notes", 4).await;

    let config = config_for(&["notes"]).batch_capacity(3);
    let report = reconcile(&store, &config, CommitMode::Apply).await;

    assert!(report.is_success());
    assert_eq!(
        store.commit_log(),
        vec![
            CommitRecord { collection: "notes".to_string(), size: 3 },
            CommitRecord { collection: "notes".to_string(), size: 1 },
        ]
    );
    assert_eq!(report.totals.commits, 2);
    assert_eq!(report.totals.mutated, 4);
}

#[tokio::test]
async fn test_exact_multiple_has_no_empty_commit() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    seed_orphans(&store, "notes", 6).await;

    let config = config_for(&["notes"]).batch_capacity(3);
    let report = reconcile(&store, &config, CommitMode::Apply).await;

    assert!(report.is_success());
    let sizes: Vec<usize> = store.commit_log().iter().map(|c| c.size).collect();
    assert_eq!(sizes, vec![3, 3]);
    assert_eq!(store.commit_attempts(), 2);
}

#[tokio::test]
async fn test_no_orphans_means_no_commit() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    store.insert("notes", "n1", json!({"userId": "u1"})).await;

    let report = reconcile(&store, &config_for(&["notes"]), CommitMode::Apply).await;

    assert!(report.is_success());
    assert_eq!(report.totals.matched, 0);
    assert_eq!(store.commit_attempts(), 0);
}

#[tokio::test]
async fn test_commit_failure_halts_remaining_collections() {
    let store = InMemoryDocumentStore::new().with_faults(FaultPlan::default().fail_commit(3));
    seed_users(&store, &["u1"]).await;
    seed_orphans(&store, "journals", 5).await;
    seed_orphans(&store, "notes", 2).await;

    let config = config_for(&["journals", "notes"]).batch_capacity(2);
    let report = reconcile(&store, &config, CommitMode::Apply).await;

    assert!(!report.is_success());
    match report.error() {
        Some(MaintError::BatchCommitFailed {
            collection,
            attempted_count,
            ..
        }) => {
            assert_eq!(collection, "journals");
            assert_eq!(*attempted_count, 1);
        }
        other => panic!("expected BatchCommitFailed, got {other:?}"),
    }

    // Two batches landed before the failure and stay applied.
    assert_eq!(report.totals.commits, 2);
    assert_eq!(report.totals.mutated, 4);
    assert_eq!(store.document_count("journals").await, 1);

    // The next collection was never touched.
    assert!(report.collection("notes").is_none());
    assert_eq!(store.document_count("notes").await, 2);
    assert_eq!(store.commit_attempts(), 3);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    seed_orphans(&store, "journals", 3).await;
    store.insert("journals", "kept", json!({"userId": "u1"})).await;

    let config = config_for(&["journals"]);
    let first = reconcile(&store, &config, CommitMode::Apply).await;
    let second = reconcile(&store, &config, CommitMode::Apply).await;

    assert_eq!(first.totals.mutated, 3);
    assert!(second.is_success());
    assert_eq!(second.totals.matched, 0);
    assert_eq!(second.totals.mutated, 0);
    assert_eq!(store.document_count("journals").await, 1);
}

#[tokio::test]
async fn test_exempt_records_survive() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    store
        .insert("paletteModels", "p1", json!({"userId": "ghost", "isPredefined": true}))
        .await;
    store
        .insert("paletteModels", "p2", json!({"userId": "ghost", "isPredefined": "true"}))
        .await;
    store
        .insert("paletteModels", "p3", json!({"userId": "ghost", "isPredefined": false}))
        .await;

    let config = MaintenanceConfig::new().reconcile_collections(vec![
        CollectionSpec::new("paletteModels", "userId").exempt_when("isPredefined", json!(true)),
    ]);
    let report = reconcile(&store, &config, CommitMode::Apply).await;

    assert!(report.is_success());
    let palettes = report.collection("paletteModels").unwrap();
    assert_eq!(palettes.exempt, 1);
    assert_eq!(palettes.mutated, 2);
    assert!(store.contains("paletteModels", "p1").await);
    assert!(!store.contains("paletteModels", "p2").await);
    assert!(!store.contains("paletteModels", "p3").await);
}

#[tokio::test]
async fn test_ambiguous_owner_values_are_kept() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    store.insert("notes", "null", json!({"userId": null})).await;
    store.insert("notes", "blank", json!({"userId": "   "})).await;
    store.insert("notes", "number", json!({"userId": 42})).await;
    store.insert("notes", "orphan", json!({"userId": "ghost"})).await;

    let report = reconcile(&store, &config_for(&["notes"]), CommitMode::Apply).await;

    let notes = report.collection("notes").unwrap();
    assert_eq!(notes.ambiguous, 3);
    assert_eq!(notes.mutated, 1);
    assert_eq!(store.document_count("notes").await, 3);
}

#[tokio::test]
async fn test_empty_reference_set_warns_and_proceeds() {
    let store = InMemoryDocumentStore::new();
    store.insert("notes", "n1", json!({"userId": "u1"})).await;
    store.insert("notes", "n2", json!({"title": "unowned"})).await;

    let report = reconcile(&store, &config_for(&["notes"]), CommitMode::Apply).await;

    assert!(report.is_success());
    assert_eq!(
        report.warnings,
        vec![RunWarning::EmptyReferenceSet {
            collection: "users".to_string()
        }]
    );
    assert!(!store.contains("notes", "n1").await);
    assert!(store.contains("notes", "n2").await);
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    seed_orphans(&store, "notes", 5).await;

    let config = config_for(&["notes"]).batch_capacity(2);
    let report = reconcile(&store, &config, CommitMode::DryRun).await;

    assert!(report.is_success());
    assert!(report.dry_run);
    assert_eq!(report.totals.matched, 5);
    assert_eq!(report.totals.mutated, 0);
    assert_eq!(store.commit_attempts(), 0);
    assert_eq!(store.document_count("notes").await, 5);
}

#[tokio::test]
async fn test_read_failure_aborts_with_partial_counts() {
    let store =
        InMemoryDocumentStore::new().with_faults(FaultPlan::default().fail_reads_on("notes"));
    seed_users(&store, &["u1"]).await;
    seed_orphans(&store, "journals", 2).await;
    seed_orphans(&store, "notes", 2).await;

    let report = reconcile(&store, &config_for(&["journals", "notes"]), CommitMode::Apply).await;

    assert!(matches!(
        report.error(),
        Some(MaintError::StoreOperationFailed { collection, .. }) if collection == "notes"
    ));
    assert_eq!(report.collection("journals").unwrap().mutated, 2);
    assert_eq!(report.collection("notes").unwrap().scanned, 0);
    assert_eq!(store.document_count("notes").await, 2);
}

#[tokio::test]
async fn test_reference_read_failure_aborts_before_any_collection() {
    let store =
        InMemoryDocumentStore::new().with_faults(FaultPlan::default().fail_reads_on("users"));
    seed_orphans(&store, "notes", 2).await;

    let report = reconcile(&store, &config_for(&["notes"]), CommitMode::Apply).await;

    assert!(matches!(
        report.error(),
        Some(MaintError::StoreOperationFailed { .. })
    ));
    assert!(report.collections.is_empty());
    assert_eq!(store.document_count("notes").await, 2);
}

#[tokio::test]
async fn test_reference_collection_cannot_be_target() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;

    let report = reconcile(&store, &config_for(&["users"]), CommitMode::Apply).await;

    assert!(matches!(
        report.error(),
        Some(MaintError::ConfigurationIncomplete(_))
    ));
    assert_eq!(store.document_count("users").await, 1);
}

#[tokio::test]
async fn test_empty_collection_does_not_stop_the_run() {
    let store = InMemoryDocumentStore::new();
    seed_users(&store, &["u1"]).await;
    store.insert("notes", "n1", json!({"userId": "u1"})).await;
    store.insert("notes", "n2", json!({"userId": "ghost"})).await;

    let report = reconcile(&store, &config_for(&["journals", "notes"]), CommitMode::Apply).await;

    assert!(report.is_success());
    let journals = report.collection("journals").unwrap();
    assert_eq!((journals.scanned, journals.matched, journals.commits), (0, 0, 0));
    assert_eq!(report.collection("notes").unwrap().mutated, 1);
    assert!(!store.contains("notes", "n2").await);
}

#[tokio::test]
async fn test_capacity_checked_against_store_limit() {
    let store = InMemoryDocumentStore::new().with_transaction_limit(100);
    seed_users(&store, &["u1"]).await;
    seed_orphans(&store, "notes", 2).await;

    // Default capacity 400 is valid for the configured limit of 500 only.
    let report = reconcile(&store, &config_for(&["notes"]), CommitMode::Apply).await;

    assert!(matches!(
        report.error(),
        Some(MaintError::ConfigurationIncomplete(_))
    ));
    assert!(report.collections.is_empty());
    assert_eq!(store.commit_attempts(), 0);
    assert_eq!(store.document_count("notes").await, 2);
}
