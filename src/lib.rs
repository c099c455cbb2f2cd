// ============================================================================
// docsweep Library
// ============================================================================
//
// Orphan reconciliation and ownership migration for multi-collection
// document stores, batched under a per-transaction mutation ceiling.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod policy;
pub mod procedure;
pub mod report;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use config::{
    CollectionSpec, ExemptionRule, FieldSpec, MaintenanceConfig, MigrationStrategy,
};
pub use crate::core::{Document, DocumentRef, Identity, MaintError, Result};
pub use policy::{Classification, MembershipOracle, Retention, classify};
pub use procedure::{Migrator, Reconciler, migrate, reconcile};
pub use report::{CollectionReport, RunReport, RunStatus, RunWarning};
pub use storage::{DocumentStore, InMemoryDocumentStore, SnapshotManager};
pub use transaction::{BatchExecutor, CommitMode, CommitOutcome, Mutation, WriteBatch};

// ============================================================================
// High-level Client API
// ============================================================================

/// Maintenance session over one document store
///
/// Bundles a store with an immutable configuration so both procedures can be
/// run against the same settings.
///
/// # Examples
///
/// ```
/// use docsweep::{CollectionSpec, InMemoryDocumentStore, MaintenanceConfig, Maintenance};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = InMemoryDocumentStore::new();
/// store.insert("users", "u1", json!({})).await;
/// store.insert("notes", "n1", json!({"userId": "u1"})).await;
/// store.insert("notes", "n2", json!({"userId": "ghost"})).await;
///
/// let config = MaintenanceConfig::new()
///     .reconcile_collections(vec![CollectionSpec::new("notes", "userId")]);
///
/// let report = Maintenance::new(&store, config).reconcile().await;
/// assert!(report.is_success());
/// assert_eq!(report.totals.mutated, 1);
/// # }
/// ```
pub struct Maintenance<'s> {
    store: &'s dyn DocumentStore,
    config: MaintenanceConfig,
    mode: CommitMode,
}

impl<'s> Maintenance<'s> {
    pub fn new(store: &'s dyn DocumentStore, config: MaintenanceConfig) -> Self {
        Self {
            store,
            config,
            mode: CommitMode::Apply,
        }
    }

    /// Count what would change without committing anything
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.mode = if enabled {
            CommitMode::DryRun
        } else {
            CommitMode::Apply
        };
        self
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    /// Delete records whose owner no longer resolves
    pub async fn reconcile(&self) -> RunReport {
        reconcile(self.store, &self.config, self.mode).await
    }

    /// Rewrite the owner field from the configured source to the target
    pub async fn migrate(&self) -> RunReport {
        migrate(self.store, &self.config, self.mode).await
    }
}
