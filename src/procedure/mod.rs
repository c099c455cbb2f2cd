//! The two maintenance procedures.
//!
//! Both walk their configured collections strictly in order, feed one
//! `BatchExecutor` per collection, and stop the whole run at the first fatal
//! error. Batches committed before the failure stay applied.

pub mod migrate;
pub mod reconcile;

pub use migrate::{Migrator, migrate};
pub use reconcile::{Reconciler, reconcile};

use crate::config::MaintenanceConfig;
use crate::core::Result;
use crate::report::CollectionReport;
use crate::storage::DocumentStore;
use crate::transaction::{BatchExecutor, CommitMode, Mutation};

/// Executor plus counters for one collection
pub(crate) struct CollectionPass<'s> {
    executor: BatchExecutor<'s>,
    counts: CollectionReport,
}

impl<'s> CollectionPass<'s> {
    pub(crate) fn open(
        store: &'s dyn DocumentStore,
        config: &MaintenanceConfig,
        mode: CommitMode,
        collection: &str,
        field: &str,
    ) -> Result<Self> {
        Ok(Self {
            executor: BatchExecutor::new(store, collection, config.batch_capacity, mode)?,
            counts: CollectionReport::new(collection, field),
        })
    }

    pub(crate) fn counts_mut(&mut self) -> &mut CollectionReport {
        &mut self.counts
    }

    /// Enqueue an actionable record and commit if the batch is full
    pub(crate) async fn submit(&mut self, mutation: Mutation) -> Result<()> {
        self.counts.matched += 1;
        self.executor.enqueue(mutation)?;
        let flushed = self.executor.flush_if_full().await;
        self.sync();
        flushed.map(|_| ())
    }

    /// Commit the remainder at end of input
    pub(crate) async fn finish(&mut self) -> Result<()> {
        let flushed = self.executor.flush_remainder().await;
        self.sync();
        flushed.map(|_| ())
    }

    pub(crate) fn into_report(mut self) -> CollectionReport {
        self.sync();
        self.counts
    }

    fn sync(&mut self) {
        let stats = self.executor.stats();
        self.counts.mutated = stats.committed_mutations;
        self.counts.commits = stats.commits;
    }
}
