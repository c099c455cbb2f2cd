// ============================================================================
// Batched Mutation Executor
// ============================================================================
//
// Accumulates mutations for one collection into capacity-bounded batches and
// commits each batch when it fills up or when input ends. A failed commit is
// terminal: the executor refuses further work and the caller halts the run.
//
// ============================================================================

use super::{ExecutorState, Mutation, WriteBatch};
use crate::core::{MaintError, Result};
use crate::storage::DocumentStore;
use tracing::{Level, event};

/// Whether batches are sent to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    #[default]
    Apply,
    /// Batches are sized and counted but never committed
    DryRun,
}

/// Result of a flush request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Batch not full yet (or empty remainder); nothing sent
    Pending,

    /// A batch of this many mutations was committed
    Committed(usize),

    /// Dry run: a batch of this many mutations would have been committed
    Skipped(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub enqueued: usize,
    pub commits: usize,
    pub committed_mutations: usize,
}

pub struct BatchExecutor<'s> {
    store: &'s dyn DocumentStore,
    collection: String,
    mode: CommitMode,
    batch: WriteBatch,
    state: ExecutorState,
    stats: ExecutorStats,
}

impl<'s> BatchExecutor<'s> {
    /// Create an executor for one collection
    ///
    /// # Errors
    /// Returns `ConfigurationIncomplete` if the capacity is zero or not
    /// strictly below the store's transaction limit
    pub fn new(
        store: &'s dyn DocumentStore,
        collection: impl Into<String>,
        capacity: usize,
        mode: CommitMode,
    ) -> Result<Self> {
        let limit = store.transaction_limit();
        if capacity == 0 || capacity >= limit {
            return Err(MaintError::ConfigurationIncomplete(format!(
                "batch capacity {} must be between 1 and {} (store limit {})",
                capacity,
                limit.saturating_sub(1),
                limit
            )));
        }

        let collection = collection.into();
        Ok(Self {
            store,
            batch: WriteBatch::new(collection.clone(), capacity),
            collection,
            mode,
            state: ExecutorState::Idle,
            stats: ExecutorStats::default(),
        })
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Append a mutation to the current batch
    ///
    /// # Errors
    /// Returns `InvalidBatchState` after `Done`/`Aborted`, when the current
    /// batch is full, or when the mutation targets another collection
    pub fn enqueue(&mut self, mutation: Mutation) -> Result<()> {
        if !self.state.accepts_mutations() {
            return Err(MaintError::InvalidBatchState(format!(
                "cannot enqueue into '{}': executor is {}",
                self.collection, self.state
            )));
        }

        self.batch.push(mutation)?;
        self.stats.enqueued += 1;
        self.state = ExecutorState::Accumulating;
        Ok(())
    }

    /// Commit the current batch if it reached capacity
    pub async fn flush_if_full(&mut self) -> Result<CommitOutcome> {
        if !self.batch.is_full() {
            return Ok(CommitOutcome::Pending);
        }
        self.commit_current().await
    }

    /// Commit whatever is left and finish
    pub async fn flush_remainder(&mut self) -> Result<CommitOutcome> {
        if self.state.is_terminal() {
            return Err(MaintError::InvalidBatchState(format!(
                "cannot flush '{}': executor is {}",
                self.collection, self.state
            )));
        }

        let outcome = if self.batch.is_empty() {
            CommitOutcome::Pending
        } else {
            self.commit_current().await?
        };
        self.state = ExecutorState::Done;
        Ok(outcome)
    }

    async fn commit_current(&mut self) -> Result<CommitOutcome> {
        self.state = ExecutorState::Committing;
        let capacity = self.batch.capacity();
        let batch = std::mem::replace(
            &mut self.batch,
            WriteBatch::new(self.collection.clone(), capacity),
        );
        let size = batch.len();
        let batch_id = batch.id();

        if self.mode == CommitMode::DryRun {
            event!(
                Level::INFO,
                collection = %self.collection,
                batch = %batch_id,
                size,
                "dry run: batch not committed"
            );
            self.state = ExecutorState::Idle;
            return Ok(CommitOutcome::Skipped(size));
        }

        match self.store.commit(batch).await {
            Ok(()) => {
                self.stats.commits += 1;
                self.stats.committed_mutations += size;
                self.state = ExecutorState::Idle;
                event!(
                    Level::INFO,
                    collection = %self.collection,
                    batch = %batch_id,
                    size,
                    "batch committed"
                );
                Ok(CommitOutcome::Committed(size))
            }
            Err(err) => {
                self.state = ExecutorState::Aborted;
                event!(
                    Level::ERROR,
                    collection = %self.collection,
                    batch = %batch_id,
                    size,
                    error = %err,
                    "batch commit failed"
                );
                Err(MaintError::BatchCommitFailed {
                    collection: self.collection.clone(),
                    attempted_count: size,
                    cause: err.to_string(),
                })
            }
        }
    }
}
