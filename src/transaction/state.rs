// ============================================================================
// Batch State Management
// ============================================================================
//
// A WriteBatch is an ordered, capacity-bounded group of mutations against a
// single collection. The executor that fills it moves through:
//
//   Idle -> Accumulating -> Committing -> Idle        (batch reached capacity)
//                        -> Committing -> Done        (end of input)
//   Committing -> Aborted                             (commit failed)
//
// ============================================================================

use super::Mutation;
use crate::core::{MaintError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global batch ID counter
static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

impl BatchId {
    pub fn new() -> Self {
        BatchId(NEXT_BATCH_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch_{}", self.0)
    }
}

/// Executor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// No pending mutations
    Idle,

    /// Current batch holds at least one mutation
    Accumulating,

    /// A commit is in flight
    Committing,

    /// Input exhausted and remainder flushed
    Done,

    /// A commit failed; nothing more may be enqueued
    Aborted,
}

impl ExecutorState {
    pub fn accepts_mutations(&self) -> bool {
        matches!(self, ExecutorState::Idle | ExecutorState::Accumulating)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutorState::Done | ExecutorState::Aborted)
    }
}

impl std::fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorState::Idle => write!(f, "IDLE"),
            ExecutorState::Accumulating => write!(f, "ACCUMULATING"),
            ExecutorState::Committing => write!(f, "COMMITTING"),
            ExecutorState::Done => write!(f, "DONE"),
            ExecutorState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Capacity-bounded group of mutations against one collection
#[derive(Debug, Clone)]
pub struct WriteBatch {
    id: BatchId,
    collection: String,
    capacity: usize,
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new(collection: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: BatchId::new(),
            collection: collection.into(),
            capacity,
            mutations: Vec::with_capacity(capacity.min(512)),
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.mutations.len() >= self.capacity
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }

    /// Append a mutation
    ///
    /// # Errors
    /// Returns error if the batch is full or the mutation targets another
    /// collection
    pub fn push(&mut self, mutation: Mutation) -> Result<()> {
        if mutation.collection() != self.collection {
            return Err(MaintError::InvalidBatchState(format!(
                "{} belongs to '{}' but mutation targets '{}'",
                self.id,
                self.collection,
                mutation.collection()
            )));
        }

        if self.is_full() {
            return Err(MaintError::InvalidBatchState(format!(
                "{} is full ({} mutations)",
                self.id, self.capacity
            )));
        }

        self.mutations.push(mutation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DocumentRef;

    fn delete(collection: &str, id: &str) -> Mutation {
        Mutation::delete(DocumentRef::new(collection, id))
    }

    #[test]
    fn test_batch_id_generation() {
        let id1 = BatchId::new();
        let id2 = BatchId::new();
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn test_batch_fills_to_capacity() {
        let mut batch = WriteBatch::new("notes", 2);
        batch.push(delete("notes", "a")).unwrap();
        assert!(!batch.is_full());
        batch.push(delete("notes", "b")).unwrap();
        assert!(batch.is_full());
        assert!(batch.push(delete("notes", "c")).is_err());
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_batch_rejects_foreign_collection() {
        let mut batch = WriteBatch::new("notes", 10);
        assert!(batch.push(delete("journals", "a")).is_err());
        assert!(batch.is_empty());
    }

    #[test]
    fn test_executor_state_flags() {
        assert!(ExecutorState::Idle.accepts_mutations());
        assert!(ExecutorState::Accumulating.accepts_mutations());
        assert!(!ExecutorState::Committing.accepts_mutations());
        assert!(ExecutorState::Aborted.is_terminal());
        assert!(ExecutorState::Done.is_terminal());
        assert_eq!(ExecutorState::Aborted.to_string(), "ABORTED");
    }
}
