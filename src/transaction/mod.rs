// ============================================================================
// Batched Write Module
// ============================================================================
//
// Accumulate-then-commit batching under a fixed mutation ceiling.
//
// - change:   pending mutations (delete / field update)
// - state:    capacity-bounded WriteBatch and the executor lifecycle
// - executor: commits on capacity or end of input, halts on failure
//
// ============================================================================

pub mod change;
pub mod executor;
pub mod state;

pub use change::Mutation;
pub use executor::{BatchExecutor, CommitMode, CommitOutcome, ExecutorStats};
pub use state::{BatchId, ExecutorState, WriteBatch};
