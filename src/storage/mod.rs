pub mod engine;
pub mod memory;
pub mod persistence;

pub use engine::{DEFAULT_TRANSACTION_LIMIT, DocumentStore, DocumentStream};
pub use memory::{CollectionMap, CommitRecord, FaultPlan, InMemoryDocumentStore};
pub use persistence::{SnapshotManager, StoreSnapshot};
