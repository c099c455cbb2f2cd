use crate::core::{Document, Result};
use crate::transaction::WriteBatch;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;

/// Lazy, finite, non-restartable sequence of documents from one collection
pub type DocumentStream<'a> = BoxStream<'a, Result<Document>>;

/// Per-commit mutation ceiling assumed when a store does not declare its own
pub const DEFAULT_TRANSACTION_LIMIT: usize = 500;

/// Document store client.
///
/// Implementations own timeouts and transport. Every failure is reported as
/// `MaintError::StoreOperationFailed`; callers never retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document by id
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Fetch every document whose `field` is present and equal to `value`
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<Document>>;

    /// Stream every document of a collection. A missing collection is empty.
    async fn scan_all(&self, collection: &str) -> Result<DocumentStream<'_>>;

    /// Apply every mutation of the batch, or none of them
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Maximum number of mutations a single commit accepts
    fn transaction_limit(&self) -> usize {
        DEFAULT_TRANSACTION_LIMIT
    }
}
