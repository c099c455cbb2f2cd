use super::engine::{DEFAULT_TRANSACTION_LIMIT, DocumentStore, DocumentStream};
use crate::core::{Document, Fields, MaintError, Result};
use crate::transaction::{Mutation, WriteBatch};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Collection name -> document id -> fields
pub type CollectionMap = BTreeMap<String, BTreeMap<String, Fields>>;

/// Injected failures, used to exercise abort paths
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// 1-based commit attempt numbers that fail
    pub failing_commits: HashSet<usize>,
    /// Collections whose reads fail
    pub failing_reads: HashSet<String>,
}

impl FaultPlan {
    pub fn fail_commit(mut self, attempt: usize) -> Self {
        self.failing_commits.insert(attempt);
        self
    }

    pub fn fail_reads_on(mut self, collection: &str) -> Self {
        self.failing_reads.insert(collection.to_string());
        self
    }
}

/// One successful commit, as seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub collection: String,
    pub size: usize,
}

pub struct InMemoryDocumentStore {
    collections: RwLock<CollectionMap>,
    transaction_limit: usize,
    faults: Mutex<FaultPlan>,
    commit_attempts: AtomicUsize,
    commit_log: Mutex<Vec<CommitRecord>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::from_collections(CollectionMap::new())
    }

    pub fn from_collections(collections: CollectionMap) -> Self {
        Self {
            collections: RwLock::new(collections),
            transaction_limit: DEFAULT_TRANSACTION_LIMIT,
            faults: Mutex::new(FaultPlan::default()),
            commit_attempts: AtomicUsize::new(0),
            commit_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_transaction_limit(mut self, limit: usize) -> Self {
        self.transaction_limit = limit;
        self
    }

    pub fn with_faults(self, plan: FaultPlan) -> Self {
        self.set_faults(plan);
        self
    }

    pub fn set_faults(&self, plan: FaultPlan) {
        *self.faults.lock().unwrap_or_else(|e| e.into_inner()) = plan;
    }

    /// Insert or replace a document. Non-object JSON is stored as an empty
    /// document.
    pub async fn insert(&self, collection: &str, id: &str, fields: JsonValue) {
        let fields = match fields {
            JsonValue::Object(map) => map,
            _ => Fields::new(),
        };
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    pub async fn contains(&self, collection: &str, id: &str) -> bool {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id))
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, |docs| docs.len())
    }

    pub async fn collection_names(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }

    /// Deep copy of the current contents
    pub async fn export(&self) -> CollectionMap {
        self.collections.read().await.clone()
    }

    /// Successful commits in the order they were applied
    pub fn commit_log(&self) -> Vec<CommitRecord> {
        self.commit_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn commit_attempts(&self) -> usize {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    fn check_read(&self, collection: &str) -> Result<()> {
        let faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        if faults.failing_reads.contains(collection) {
            return Err(MaintError::store(collection, "injected read failure"));
        }
        Ok(())
    }

    fn snapshot_of(collections: &CollectionMap, collection: &str) -> Vec<Document> {
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(collection, id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_read(collection)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(collection, id, fields.clone())))
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<Document>> {
        self.check_read(collection)?;
        let collections = self.collections.read().await;
        Ok(Self::snapshot_of(&collections, collection)
            .into_iter()
            .filter(|doc| doc.field(field) == Some(value))
            .collect())
    }

    async fn scan_all(&self, collection: &str) -> Result<DocumentStream<'_>> {
        self.check_read(collection)?;
        // Copy out so that commits issued while the stream is consumed do
        // not contend with the read lock.
        let docs = {
            let collections = self.collections.read().await;
            Self::snapshot_of(&collections, collection)
        };
        Ok(futures::stream::iter(docs.into_iter().map(Ok)).boxed())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let attempt = self.commit_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let collection = batch.collection().to_string();

        {
            let faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
            if faults.failing_commits.contains(&attempt) {
                return Err(MaintError::store(
                    &collection,
                    format!("injected commit failure on attempt {attempt}"),
                ));
            }
        }

        if batch.len() > self.transaction_limit {
            return Err(MaintError::store(
                &collection,
                format!(
                    "batch of {} mutations exceeds transaction limit {}",
                    batch.len(),
                    self.transaction_limit
                ),
            ));
        }

        let size = batch.len();
        let mut collections = self.collections.write().await;

        // Validate everything before applying anything.
        let existing = collections.get(&collection);
        for mutation in batch.mutations() {
            if let Mutation::Update { target, .. } = mutation {
                if !existing.is_some_and(|docs| docs.contains_key(&target.id)) {
                    return Err(MaintError::store(
                        &collection,
                        format!("cannot update missing document {target}"),
                    ));
                }
            }
        }

        // Deletes against a missing collection are no-ops.
        if let Some(docs) = collections.get_mut(&collection) {
            for mutation in batch.into_mutations() {
                match mutation {
                    Mutation::Delete { target } => {
                        docs.remove(&target.id);
                    }
                    Mutation::Update { target, fields } => {
                        if let Some(existing) = docs.get_mut(&target.id) {
                            existing.extend(fields);
                        }
                    }
                }
            }
        }
        drop(collections);

        self.commit_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CommitRecord { collection, size });
        Ok(())
    }

    fn transaction_limit(&self) -> usize {
        self.transaction_limit
    }
}
