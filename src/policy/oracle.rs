use crate::core::{Identity, MaintError, Result};
use crate::report::RunWarning;
use crate::storage::DocumentStore;
use futures::TryStreamExt;
use std::collections::HashSet;
use tracing::{info, warn};

/// Snapshot of the valid owner identities, loaded once per run.
#[derive(Debug, Clone)]
pub struct MembershipOracle {
    collection: String,
    identities: HashSet<String>,
}

impl MembershipOracle {
    /// Read every document id of the reference collection
    pub async fn load(store: &dyn DocumentStore, collection: &str) -> Result<Self> {
        let identities: HashSet<String> = store
            .scan_all(collection)
            .await?
            .map_ok(|doc| doc.reference.id)
            .try_collect()
            .await
            .map_err(|err| match err {
                err @ MaintError::StoreOperationFailed { .. } => err,
                other => MaintError::store(collection, other),
            })?;

        let oracle = Self::from_identities(collection, identities);
        oracle.log_loaded();
        Ok(oracle)
    }

    /// Point lookups for just the given identities
    pub async fn load_subset(
        store: &dyn DocumentStore,
        collection: &str,
        candidates: &[&Identity],
    ) -> Result<Self> {
        let mut identities = HashSet::new();
        for candidate in candidates {
            if store.get(collection, candidate.as_str()).await?.is_some() {
                identities.insert(candidate.as_str().to_string());
            }
        }
        Ok(Self::from_identities(collection, identities))
    }

    pub fn from_identities<I, S>(collection: &str, identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection: collection.to_string(),
            identities: identities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_valid(&self, identity: &str) -> bool {
        self.identities.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// An empty set would make every owned record an orphan, which almost
    /// always means the wrong collection or project.
    pub fn warning(&self) -> Option<RunWarning> {
        self.is_empty().then(|| RunWarning::EmptyReferenceSet {
            collection: self.collection.clone(),
        })
    }

    fn log_loaded(&self) {
        if self.is_empty() {
            warn!(
                collection = %self.collection,
                "reference collection is empty; every owned record will be treated as orphan"
            );
        } else {
            info!(collection = %self.collection, identities = self.len(), "valid identities loaded");
        }
    }
}
