//! JSON snapshot persistence for the in-memory document store

use super::memory::{CollectionMap, InMemoryDocumentStore};
use crate::core::{MaintError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub collections: CollectionMap,
}

fn default_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

impl StoreSnapshot {
    pub fn new(collections: CollectionMap) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            collections,
        }
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(|docs| docs.len()).sum()
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }

    /// Write the snapshot through a temp file in the same directory, then
    /// rename it over the target.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let dir = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| MaintError::Io(format!("Failed to create snapshot directory: {}", e)))?;

        let temp = NamedTempFile::new_in(&dir)
            .map_err(|e| MaintError::Io(format!("Failed to create temp file: {}", e)))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer
                .flush()
                .map_err(|e| MaintError::Io(format!("Failed to flush snapshot: {}", e)))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| MaintError::Io(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| MaintError::Io(format!("Failed to rename snapshot: {}", e.error)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<StoreSnapshot> {
        let file = File::open(&self.snapshot_path).map_err(|e| {
            MaintError::Io(format!(
                "Failed to open snapshot '{}': {}",
                self.snapshot_path.display(),
                e
            ))
        })?;
        let snapshot: StoreSnapshot = serde_json::from_reader(BufReader::new(file))?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(MaintError::Serialization(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(snapshot)
    }

    pub async fn load_store(&self) -> Result<InMemoryDocumentStore> {
        let snapshot = self.load()?;
        Ok(InMemoryDocumentStore::from_collections(snapshot.collections))
    }

    pub async fn save_store(&self, store: &InMemoryDocumentStore) -> Result<()> {
        let snapshot = StoreSnapshot::new(store.export().await);
        self.save(&snapshot)
    }
}
