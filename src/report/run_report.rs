use crate::core::{MaintError, Result};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    Reconcile,
    Migrate,
}

impl std::fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcedureKind::Reconcile => write!(f, "reconcile"),
            ProcedureKind::Migrate => write!(f, "migrate"),
        }
    }
}

/// Non-fatal conditions surfaced to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    EmptyReferenceSet { collection: String },
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunWarning::EmptyReferenceSet { collection } => write!(
                f,
                "reference collection '{}' is empty; every owned record was treated as orphan",
                collection
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Aborted(MaintError),
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Aborted(_) => "aborted",
        }
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let error = match self {
            RunStatus::Aborted(err) => Some(err),
            _ => None,
        };
        let mut state = serializer.serialize_struct("RunStatus", 3)?;
        state.serialize_field("state", self.label())?;
        state.serialize_field("error_kind", &error.map(|e| e.kind()))?;
        state.serialize_field("error", &error.map(|e| e.to_string()))?;
        state.end()
    }
}

/// Counters for one collection (or one collection/field pair)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub field: String,
    /// Records read
    pub scanned: usize,
    /// Records classified actionable and enqueued
    pub matched: usize,
    /// Mutations whose batch committed
    pub mutated: usize,
    pub exempt: usize,
    /// Owner field present but null, blank, or not a string
    pub ambiguous: usize,
    pub commits: usize,
}

impl CollectionReport {
    pub fn new(collection: &str, field: &str) -> Self {
        Self {
            collection: collection.to_string(),
            field: field.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub scanned: usize,
    pub matched: usize,
    pub mutated: usize,
    pub exempt: usize,
    pub ambiguous: usize,
    pub commits: usize,
}

impl RunTotals {
    fn add(&mut self, collection: &CollectionReport) {
        self.scanned += collection.scanned;
        self.matched += collection.matched;
        self.mutated += collection.mutated;
        self.exempt += collection.exempt;
        self.ambiguous += collection.ambiguous;
        self.commits += collection.commits;
    }
}

/// Outcome of one run. Accumulates monotonically and is emitted once.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub procedure: ProcedureKind,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub collections: Vec<CollectionReport>,
    pub totals: RunTotals,
    pub warnings: Vec<RunWarning>,
    pub status: RunStatus,
}

impl RunReport {
    pub fn new(procedure: ProcedureKind, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            procedure,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            collections: Vec::new(),
            totals: RunTotals::default(),
            warnings: Vec::new(),
            status: RunStatus::Running,
        }
    }

    /// Append the counters of a finished (or interrupted) collection
    pub fn record(&mut self, collection: CollectionReport) {
        self.totals.add(&collection);
        self.collections.push(collection);
    }

    pub fn warn(&mut self, warning: RunWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    pub fn complete(mut self) -> Self {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn abort(mut self, error: MaintError) -> Self {
        self.status = RunStatus::Aborted(error);
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn error(&self) -> Option<&MaintError> {
        match &self.status {
            RunStatus::Aborted(err) => Some(err),
            _ => None,
        }
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.collection == name)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate() {
        let mut report = RunReport::new(ProcedureKind::Reconcile, false);
        report.record(CollectionReport {
            scanned: 4,
            matched: 1,
            mutated: 1,
            commits: 1,
            ..CollectionReport::new("notes", "userId")
        });
        report.record(CollectionReport {
            scanned: 3,
            exempt: 2,
            ..CollectionReport::new("paletteModels", "userId")
        });

        assert_eq!(report.totals.scanned, 7);
        assert_eq!(report.totals.matched, 1);
        assert_eq!(report.totals.exempt, 2);
        assert_eq!(report.collection("notes").unwrap().mutated, 1);

        let report = report.complete();
        assert!(report.is_success());
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_aborted_status_json() {
        let report = RunReport::new(ProcedureKind::Migrate, false)
            .abort(MaintError::UnknownTargetIdentity("u2".into()));
        assert!(!report.is_success());

        let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["status"]["state"], "aborted");
        assert_eq!(value["status"]["error_kind"], "unknown_target_identity");
        assert_eq!(value["procedure"], "migrate");
    }

    #[test]
    fn test_warnings_deduplicated() {
        let mut report = RunReport::new(ProcedureKind::Reconcile, true);
        let w = RunWarning::EmptyReferenceSet { collection: "users".into() };
        report.warn(w.clone());
        report.warn(w);
        assert_eq!(report.warnings.len(), 1);
    }
}
