mod render;
mod run_report;

pub use run_report::{
    CollectionReport, ProcedureKind, RunReport, RunStatus, RunTotals, RunWarning,
};
