use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaintError {
    #[error("Configuration incomplete: {0}")]
    ConfigurationIncomplete(String),

    #[error("Target identity '{0}' does not exist in the reference collection")]
    UnknownTargetIdentity(String),

    #[error("Reference collection '{0}' is empty; refusing to treat every owned record as orphan")]
    EmptyReferenceSet(String),

    #[error("Store operation failed on '{collection}': {cause}")]
    StoreOperationFailed { collection: String, cause: String },

    #[error("Batch commit failed on '{collection}' ({attempted_count} mutations): {cause}")]
    BatchCommitFailed {
        collection: String,
        attempted_count: usize,
        cause: String,
    },

    #[error("Invalid batch state: {0}")]
    InvalidBatchState(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MaintError {
    pub fn store(collection: impl Into<String>, cause: impl ToString) -> Self {
        Self::StoreOperationFailed {
            collection: collection.into(),
            cause: cause.to_string(),
        }
    }

    /// Stable snake_case tag, used by the JSON report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationIncomplete(_) => "configuration_incomplete",
            Self::UnknownTargetIdentity(_) => "unknown_target_identity",
            Self::EmptyReferenceSet(_) => "empty_reference_set",
            Self::StoreOperationFailed { .. } => "store_operation_failed",
            Self::BatchCommitFailed { .. } => "batch_commit_failed",
            Self::InvalidBatchState(_) => "invalid_batch_state",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }

    /// True for failures raised before the store was touched.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationIncomplete(_)
                | Self::UnknownTargetIdentity(_)
                | Self::EmptyReferenceSet(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MaintError>;

impl From<std::io::Error> for MaintError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MaintError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_failure_message_carries_context() {
        let err = MaintError::BatchCommitFailed {
            collection: "notes".to_string(),
            attempted_count: 400,
            cause: "deadline exceeded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("notes"));
        assert!(msg.contains("400"));
        assert!(msg.contains("deadline exceeded"));
        assert_eq!(err.kind(), "batch_commit_failed");
        assert!(!err.is_preflight());
    }

    #[test]
    fn test_preflight_classification() {
        assert!(MaintError::UnknownTargetIdentity("u9".into()).is_preflight());
        assert!(MaintError::ConfigurationIncomplete("x".into()).is_preflight());
        assert!(!MaintError::store("users", "boom").is_preflight());
    }
}
