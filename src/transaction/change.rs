// ============================================================================
// Pending Mutations
// ============================================================================
//
// A Mutation is one pending write against a single document. Mutations are
// accumulated into a WriteBatch and applied together when the batch commits.
//
// ============================================================================

use crate::core::{DocumentRef, Fields};

/// A single pending write
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Remove the document
    Delete { target: DocumentRef },

    /// Overwrite the listed fields, leaving the others untouched
    Update { target: DocumentRef, fields: Fields },
}

impl Mutation {
    pub fn delete(target: DocumentRef) -> Self {
        Mutation::Delete { target }
    }

    /// Update that sets a single field to a string value
    pub fn set_field(target: DocumentRef, field: &str, value: impl Into<String>) -> Self {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), serde_json::Value::String(value.into()));
        Mutation::Update { target, fields }
    }

    pub fn target(&self) -> &DocumentRef {
        match self {
            Mutation::Delete { target } => target,
            Mutation::Update { target, .. } => target,
        }
    }

    pub fn collection(&self) -> &str {
        &self.target().collection
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Mutation::Delete { .. })
    }
}
