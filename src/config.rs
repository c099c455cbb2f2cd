use crate::core::{Document, Identity, MaintError, Result};
use crate::storage::DEFAULT_TRANSACTION_LIMIT;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

/// Mutations per commit; kept below the store's hard limit
pub const DEFAULT_BATCH_CAPACITY: usize = 400;

pub const DEFAULT_REFERENCE_COLLECTION: &str = "users";
pub const DEFAULT_OWNER_FIELD: &str = "userId";

pub const SOURCE_IDENTITY_PLACEHOLDER: &str = "<source-identity>";
pub const TARGET_IDENTITY_PLACEHOLDER: &str = "<target-identity>";

/// Marks records that are never owner-bound: a record is exempt iff
/// `field` is present and strictly equal to `equals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemptionRule {
    pub field: String,
    pub equals: JsonValue,
}

impl ExemptionRule {
    pub fn new(field: &str, equals: JsonValue) -> Self {
        Self {
            field: field.to_string(),
            equals,
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.field(&self.field) == Some(&self.equals)
    }
}

/// Binds a target collection to the field that carries ownership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default = "default_owner_field")]
    pub owner_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exemption: Option<ExemptionRule>,
}

impl CollectionSpec {
    pub fn new(name: &str, owner_field: &str) -> Self {
        Self {
            name: name.to_string(),
            owner_field: owner_field.to_string(),
            exemption: None,
        }
    }

    /// Exempt records whose `field` equals `equals`
    pub fn exempt_when(mut self, field: &str, equals: JsonValue) -> Self {
        self.exemption = Some(ExemptionRule::new(field, equals));
        self
    }
}

/// A (collection, field) pair rewritten by the migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub collection: String,
    #[serde(default = "default_owner_field")]
    pub field: String,
}

impl FieldSpec {
    pub fn new(collection: &str, field: &str) -> Self {
        Self {
            collection: collection.to_string(),
            field: field.to_string(),
        }
    }
}

/// How the migration finds records owned by the source identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStrategy {
    /// Filtered `query_eq` on the owner field
    #[default]
    Query,
    /// Stream the whole collection and filter locally
    FullScan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub collections: Vec<CollectionSpec>,
    /// Refuse to run when the reference collection is empty
    pub abort_on_empty_reference_set: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            collections: vec![
                CollectionSpec::new("journals", DEFAULT_OWNER_FIELD),
                CollectionSpec::new("notes", DEFAULT_OWNER_FIELD),
                CollectionSpec::new("paletteModels", DEFAULT_OWNER_FIELD)
                    .exempt_when("isPredefined", JsonValue::Bool(true)),
            ],
            abort_on_empty_reference_set: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub source_identity: Identity,
    pub target_identity: Identity,
    pub fields: Vec<FieldSpec>,
    /// Check that the target exists in the reference collection first
    pub validate_target: bool,
    pub strategy: MigrationStrategy,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            source_identity: Identity::from(SOURCE_IDENTITY_PLACEHOLDER),
            target_identity: Identity::from(TARGET_IDENTITY_PLACEHOLDER),
            fields: vec![
                FieldSpec::new("journals", DEFAULT_OWNER_FIELD),
                FieldSpec::new("notes", DEFAULT_OWNER_FIELD),
                FieldSpec::new("paletteModels", DEFAULT_OWNER_FIELD),
            ],
            validate_target: true,
            strategy: MigrationStrategy::Query,
        }
    }
}

/// Run configuration, built once at start and shared read-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Collection whose document ids are the valid identities
    pub reference_collection: String,
    pub batch_capacity: usize,
    /// Hard per-commit mutation ceiling of the target store
    pub store_transaction_limit: usize,
    pub reconcile: ReconcileConfig,
    pub migrate: MigrateConfig,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            reference_collection: DEFAULT_REFERENCE_COLLECTION.to_string(),
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            store_transaction_limit: DEFAULT_TRANSACTION_LIMIT,
            reconcile: ReconcileConfig::default(),
            migrate: MigrateConfig::default(),
        }
    }
}

fn default_owner_field() -> String {
    DEFAULT_OWNER_FIELD.to_string()
}

impl MaintenanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config file. Missing keys fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MaintError::Io(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the reference collection
    pub fn reference_collection(mut self, name: &str) -> Self {
        self.reference_collection = name.to_string();
        self
    }

    /// Set the number of mutations per commit
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    /// Set the store's hard per-commit limit
    pub fn store_transaction_limit(mut self, limit: usize) -> Self {
        self.store_transaction_limit = limit;
        self
    }

    /// Replace the reconciliation targets
    pub fn reconcile_collections(mut self, collections: Vec<CollectionSpec>) -> Self {
        self.reconcile.collections = collections;
        self
    }

    pub fn abort_on_empty_reference_set(mut self, abort: bool) -> Self {
        self.reconcile.abort_on_empty_reference_set = abort;
        self
    }

    /// Set the migration source and target identities
    pub fn migrate_identities(mut self, source: &str, target: &str) -> Self {
        self.migrate.source_identity = Identity::from(source);
        self.migrate.target_identity = Identity::from(target);
        self
    }

    /// Replace the migration (collection, field) pairs
    pub fn migrate_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.migrate.fields = fields;
        self
    }

    pub fn validate_target(mut self, validate: bool) -> Self {
        self.migrate.validate_target = validate;
        self
    }

    pub fn migration_strategy(mut self, strategy: MigrationStrategy) -> Self {
        self.migrate.strategy = strategy;
        self
    }

    /// Settings shared by both procedures
    pub fn validate(&self) -> Result<()> {
        if self.reference_collection.trim().is_empty() {
            return incomplete("reference_collection cannot be empty");
        }

        if self.batch_capacity == 0 {
            return incomplete("batch_capacity must be > 0");
        }

        if self.batch_capacity >= self.store_transaction_limit {
            return incomplete(format!(
                "batch_capacity ({}) must be strictly below store_transaction_limit ({})",
                self.batch_capacity, self.store_transaction_limit
            ));
        }

        Ok(())
    }

    /// The capacity must also stay below the limit the store itself reports,
    /// which may differ from `store_transaction_limit`.
    pub fn validate_for_store(&self, store_limit: usize) -> Result<()> {
        if self.batch_capacity >= store_limit {
            return incomplete(format!(
                "batch_capacity ({}) must be strictly below the store's transaction limit ({})",
                self.batch_capacity, store_limit
            ));
        }
        Ok(())
    }

    pub fn validate_reconcile(&self) -> Result<()> {
        self.validate()?;

        if self.reconcile.collections.is_empty() {
            return incomplete("no collections configured for reconciliation");
        }

        for spec in &self.reconcile.collections {
            if spec.name.trim().is_empty() || spec.owner_field.trim().is_empty() {
                return incomplete("collection name and owner_field cannot be empty");
            }
            if spec.name == self.reference_collection {
                return incomplete(format!(
                    "reference collection '{}' cannot be a reconciliation target",
                    spec.name
                ));
            }
        }

        Ok(())
    }

    pub fn validate_migrate(&self) -> Result<()> {
        self.validate()?;

        let source = &self.migrate.source_identity;
        let target = &self.migrate.target_identity;

        if source.is_blank() || source.as_str() == SOURCE_IDENTITY_PLACEHOLDER {
            return incomplete("source_identity is not configured");
        }
        if target.is_blank() || target.as_str() == TARGET_IDENTITY_PLACEHOLDER {
            return incomplete("target_identity is not configured");
        }
        if source == target {
            return incomplete("source_identity and target_identity must differ");
        }

        if self.migrate.fields.is_empty() {
            return incomplete("no (collection, field) pairs configured for migration");
        }

        for spec in &self.migrate.fields {
            if spec.collection.trim().is_empty() || spec.field.trim().is_empty() {
                return incomplete("migration collection and field cannot be empty");
            }
        }

        Ok(())
    }
}

fn incomplete<T>(reason: impl Into<String>) -> Result<T> {
    Err(MaintError::ConfigurationIncomplete(reason.into()))
}
