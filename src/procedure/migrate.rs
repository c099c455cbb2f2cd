use super::CollectionPass;
use crate::config::{FieldSpec, MaintenanceConfig, MigrationStrategy};
use crate::core::{MaintError, Result};
use crate::policy::{MembershipOracle, owner_matches};
use crate::report::{ProcedureKind, RunReport};
use crate::storage::{DocumentStore, DocumentStream};
use crate::transaction::{CommitMode, Mutation};
use futures::{StreamExt, TryStreamExt};
use serde_json::Value as JsonValue;
use tracing::{Instrument, Level, event, info_span};

/// Ownership rewrite: move every record owned by the source identity to the
/// target identity.
pub struct Migrator<'a> {
    store: &'a dyn DocumentStore,
    config: &'a MaintenanceConfig,
    mode: CommitMode,
}

impl<'a> Migrator<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: &'a MaintenanceConfig) -> Self {
        Self {
            store,
            config,
            mode: CommitMode::Apply,
        }
    }

    pub fn mode(mut self, mode: CommitMode) -> Self {
        self.mode = mode;
        self
    }

    /// `oracle` is required when target validation is enabled.
    pub async fn run(&self, oracle: Option<&MembershipOracle>) -> RunReport {
        let mut report = RunReport::new(ProcedureKind::Migrate, self.mode == CommitMode::DryRun);

        if let Err(err) = self.preflight(oracle) {
            event!(Level::ERROR, error = %err, "migration refused before touching the store");
            return report.abort(err);
        }

        let migrate = &self.config.migrate;
        event!(
            Level::INFO,
            source = %migrate.source_identity,
            target = %migrate.target_identity,
            pairs = migrate.fields.len(),
            "starting ownership migration"
        );

        for spec in &migrate.fields {
            let mut pass = match CollectionPass::open(
                self.store,
                self.config,
                self.mode,
                &spec.collection,
                &spec.field,
            ) {
                Ok(pass) => pass,
                Err(err) => return report.abort(err),
            };

            let span = info_span!("migrate.collection", collection = %spec.collection, field = %spec.field);
            let result = self.sweep(spec, &mut pass).instrument(span).await;
            report.record(pass.into_report());

            if let Err(err) = result {
                event!(Level::ERROR, collection = %spec.collection, error = %err, "migration halted");
                return report.abort(err);
            }
        }

        report.complete()
    }

    fn preflight(&self, oracle: Option<&MembershipOracle>) -> Result<()> {
        self.config.validate_migrate()?;
        self.config.validate_for_store(self.store.transaction_limit())?;

        if !self.config.migrate.validate_target {
            return Ok(());
        }

        let target = &self.config.migrate.target_identity;
        let oracle = oracle.ok_or_else(|| {
            MaintError::ConfigurationIncomplete(
                "target validation is enabled but no identity snapshot was loaded".to_string(),
            )
        })?;

        if !oracle.is_valid(target.as_str()) {
            return Err(MaintError::UnknownTargetIdentity(target.to_string()));
        }

        event!(Level::INFO, target = %target, "target identity confirmed");
        Ok(())
    }

    async fn candidates(&self, spec: &FieldSpec) -> Result<DocumentStream<'a>> {
        let source = &self.config.migrate.source_identity;
        match self.config.migrate.strategy {
            MigrationStrategy::Query => {
                let value = JsonValue::String(source.as_str().to_string());
                let docs = self.store.query_eq(&spec.collection, &spec.field, &value).await?;
                Ok(futures::stream::iter(docs.into_iter().map(Ok)).boxed())
            }
            MigrationStrategy::FullScan => self.store.scan_all(&spec.collection).await,
        }
    }

    async fn sweep(&self, spec: &FieldSpec, pass: &mut CollectionPass<'_>) -> Result<()> {
        let source = &self.config.migrate.source_identity;
        let target = &self.config.migrate.target_identity;
        let mut documents = self.candidates(spec).await?;

        while let Some(doc) = documents.try_next().await? {
            pass.counts_mut().scanned += 1;

            if !owner_matches(&doc, &spec.field, source) {
                continue;
            }

            event!(Level::DEBUG, document = %doc.reference, "owner rewrite scheduled");
            pass.submit(Mutation::set_field(doc.reference, &spec.field, target.as_str()))
                .await?;
        }

        pass.finish().await?;

        let counts = pass.counts_mut();
        event!(
            Level::INFO,
            scanned = counts.scanned,
            matched = counts.matched,
            updated = counts.mutated,
            "collection migrated"
        );
        Ok(())
    }
}

/// Validate the configuration and the target identity, then migrate every
/// configured (collection, field) pair.
pub async fn migrate(
    store: &dyn DocumentStore,
    config: &MaintenanceConfig,
    mode: CommitMode,
) -> RunReport {
    let dry_run = mode == CommitMode::DryRun;

    if let Err(err) = config
        .validate_migrate()
        .and_then(|_| config.validate_for_store(store.transaction_limit()))
    {
        return RunReport::new(ProcedureKind::Migrate, dry_run).abort(err);
    }

    let oracle = if config.migrate.validate_target {
        let target = &config.migrate.target_identity;
        match MembershipOracle::load_subset(store, &config.reference_collection, &[target]).await {
            Ok(oracle) => Some(oracle),
            Err(err) => return RunReport::new(ProcedureKind::Migrate, dry_run).abort(err),
        }
    } else {
        None
    };

    Migrator::new(store, config).mode(mode).run(oracle.as_ref()).await
}
