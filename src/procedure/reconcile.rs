use super::CollectionPass;
use crate::config::{CollectionSpec, MaintenanceConfig};
use crate::core::{MaintError, Result};
use crate::policy::{Classification, MembershipOracle, Retention, classify};
use crate::report::{ProcedureKind, RunReport};
use crate::storage::DocumentStore;
use crate::transaction::{CommitMode, Mutation};
use futures::TryStreamExt;
use tracing::{Instrument, Level, event, info_span};

/// Orphan cleanup: delete records whose owner no longer resolves.
pub struct Reconciler<'a> {
    store: &'a dyn DocumentStore,
    config: &'a MaintenanceConfig,
    mode: CommitMode,
}

impl<'a> Reconciler<'a> {
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

    pub async fn run(&self, oracle: &MembershipOracle) -> RunReport {
        let mut report = RunReport::new(ProcedureKind::Reconcile, self.mode == CommitMode::DryRun);

        if let Err(err) = self
            .config
            .validate_reconcile()
            .and_then(|_| self.config.validate_for_store(self.store.transaction_limit()))
        {
            return report.abort(err);
        }

        if let Some(warning) = oracle.warning() {
            if self.config.reconcile.abort_on_empty_reference_set {
                return report.abort(MaintError::EmptyReferenceSet(oracle.collection().to_string()));
            }
            report.warn(warning);
        }

        for spec in &self.config.reconcile.collections {
            let mut pass = match CollectionPass::open(
                self.store,
                self.config,
                self.mode,
                &spec.name,
                &spec.owner_field,
            ) {
                Ok(pass) => pass,
                Err(err) => return report.abort(err),
            };

            let span = info_span!("reconcile.collection", collection = %spec.name);
            let result = self.sweep(spec, oracle, &mut pass).instrument(span).await;
            report.record(pass.into_report());

            if let Err(err) = result {
                event!(Level::ERROR, collection = %spec.name, error = %err, "reconciliation halted");
                return report.abort(err);
            }
        }

        report.complete()
    }

    async fn sweep(
        &self,
        spec: &CollectionSpec,
        oracle: &MembershipOracle,
        pass: &mut CollectionPass<'_>,
    ) -> Result<()> {
        let mut documents = self.store.scan_all(&spec.name).await?;

        while let Some(doc) = documents.try_next().await? {
            pass.counts_mut().scanned += 1;

            match classify(&doc, spec, oracle) {
                Classification::Exempt => pass.counts_mut().exempt += 1,
                Classification::Valid(Retention::OwnerAmbiguous) => {
                    pass.counts_mut().ambiguous += 1;
                    event!(
                        Level::DEBUG,
                        document = %doc.reference,
                        value = ?doc.field(&spec.owner_field),
                        "owner field is null, blank or not a string; kept"
                    );
                }
                Classification::Valid(_) => {}
                Classification::Actionable => {
                    event!(
                        Level::DEBUG,
                        document = %doc.reference,
                        owner = ?doc.field(&spec.owner_field),
                        "orphan scheduled for deletion"
                    );
                    pass.submit(Mutation::delete(doc.reference)).await?;
                }
            }
        }

        pass.finish().await?;

        let counts = pass.counts_mut();
        event!(
            Level::INFO,
            scanned = counts.scanned,
            matched = counts.matched,
            deleted = counts.mutated,
            exempt = counts.exempt,
            ambiguous = counts.ambiguous,
            "collection reconciled"
        );
        Ok(())
    }
}

/// Load the identity snapshot, then reconcile every configured collection.
///
/// Configuration problems and a failed snapshot load abort before any
/// collection is read.
pub async fn reconcile(
    store: &dyn DocumentStore,
    config: &MaintenanceConfig,
    mode: CommitMode,
) -> RunReport {
    let dry_run = mode == CommitMode::DryRun;

    if let Err(err) = config
        .validate_reconcile()
        .and_then(|_| config.validate_for_store(store.transaction_limit()))
    {
        return RunReport::new(ProcedureKind::Reconcile, dry_run).abort(err);
    }

    let oracle = match MembershipOracle::load(store, &config.reference_collection).await {
        Ok(oracle) => oracle,
        Err(err) => return RunReport::new(ProcedureKind::Reconcile, dry_run).abort(err),
    };

    Reconciler::new(store, config).mode(mode).run(&oracle).await
}
