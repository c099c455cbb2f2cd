use super::prompt::{self, Planned};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use docsweep::report::ProcedureKind;
use docsweep::{
    CommitMode, Identity, MaintenanceConfig, MigrationStrategy, RunReport, SnapshotManager,
    migrate, reconcile,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, event};

#[derive(Parser, Debug)]
#[command(name = "docsweep")]
#[command(about = "Orphan cleanup and ownership migration for document stores")]
pub struct Cli {
    /// JSON configuration file; defaults apply to missing keys
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Store snapshot to operate on
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    /// Count what would change without committing
    #[arg(long, global = true)]
    pub dry_run: bool,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delete records whose owner is missing from the reference collection
    Reconcile,
    /// Rewrite the owner field from one identity to another
    Migrate {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Do not check that the target exists in the reference collection
        #[arg(long)]
        skip_target_check: bool,
        /// Scan every record instead of querying on the owner field
        #[arg(long)]
        full_scan: bool,
    },
    /// Print the effective configuration as JSON
    Config,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied
    pub fn effective_config(&self) -> Result<MaintenanceConfig> {
        let mut config = match &self.config {
            Some(path) => MaintenanceConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => MaintenanceConfig::default(),
        };

        if let Command::Migrate {
            from,
            to,
            skip_target_check,
            full_scan,
        } = &self.command
        {
            if let Some(from) = from {
                config.migrate.source_identity = Identity::from(from.as_str());
            }
            if let Some(to) = to {
                config.migrate.target_identity = Identity::from(to.as_str());
            }
            if *skip_target_check {
                config.migrate.validate_target = false;
            }
            if *full_scan {
                config.migrate.strategy = MigrationStrategy::FullScan;
            }
        }

        Ok(config)
    }

    fn mode(&self) -> CommitMode {
        if self.dry_run {
            CommitMode::DryRun
        } else {
            CommitMode::Apply
        }
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.effective_config()?;

    let procedure = match cli.command {
        Command::Config => {
            println!("{}", config.to_json_pretty()?);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Reconcile => ProcedureKind::Reconcile,
        Command::Migrate { .. } => ProcedureKind::Migrate,
    };

    let store_path = cli
        .store
        .as_deref()
        .ok_or_else(|| anyhow!("--store <snapshot.json> is required for '{}'", procedure))?;
    let mode = cli.mode();

    if mode == CommitMode::Apply && !cli.yes && preflight(procedure, &config).is_ok() {
        let planned = match procedure {
            ProcedureKind::Reconcile => Planned::Reconcile,
            ProcedureKind::Migrate => Planned::Migrate {
                from: config.migrate.source_identity.as_str(),
                to: config.migrate.target_identity.as_str(),
            },
        };
        if !prompt::confirm(&prompt::banner(store_path, &config, &planned)).await? {
            eprintln!("Cancelled. The store was not modified.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let snapshots = SnapshotManager::new(store_path);
    let store = snapshots
        .load_store()
        .await
        .with_context(|| format!("failed to load store snapshot {}", store_path.display()))?
        .with_transaction_limit(config.store_transaction_limit);

    let report = match procedure {
        ProcedureKind::Reconcile => reconcile(&store, &config, mode).await,
        ProcedureKind::Migrate => migrate(&store, &config, mode).await,
    };

    print_report(&report, cli.format)?;

    // Committed batches stay applied after an abort, so they are persisted too.
    if mode == CommitMode::Apply && report.totals.commits > 0 {
        snapshots
            .save_store(&store)
            .await
            .with_context(|| format!("failed to save store snapshot {}", snapshots.path().display()))?;
        event!(Level::INFO, path = %snapshots.path().display(), "store snapshot saved");
    }

    Ok(exit_code(&report))
}

fn preflight(procedure: ProcedureKind, config: &MaintenanceConfig) -> docsweep::Result<()> {
    match procedure {
        ProcedureKind::Reconcile => config.validate_reconcile(),
        ProcedureKind::Migrate => config.validate_migrate(),
    }
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json_pretty()?),
    }
    Ok(())
}

fn exit_code(report: &RunReport) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
