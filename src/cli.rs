use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::sweep::StagnationSweep;
use crate::telemetry;
use crate::workflows::casework::{
    CaseLifecycleService, CatalogSet, CatalogVariant, InMemoryCaseStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "Amparo",
    about = "Run the case lifecycle engine for municipal social-assistance casework",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the periodic stagnation sweep (default command)
    Sweep(SweepArgs),
    /// Print the configured stage catalogs and display mapping
    Catalogs(CatalogArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Emit the catalogs as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    /// Override the configured sweep interval in seconds
    #[arg(long)]
    pub(crate) interval_secs: Option<u64>,
    /// Run a single pass and exit instead of looping
    #[arg(long)]
    pub(crate) once: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Sweep(SweepArgs::default()));

    match command {
        Command::Sweep(args) => run_sweep(args).await,
        Command::Catalogs(args) => print_catalogs(args),
    }
}

async fn run_sweep(mut args: SweepArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(interval_secs) = args.interval_secs.take() {
        config.sweep.interval_secs = interval_secs;
    }

    telemetry::init(&config.telemetry)?;

    // Stand-in store so the sweep can run out of the box; deployments plug a
    // real CaseStore implementation in front of their database.
    let store = Arc::new(InMemoryCaseStore::new());
    let service = Arc::new(CaseLifecycleService::new(
        Arc::new(CatalogSet::builtin()),
        store,
        config.sweep.validation_sla_days,
    ));
    let sweep = StagnationSweep::new(
        service,
        Duration::from_secs(config.sweep.interval_secs),
    );

    if args.once {
        let summary = sweep.pass(Utc::now(), None)?;
        info!(
            examined = summary.examined,
            stagnant = summary.stagnant,
            conflicts = summary.conflicts,
            errors = summary.errors,
            "single sweep pass finished"
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    info!(
        ?config.environment,
        interval_secs = config.sweep.interval_secs,
        validation_sla_days = config.sweep.validation_sla_days,
        "stagnation sweep ready"
    );

    sweep.run(shutdown_rx).await;
    Ok(())
}

fn print_catalogs(args: CatalogArgs) -> Result<(), AppError> {
    let catalogs = CatalogSet::builtin();

    if args.json {
        let payload = serde_json::json!({
            "version": catalogs.version(),
            "operational": catalogs.operational().stages(),
            "visual": catalogs.visual().stages(),
        });
        println!("{payload:#}");
        return Ok(());
    }

    for variant in [CatalogVariant::Operational, CatalogVariant::Visual] {
        let catalog = catalogs.catalog(variant);
        println!("{} catalog (v{}):", variant, catalogs.version());
        for stage in catalog.stages() {
            let gate = if stage.requires_validation {
                "  [validação]"
            } else {
                ""
            };
            println!(
                "  {:>2}. {:<16} {:<32} prazo {:>3}d{}",
                stage.order, stage.code, stage.title, stage.default_sla_days, gate
            );
        }
        println!();
    }

    println!("display mapping (operational -> visual):");
    for extended in catalogs.mapping().extended_codes() {
        println!(
            "  {:<16} -> {}",
            extended,
            catalogs.mapping().to_simplified(extended)
        );
    }

    Ok(())
}
