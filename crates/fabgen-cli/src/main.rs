//! CLI binary for running the staged fabric config build pipeline.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use fabgen_engine::ReferenceEngine;
use fabgen_inventory::{select_hosts, Inventory};
use fabgen_pipeline::{default_workers, BuildOptions, PipelineDriver};
use fabgen_types::{ConfigEngine, FabgenError};

#[derive(Parser)]
#[command(name = "fabgen", version, about = "Staged parallel network config builder")]
struct Cli {
    /// Path to the inventory YAML file
    #[arg(short = 'i', long)]
    inventory_path: PathBuf,

    /// Output directory for structured and rendered configs
    #[arg(short = 'o', long, default_value = "intended")]
    output_path: PathBuf,

    /// Also write the derived fabric facts to this path
    #[arg(long)]
    facts_path: Option<PathBuf>,

    /// Inventory group that defines the fabric
    #[arg(short = 'f', long)]
    fabric_group: String,

    /// Comma-separated glob patterns selecting the devices to build
    #[arg(short = 'l', long)]
    limit: Option<String>,

    /// Maximum number of parallel workers
    #[arg(short = 'm', long, default_value_t = default_workers())]
    max_workers: usize,

    /// Treat validation failures as fatal
    #[arg(long)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let report = match run(&cli).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!("{err:#}");
            std::process::exit(1);
        }
    };

    if !report.success() {
        for device in &report.failed {
            tracing::error!(device = %device, "device failed to build");
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<fabgen_types::BuildReport> {
    let inventory = Inventory::load(&cli.inventory_path)?;
    let fabric = inventory.fabric_vars(&cli.fabric_group)?;
    let targets = resolve_targets(cli, &inventory, &fabric)?;

    tracing::debug!(
        inventory = %cli.inventory_path.display(),
        output = %cli.output_path.display(),
        fabric_group = %cli.fabric_group,
        devices = fabric.len(),
        targets = targets.len(),
        workers = cli.max_workers,
        strict = cli.strict,
        "resolved build settings"
    );

    let mut options = BuildOptions::new(&cli.output_path);
    options.facts_path = cli.facts_path.clone();
    options.strict = cli.strict;
    options.workers = cli.max_workers;

    let engine: Arc<dyn ConfigEngine> = Arc::new(ReferenceEngine);
    let mut driver = PipelineDriver::new(engine, options);
    let report = driver.run(fabric, targets).await?;

    tracing::info!(
        validate_ms = report.timings.validate.as_millis() as u64,
        facts_ms = report.timings.facts.as_millis() as u64,
        build_ms = report.timings.build.as_millis() as u64,
        render_ms = report.timings.render.as_millis() as u64,
        processed = report.processed,
        failed = report.failed.len(),
        "build finished"
    );
    Ok(report)
}

/// Resolve the build targets: the fabric group, narrowed by `--limit`.
///
/// The limit pattern is matched against every inventory host, then
/// intersected with the fabric group; a selection that misses the fabric
/// entirely is a usage error rather than an empty no-op run.
fn resolve_targets(
    cli: &Cli,
    inventory: &Inventory,
    fabric: &std::collections::BTreeMap<String, fabgen_types::VariableSet>,
) -> anyhow::Result<BTreeSet<String>> {
    let fabric_names: BTreeSet<String> = fabric.keys().cloned().collect();
    let Some(pattern) = cli.limit.as_deref() else {
        return Ok(fabric_names);
    };

    let selected = select_hosts(pattern, &inventory.all_device_names())?;
    let targets: BTreeSet<String> = selected.intersection(&fabric_names).cloned().collect();
    if targets.is_empty() {
        return Err(FabgenError::SelectorDisjoint {
            pattern: pattern.to_string(),
            group: cli.fabric_group.clone(),
        }
        .into());
    }
    Ok(targets)
}
