//! Blueprint CLI
//!
//! The `blueprint` command runs the generation pipeline over a workspace.
//!
//! ## Commands
//!
//! - `generate`: Canonicalize sources, check invariants and write artifacts
//! - `check`: Verify generated output is up to date without writing
//! - `manifest`: Print the planned sources and targets
//! - `invariants`: List the invariant catalog

use anyhow::{Context, Result};
use blueprint_core::generate::reference_generators;
use blueprint_core::telemetry::init_tracing;
use blueprint_core::{EntitySchema, InvariantCatalog, StaticRegistry, WriteMode};
use blueprint_pipeline::{
    ManifestBuilder, PhaseNumber, Pipeline, PipelineConfig, PipelineResult, CONFIG_FILE,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "blueprint")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative entity and layout code generation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Workspace root
    #[arg(long, global = true, default_value = ".", env = "BLUEPRINT_ROOT")]
    root: PathBuf,

    /// Config file (default: <root>/blueprint.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Override the output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip a phase by number (repeatable, e.g. --skip 2.5)
    #[arg(long = "skip", value_name = "PHASE")]
    skip: Vec<PhaseNumber>,

    /// Write the pipeline result as JSON to this path
    #[arg(long)]
    json_report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and write generated artifacts
    Generate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Fail if regenerating would change any generated file
    Check {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the run manifest as JSON
    Manifest,

    /// List the invariant catalog with configured overrides applied
    Invariants,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(CONFIG_FILE));
    let config = PipelineConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?
        .rooted(&cli.root);

    match cli.command {
        Commands::Generate { dry_run, run } => {
            let mode = if dry_run {
                WriteMode::DryRun
            } else {
                WriteMode::Normal
            };
            cmd_run(apply_run_args(config, mode, &run), run.json_report.as_deref())
        }
        Commands::Check { run } => cmd_run(
            apply_run_args(config, WriteMode::Check, &run),
            run.json_report.as_deref(),
        ),
        Commands::Manifest => cmd_manifest(&config),
        Commands::Invariants => cmd_invariants(&config),
    }
}

/// Apply command-line overrides on top of the file config.
fn apply_run_args(config: PipelineConfig, mode: WriteMode, run: &RunArgs) -> PipelineConfig {
    let mut config = config.with_mode(mode);
    if let Some(output) = &run.output {
        config = config.with_output_dir(output.clone());
    }
    for phase in &run.skip {
        config = config.skip(*phase);
    }
    config
}

fn read_entities(path: &Path) -> Result<Vec<EntitySchema>> {
    if !path.exists() {
        info!(path = %path.display(), "no entities file, running with none");
        return Ok(Vec::new());
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse entities in {}", path.display()))
}

/// Load `<name>.json` from the registries directory. A missing file is an
/// empty registry.
fn read_registry(dir: &Path, name: &str) -> Result<StaticRegistry> {
    let path = dir.join(format!("{name}.json"));
    if !path.exists() {
        debug!(path = %path.display(), "registry file absent, using empty registry");
        return Ok(StaticRegistry::default());
    }
    StaticRegistry::from_json_file(&path)
        .with_context(|| format!("Failed to load {name} registry {}", path.display()))
}

fn build_pipeline(config: &PipelineConfig) -> Result<Pipeline> {
    let registries = &config.layout.registries_dir;
    Ok(Pipeline::new().with_registries(
        read_registry(registries, "actions")?,
        read_registry(registries, "intents")?,
    ))
}

fn cmd_run(config: PipelineConfig, json_report: Option<&Path>) -> Result<()> {
    let entities = read_entities(&config.layout.entities_file)?;
    let pipeline = build_pipeline(&config)?;

    println!("Running blueprint pipeline ({} mode)", config.mode.name());
    println!("Sources: {}", config.layout.sources_dir.display());
    println!("Output:  {}", config.layout.output_dir.display());
    println!();

    let result = pipeline.run(&entities, &config);

    if let Some(path) = json_report {
        write_report(path, &result)?;
    }
    print!("{}", render_summary(&result));

    if !result.success {
        anyhow::bail!(
            "pipeline failed with {} error(s); see above",
            result.errors.len()
        );
    }
    Ok(())
}

fn write_report(path: &Path, result: &PipelineResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!(path = %path.display(), "pipeline report written");
    Ok(())
}

fn render_summary(result: &PipelineResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Run ID: {}\n", result.run_id));
    out.push_str(&format!(
        "Status: {}\n",
        if result.success { "✓ PASSED" } else { "✗ FAILED" }
    ));
    out.push_str(&format!("Duration: {}ms\n", result.duration_ms));
    out.push_str(&format!(
        "Counts: {} canonicalized, {} violations, {} written, {} drifted\n\n",
        result.metrics.descriptors_canonicalized,
        result.metrics.violations,
        result.metrics.files_written,
        result.metrics.drift_detected
    ));

    for phase in &result.phases {
        let status = if phase.passed() {
            "✓"
        } else if phase.gating {
            "✗"
        } else {
            "!"
        };
        out.push_str(&format!(
            "  {} {:>3} {} ({}ms)\n",
            status,
            phase.phase.to_string(),
            phase.name,
            phase.duration_ms
        ));
    }

    if !result.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }
    if !result.errors.is_empty() {
        out.push_str("\nErrors:\n");
        for error in &result.errors {
            out.push_str(&format!("  - {error}\n"));
        }
    }

    out.push_str(&format!(
        "\nSummary: {}/{} phases passed\n",
        result.passed_count(),
        result.phases.len()
    ));
    out
}

fn cmd_manifest(config: &PipelineConfig) -> Result<()> {
    let entities = read_entities(&config.layout.entities_file)?;
    let manifest = ManifestBuilder::new(config, &entities)
        .artifacts(reference_generators().iter().map(|g| g.artifact()))
        .build();
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct InvariantRow {
    id: String,
    category: String,
    enforcement: String,
    severity: String,
    disabled: bool,
    title: String,
}

fn invariant_rows(catalog: &InvariantCatalog) -> Vec<InvariantRow> {
    catalog
        .iter()
        .map(|inv| InvariantRow {
            id: inv.id.clone(),
            category: format!("{:?}", inv.category).to_lowercase(),
            enforcement: format!("{:?}", inv.enforcement).to_lowercase(),
            severity: inv.severity.name().to_string(),
            disabled: catalog.is_disabled(&inv.id),
            title: inv.title.clone(),
        })
        .collect()
}

fn cmd_invariants(config: &PipelineConfig) -> Result<()> {
    let catalog = config.catalog().context("Invalid [invariants] config")?;
    for row in invariant_rows(&catalog) {
        let marker = if row.disabled { " (disabled)" } else { "" };
        println!(
            "{:<32} {:<8} {:<8} {:<6} {}{}",
            row.id, row.category, row.enforcement, row.severity, row.title, marker
        );
    }
    println!();
    println!("{} invariants", catalog.len());
    Ok(())
}
