//! # Batch Coder CLI (`bcoder`)
//!
//! Collects documents, sends each one to the remote coding service in
//! bounded concurrent windows, and exports the coded results together with
//! their analytics.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bcoder run <INPUT>...` | Ingest, dispatch, export and summarize |
//! | `bcoder scan <INPUT>...` | Show what would be sent, without any network I/O |
//! | `bcoder analyze <RESULTS_JSON>` | Recompute analytics for a previous JSON export |
//!
//! ## Examples
//!
//! ```bash
//! # Process a folder and an archive with 5 requests per window
//! bcoder run ./handouts ./batch.zip --concurrency 5
//!
//! # Only write JSON, into a custom directory
//! bcoder run notes.pdf --format json --output ./out
//!
//! # Machine-readable progress on stderr
//! bcoder run ./handouts --progress json 2> progress.jsonl
//! ```

use std::path::PathBuf;

use anyhow::{bail, Result};
use batch_coder::analytics::analyze;
use batch_coder::batch::{Batch, BatchCounts};
use batch_coder::client::HttpAnalysisClient;
use batch_coder::config::{self, Config};
use batch_coder::export::json::load_results_json;
use batch_coder::export::{export_all, ExportFormat, ExportMeta};
use batch_coder::fileset::VirtualFileSet;
use batch_coder::progress::ProgressMode;
use batch_coder::{ingest, logging, report};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

/// Batch Coder CLI: bulk document submission and coding analytics.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "bcoder",
    about = "Batch Coder: bulk document submission and coding analytics",
    version,
    long_about = "Batch Coder normalizes files, folders and ZIP archives into one document set, \
    sends each document to the remote coding service in bounded concurrent windows, and exports \
    the results as CSV, XLSX and JSON together with per-code analytics."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bcoder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process documents end to end.
    ///
    /// Every input is ingested, every accepted document is sent once, and
    /// every document yields exactly one result row, failed or not.
    Run {
        /// Files, folders or `.zip` archives.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Requests per window (overrides `[dispatch].concurrency`).
        #[arg(long)]
        concurrency: Option<usize>,

        /// Progress on stderr: off, human or json. Defaults to human on a TTY.
        #[arg(long)]
        progress: Option<ProgressMode>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// List what `run` would send, without contacting the service.
    Scan {
        /// Files, folders or `.zip` archives.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Recompute analytics for a previous JSON export and export again.
    Analyze {
        /// A JSON export written by `bcoder run`.
        results: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Export format; repeatable (overrides `[export].formats`).
    #[arg(long = "format")]
    formats: Vec<ExportFormat>,

    /// Output directory (overrides `[export].output_dir`).
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ExportArgs {
    fn resolve(&self, cfg: &Config) -> (Vec<ExportFormat>, PathBuf) {
        let formats = if self.formats.is_empty() {
            cfg.export.formats.clone()
        } else {
            self.formats.clone()
        };
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| cfg.export.output_dir.clone());
        (formats, output)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            inputs,
            concurrency,
            progress,
            export,
        } => {
            run_batch(&cfg, &inputs, concurrency, progress, &export).await?;
        }
        Commands::Scan { inputs } => {
            let mut set = VirtualFileSet::new();
            let ingested = ingest::collect_inputs(&inputs, &cfg, &mut set)?;
            report::print_scan(&set, &ingested);
        }
        Commands::Analyze { results, export } => {
            let rows = load_results_json(&results)?;
            let (formats, output) = export.resolve(&cfg);
            let written = export_all(
                &rows,
                &formats,
                &output,
                &cfg.export.file_stem,
                &ExportMeta::new(Uuid::new_v4()),
            )?;
            report::print_run(&BatchCounts::of(&rows), &rows, &written);
            report::print_analytics(&analyze(&rows));
        }
    }

    Ok(())
}

async fn run_batch(
    cfg: &Config,
    inputs: &[PathBuf],
    concurrency: Option<usize>,
    progress: Option<ProgressMode>,
    export: &ExportArgs,
) -> Result<()> {
    let concurrency = concurrency.unwrap_or(cfg.dispatch.concurrency);
    if concurrency == 0 {
        bail!("--concurrency must be >= 1");
    }

    let mut batch = Batch::new();
    let ingested = ingest::collect_inputs(inputs, cfg, batch.files_mut())?;
    for (path, reason) in &ingested.failed_archives {
        eprintln!("warning: archive {} was not expanded: {}", path, reason);
    }
    if !ingested.rejected.is_empty() {
        eprintln!(
            "warning: {} unsupported file(s) ignored",
            ingested.rejected.len()
        );
    }
    if batch.files().is_empty() {
        bail!("No supported documents found in the given inputs");
    }
    info!(documents = batch.files().len(), batch = %batch.id(), "batch collected");

    let client = HttpAnalysisClient::new(&cfg.remote)?;
    info!(url = client.url(), concurrency, "sending documents");
    let reporter = progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();
    batch.run(&client, concurrency, reporter.as_ref()).await?;

    let (formats, output) = export.resolve(cfg);
    let written = export_all(
        batch.results(),
        &formats,
        &output,
        &cfg.export.file_stem,
        &ExportMeta::new(batch.id()),
    )?;

    report::print_run(&batch.counts(), batch.results(), &written);
    report::print_analytics(&analyze(batch.results()));
    Ok(())
}
