//! Batch converter service.
//!
//! Reads decoded grid records from JSON-lines files, runs the assembly
//! pipeline, and writes one dataset summary per assembled level type.

mod config;
mod sink;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use grid_assembly::{AssemblyConfig, DatasetSink, Pipeline};
use grid_common::RecordSource;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use walkdir::WalkDir;

use config::RunConfig;
use sink::JsonSummarySink;
use source::JsonLinesSource;

#[derive(Parser, Debug)]
#[command(name = "grid-converter")]
#[command(about = "Assembles decoded grid records into multi-axis datasets")]
struct Args {
    /// Input record files or directories (.jsonl, .jsonl.gz)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Run configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for dataset summaries
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Force source-at-a-time decoding
    #[arg(long)]
    sequential: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?.into_assembly_config(),
        None => AssemblyConfig::default(),
    };
    if args.sequential {
        config.sequential_decode = true;
    }

    let files = collect_input_files(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No record files found under the given inputs");
    }
    info!(files = files.len(), "Starting conversion run");

    let mut sources: Vec<Box<dyn RecordSource + Send>> = Vec::new();
    for path in &files {
        let source = JsonLinesSource::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        sources.push(Box::new(source));
    }

    let pipeline = Pipeline::new(&config);
    let output = pipeline.run_sources(sources)?;

    info!(
        records = output.record_count,
        rejected = output.rejected.len(),
        datasets = output.datasets.len(),
        "Conversion finished"
    );

    if output.datasets.is_empty() {
        info!("No dataset had anything to contribute");
        return Ok(());
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let sink = JsonSummarySink;
    for dataset in &output.datasets {
        let dest = args
            .output
            .join(format!("dataset_lt{:03}.json", dataset.axes().level_type));
        sink.write(dataset, &dest)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        info!(dest = %dest.display(), "Wrote dataset summary");
    }

    Ok(())
}

/// Expand the input arguments into a list of record files, scanning
/// directories recursively.
fn collect_input_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input) {
                let entry = entry?;
                if entry.file_type().is_file() && is_record_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    Ok(files)
}

fn is_record_file(path: &std::path::Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".jsonl") || name.ends_with(".jsonl.gz")
}
