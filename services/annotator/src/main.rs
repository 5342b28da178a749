//! Metadata annotator service.
//!
//! Annotates one local granule with the override rules configured for its
//! collection and writes the result to a new file.

mod config;
mod mime;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{LogFormat, ServiceConfig};
use metadata_annotator::{annotate_granule, GranuleOutcome, RuleConfig};
use netcdf_tree::engine_for_path;

#[derive(Parser, Debug)]
#[command(name = "annotator")]
#[command(about = "Apply metadata overrides to a NetCDF-4/HDF5 granule")]
struct Args {
    /// Input granule
    #[arg(short, long)]
    input: PathBuf,

    /// Output file, or a directory to write the input's file name into
    #[arg(short, long)]
    output: PathBuf,

    /// Collection short name selecting the override rules
    #[arg(long)]
    collection: String,

    /// Override rule configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (json or pretty)
    #[arg(long)]
    log_format: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = ServiceConfig::from_env().with_overrides(
        args.config.clone(),
        args.log_format.as_deref(),
        args.log_level.as_deref(),
    );

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Annotation failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &ServiceConfig) -> Result<()> {
    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    match config.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }
    Ok(())
}

fn run(args: &Args, config: &ServiceConfig) -> Result<()> {
    info!(
        input = %args.input.display(),
        collection = %args.collection,
        rules = %config.rules_file.display(),
        "Starting metadata annotator"
    );

    let rules = RuleConfig::from_file(&config.rules_file).with_context(|| {
        format!("Failed to load rules from {}", config.rules_file.display())
    })?;

    let output = output_path(&args.input, &args.output)?;
    let engine = engine_for_path(&args.input)
        .with_context(|| format!("No engine for {}", args.input.display()))?;

    let outcome = annotate_granule(
        engine.as_ref(),
        &args.input,
        &output,
        &rules,
        &args.collection,
        Utc::now(),
    )
    .with_context(|| format!("Failed to annotate {}", args.input.display()))?;

    info!(
        output = %output.display(),
        mime_type = mime::get_mimetype(&output),
        copied = outcome == GranuleOutcome::Copied,
        "Wrote output granule"
    );
    Ok(())
}

/// Resolve the output file, reusing the input file name when `output` is a
/// directory.
fn output_path(input: &Path, output: &Path) -> Result<PathBuf> {
    if !output.is_dir() {
        return Ok(output.to_path_buf());
    }
    let file_name = input
        .file_name()
        .with_context(|| format!("Input {} has no file name", input.display()))?;
    Ok(output.join(file_name))
}
