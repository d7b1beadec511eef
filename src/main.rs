use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use huge_sort::config::{DEFAULT_CORES, DEFAULT_TILE_SIZE, Job, OutputFormat, PipelineConfig};
use huge_sort::observability::{MetricsCollector, log_snapshot};
use huge_sort::pipeline::PipelineCoordinator;
use huge_sort::runner::SystemRunner;
use huge_sort::stages::StageName;
use huge_sort::validation::{ValidationReport, validate_config, validate_job};
use serde_json::to_writer_pretty;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

fn main() -> Result<()> {
    configure_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            job,
            dry_run,
            passthrough,
            print_metrics,
            metrics_json,
        } => run_job(job, dry_run, passthrough, print_metrics, metrics_json),
        Commands::Sort {
            input,
            lastools,
            bucket_size,
            tile_size,
            cores,
            temp_dir,
            output,
            format,
            verbose,
            dry_run,
            passthrough,
        } => {
            let config = PipelineConfig {
                input,
                lastools_dir: lastools,
                temp_dir,
                tile_size,
                bucket_size,
                cores,
                output,
                format,
                verbose,
            };
            report_validation(validate_config(&config), "command line")?;
            run_pipeline(config, dry_run, passthrough, false, None)
        }
        Commands::Validate { job } => validate_job_cmd(job),
        Commands::ListStages => {
            list_stages();
            Ok(())
        }
    }
}

fn configure_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}

fn run_job(
    job_path: PathBuf,
    dry_run: bool,
    passthrough: bool,
    print_metrics: bool,
    metrics_json: Option<PathBuf>,
) -> Result<()> {
    let job = Job::load(&job_path)?;
    report_validation(validate_job(&job), &job_path.display().to_string())?;
    run_pipeline(job.pipeline, dry_run, passthrough, print_metrics, metrics_json)
}

fn run_pipeline(
    config: PipelineConfig,
    dry_run: bool,
    passthrough: bool,
    print_metrics: bool,
    metrics_json: Option<PathBuf>,
) -> Result<()> {
    let mut coordinator = PipelineCoordinator::new(config, Box::new(SystemRunner))
        .with_metrics(MetricsCollector::global().clone());
    if passthrough {
        coordinator = coordinator.with_passthrough_output();
    }

    if dry_run {
        let commands = coordinator.plan()?;
        info!("Dry run; commands that a real run would execute:");
        for command in &commands {
            info!(command = %command, "Planned");
        }
        return Ok(());
    }

    let metrics_handle = coordinator.metrics();
    let report = coordinator.run()?;
    info!(
        stages = report.stages_run.len(),
        "All pipeline stages completed"
    );

    if print_metrics || metrics_json.is_some() {
        let snapshot = metrics_handle.snapshot();
        if print_metrics {
            log_snapshot(&snapshot);
        }
        if let Some(path) = metrics_json {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create metrics directory: {}", parent.display())
                })?;
            }
            let file = File::create(&path)
                .with_context(|| format!("Failed to create metrics file: {}", path.display()))?;
            to_writer_pretty(file, &snapshot)
                .with_context(|| format!("Failed to write metrics JSON: {}", path.display()))?;
            info!(metrics = %path.display(), "Metrics JSON written");
        }
    }

    Ok(())
}

fn validate_job_cmd(job_path: PathBuf) -> Result<()> {
    let job = Job::load(&job_path)?;
    let report = validate_job(&job);

    for warning in &report.warnings {
        warn!(file = %job_path.display(), "{warning}");
    }

    if report.is_ok() {
        info!(file = %job_path.display(), "Job validation passed");
        Ok(())
    } else {
        for error_msg in &report.errors {
            error!(file = %job_path.display(), "{error_msg}");
        }
        Err(anyhow!(
            "Job validation failed with {} error(s)",
            report.errors.len()
        ))
    }
}

fn report_validation(report: ValidationReport, source: &str) -> Result<()> {
    for warning in &report.warnings {
        warn!(source, "{warning}");
    }
    if !report.is_ok() {
        for error_msg in &report.errors {
            error!(source, "{error_msg}");
        }
        bail!(
            "Configuration from {source} has {} error(s)",
            report.errors.len()
        );
    }
    Ok(())
}

fn list_stages() {
    println!("Pipeline stages, in order:");
    for stage in StageName::all() {
        println!("- {stage}");
    }
}

#[derive(Parser)]
#[command(
    name = "huge-sort",
    version,
    about = "Sort huge LAS/LAZ files into a spatially coherent point order \
             via a tile-based external-tool pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tile/sort/merge/cleanup pipeline described by a job file.
    Run {
        job: PathBuf,
        /// Validate the environment and log the command lines without
        /// spawning any tool.
        #[arg(long)]
        dry_run: bool,
        /// Let the tools write to the console directly instead of
        /// capturing their output into the log.
        #[arg(long)]
        passthrough: bool,
        #[arg(long)]
        print_metrics: bool,
        #[arg(long = "metrics-json")]
        metrics_json: Option<PathBuf>,
    },
    /// Quick path: describe the run with flags instead of a job file.
    Sort {
        input: PathBuf,
        /// Install root of the LAStools executables (<root>/bin).
        #[arg(long)]
        lastools: PathBuf,
        #[arg(long = "bucket-size")]
        bucket_size: String,
        #[arg(long = "tile-size", default_value = DEFAULT_TILE_SIZE)]
        tile_size: String,
        #[arg(long, default_value_t = DEFAULT_CORES)]
        cores: u32,
        #[arg(long = "temp-dir")]
        temp_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        #[arg(short, long)]
        verbose: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        passthrough: bool,
    },
    /// Shape-check a job file and report every problem at once.
    Validate { job: PathBuf },
    /// Print the pipeline's stages in execution order.
    ListStages,
}
