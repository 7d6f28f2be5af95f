use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use stop_analysis::PipelineConfig;
use stop_analysis::pipeline::{run_cleaning, run_experiments, run_validation};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(
    name = "stop-analysis",
    about = "Clean traffic-stop extracts and run fairness-aware classifiers"
)]
struct Cli {
    /// JSON configuration file; missing keys use the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge the raw extracts and write the categorical validation report
    Validate,
    /// Clean, partition and export the merged extracts
    Clean,
    /// Run the classifier experiments on the exported train/test split
    Model,
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.validate()?;

    let threads = if config.modeling.threads == 0 {
        num_cpus::get()
    } else {
        config.modeling.threads
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("configuring the rayon thread pool")?;
    info!("Using {threads} worker threads");

    let start = Instant::now();
    match cli.command {
        Command::Validate => {
            let report = run_validation(&config.cleaning)?;
            let flagged = report.flagged();
            if flagged.is_empty() {
                info!("No unexpected categorical values in {} rows", report.rows);
            } else {
                for (column, value, count) in &flagged {
                    info!("Unexpected value in {column}: '{value}' x{count}");
                }
            }
        }
        Command::Clean => {
            let cleaned = run_cleaning(&config.cleaning)?;
            info!(
                "Cleaned {} records; train {} / test {}",
                cleaned.records.len(),
                cleaned.partitions.split.train.len(),
                cleaned.partitions.split.test.len()
            );
        }
        Command::Model => {
            let report = run_experiments(&config.modeling)?;
            info!(
                "Finished {} panel runs for target {}",
                report.panels.len(),
                report.target
            );
        }
    }
    info!("Done in {:?}", start.elapsed());
    Ok(())
}
