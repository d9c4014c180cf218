use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use sales_pipeline::generate::{self, DatasetSpec};
use sales_pipeline::{log, Bucket, PipelineConfig, Stage, StageReport, StageRunner};

/// Staged sales analytics over CSV objects in a bucket
#[derive(Parser)]
#[command(name = "sales-pipeline", version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a configuration file (defaults to ./pipeline.{toml,yaml,json} if present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single stage
    Run {
        #[arg(value_enum)]
        stage: Stage,
    },
    /// Run all four stages in order, stopping at the first failure
    RunAll,
    /// List the object keys in the bucket
    List,
    /// Upload a synthetic raw dataset under the dataset key
    Generate {
        /// Number of rows to generate
        #[arg(short = 'n', long, default_value = "1000")]
        rows: usize,

        /// Share of rows with a broken quantity or price
        #[arg(long, default_value = "0.05")]
        malformed_ratio: f64,

        /// Seed for reproducible datasets
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    // Logging is not up yet, so config errors go to stderr through the return.
    let cfg = PipelineConfig::load(cli.config.as_deref())?;
    let _guard = log::init_logging(cli.verbose, cfg.log_dir.as_deref());

    match run(cli.command, cfg).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("{e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(command: Commands, cfg: PipelineConfig) -> anyhow::Result<()> {
    let bucket = Bucket::connect(&cfg.store)?;
    let runner = StageRunner::new(bucket, cfg.keys);

    match command {
        Commands::Run { stage } => {
            let report = runner.run(stage).await?;
            log_report(&report);
        }
        Commands::RunAll => {
            for report in runner.run_all().await? {
                log_report(&report);
            }
        }
        Commands::List => {
            for key in runner.bucket().keys().await? {
                println!("{key}");
            }
        }
        Commands::Generate {
            rows,
            malformed_ratio,
            seed,
        } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let spec = DatasetSpec {
                rows,
                malformed_ratio,
            };
            let body = generate::generate_dataset(spec, &mut rng)?;
            runner.upload_dataset(body).await?;
            info!(
                rows,
                key = %runner.keys().dataset,
                bucket = runner.bucket().name(),
                "dataset generated"
            );
        }
    }
    Ok(())
}

fn log_report(report: &StageReport) {
    info!(
        stage = %report.stage,
        input = %report.input_key,
        rows_read = report.rows_read,
        rows_written = report.rows_written,
        outputs = ?report.outputs,
        "stage finished"
    );
}
