//! Headless production scheduler runner.
//!
//! Runs scenarios against a scripted world and reports what the planner
//! ordered. Reports go to stdout, logs to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Plan a single scenario
//! cargo run -p producer_headless -- plan scenarios/opening.ron
//!
//! # Same, as JSON
//! cargo run -p producer_headless -- plan scenarios/opening.ron --format json
//!
//! # Run every scenario in a directory
//! cargo run -p producer_headless -- batch scenarios --output results/batch.json
//!
//! # Check that a scenario plans identically every time
//! cargo run -p producer_headless -- verify scenarios/opening.ron --runs 10
//!
//! # Check a catalog and tunables load
//! cargo run -p producer_headless -- validate --config tuning.ron
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use producer_headless::{
    batch::{run_batch, BatchConfig},
    runner::run_scenario,
    scenario::{load_catalog, load_config, Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "producer_headless")]
#[command(about = "Headless production scheduler runner for scenario testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Type catalog RON file (defaults to the embedded Protoss catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario and print its report
    Plan {
        /// Scenario file (.ron or .json)
        scenario: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run every scenario in a directory
    Batch {
        /// Directory of scenario files
        dir: PathBuf,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Write results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a scenario several times and compare final schedules
    Verify {
        /// Scenario file (.ron or .json)
        scenario: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Load the catalog, tunables and scenarios without running them
    Validate {
        /// Planner tunables RON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Scenario files to check
        scenarios: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so reports can be piped
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Plan { scenario, format } => cmd_plan(cli.catalog.as_deref(), &scenario, format),
        Commands::Batch {
            dir,
            parallel,
            output,
        } => cmd_batch(cli.catalog.as_deref(), &dir, parallel, output.as_deref()),
        Commands::Verify { scenario, runs } => cmd_verify(cli.catalog.as_deref(), &scenario, runs),
        Commands::Validate { config, scenarios } => {
            cmd_validate(cli.catalog.as_deref(), config.as_deref(), &scenarios)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run a single scenario
fn cmd_plan(
    catalog: Option<&Path>,
    path: &Path,
    format: OutputFormat,
) -> Result<ExitCode, ScenarioError> {
    let catalog = load_catalog(catalog)?;
    let scenario = Scenario::load(path)?;
    let report = run_scenario(&scenario, &catalog)?;

    match format {
        OutputFormat::Text => print!("{}", report.render()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(ExitCode::SUCCESS)
}

/// Run a directory of scenarios
fn cmd_batch(
    catalog: Option<&Path>,
    dir: &Path,
    parallel: u32,
    output: Option<&Path>,
) -> Result<ExitCode, ScenarioError> {
    let catalog = load_catalog(catalog)?;
    let config = BatchConfig::from_dir(dir)?.with_parallel(parallel);
    let results = run_batch(config, &catalog);

    println!("{:<32} {:>6} {:>7} {:>6} {:>8}  hash", "scenario", "ticks", "orders", "items", "blocked");
    for run in &results.runs {
        println!(
            "{:<32} {:>6} {:>7} {:>6} {:>8}  {:016x}",
            run.name, run.ticks, run.orders, run.final_items, run.blocked_goals, run.final_hash
        );
    }
    for error in &results.errors {
        println!("FAILED {}: {}", error.path.display(), error.message);
    }

    if let Some(output) = output {
        results.save(output)?;
        tracing::info!("Results saved to {}", output.display());
    }

    Ok(if results.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run one scenario repeatedly and compare
fn cmd_verify(catalog: Option<&Path>, path: &Path, runs: u32) -> Result<ExitCode, ScenarioError> {
    let catalog = load_catalog(catalog)?;
    let scenario = Scenario::load(path)?;

    let mut hashes = Vec::with_capacity(runs as usize);
    for _ in 0..runs.max(1) {
        let report = run_scenario(&scenario, &catalog)?;
        hashes.push(report.final_schedule.state_hash());
    }

    if hashes.windows(2).all(|w| w[0] == w[1]) {
        println!("PASS: {} runs, final hash {:016x}", hashes.len(), hashes[0]);
        Ok(ExitCode::SUCCESS)
    } else {
        println!("FAIL: hashes differ: {:x?}", hashes);
        Ok(ExitCode::FAILURE)
    }
}

/// Load everything without running
fn cmd_validate(
    catalog: Option<&Path>,
    config: Option<&Path>,
    scenarios: &[PathBuf],
) -> Result<ExitCode, ScenarioError> {
    let catalog = load_catalog(catalog)?;
    println!("catalog: {} unit types", catalog.unit_count());

    if let Some(config) = config {
        load_config(config)?;
        println!("config: ok");
    }

    let mut failed = false;
    for path in scenarios {
        let checked = Scenario::load(path).and_then(|s| {
            s.planner_config()?;
            s.snapshot(&catalog)?;
            s.goals(&catalog)
        });
        match checked {
            Ok(goals) => println!("{}: {} goals", path.display(), goals.len()),
            Err(e) => {
                failed = true;
                println!("{}: {}", path.display(), e);
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
