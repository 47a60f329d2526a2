//! Batch scenario runner.
//!
//! Runs every scenario in a directory in parallel using rayon and
//! collects one summary per run, so a change to the planner or its
//! tunables can be checked against a whole suite at once.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use producer_core::data::TypeCatalog;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{run_scenario, RunReport};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario files to run
    pub scenarios: Vec<PathBuf>,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel: u32,
}

impl BatchConfig {
    /// Every `.ron` and `.json` scenario in a directory, in name order.
    pub fn from_dir(dir: &Path) -> Result<Self, ScenarioError> {
        if !dir.is_dir() {
            return Err(ScenarioError::FileNotFound(dir.display().to_string()));
        }
        let mut scenarios: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("ron" | "json")
                )
            })
            .collect();
        scenarios.sort();
        Ok(Self {
            scenarios,
            parallel: 0,
        })
    }

    /// Limit the number of runs in flight.
    pub fn with_parallel(mut self, parallel: u32) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Condensed result of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario file.
    pub path: PathBuf,
    /// Scenario name.
    pub name: String,
    /// Ticks planned.
    pub ticks: usize,
    /// Orders sent to the world.
    pub orders: usize,
    /// Items in the last schedule.
    pub final_items: usize,
    /// Goals the last schedule could not fully serve.
    pub blocked_goals: usize,
    /// Hash of the last schedule.
    pub final_hash: u64,
}

impl RunSummary {
    fn from_report(path: &Path, report: &RunReport) -> Self {
        Self {
            path: path.to_path_buf(),
            name: report.name.clone(),
            ticks: report.ticks.len(),
            orders: report.orders().count(),
            final_items: report.final_schedule.items.len(),
            blocked_goals: report
                .final_schedule
                .goals
                .iter()
                .filter(|g| g.blocked.is_some())
                .count(),
            final_hash: report.final_schedule.state_hash(),
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Successful runs, in scenario order
    pub runs: Vec<RunSummary>,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Scenario file
    pub path: PathBuf,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total runs
    pub total: u32,
    completed: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed run, returning the new count
    pub fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let per_run = self.start_time.elapsed().as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_run * f64::from(remaining))
    }
}

fn run_one(path: &Path, catalog: &TypeCatalog) -> Result<RunSummary, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let report = run_scenario(&scenario, catalog)?;
    Ok(RunSummary::from_report(path, &report))
}

fn run_all(config: &BatchConfig, catalog: &TypeCatalog, progress: &BatchProgress) -> Vec<Result<RunSummary, BatchError>> {
    config
        .scenarios
        .par_iter()
        .map(|path| {
            let result = run_one(path, catalog).map_err(|e| {
                warn!("Scenario {} failed: {}", path.display(), e);
                BatchError {
                    path: path.clone(),
                    message: e.to_string(),
                }
            });
            let completed = progress.record_completion();
            debug!(
                "Progress: {}/{} (eta {}s)",
                completed,
                progress.total,
                progress.eta().as_secs()
            );
            result
        })
        .collect()
}

/// Run every scenario in the batch.
pub fn run_batch(config: BatchConfig, catalog: &TypeCatalog) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.scenarios.len() as u32);

    info!("Starting batch run: {} scenarios", config.scenarios.len());

    let results = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => pool.install(|| run_all(&config, catalog, &progress)),
            Err(e) => {
                warn!("Failed to build thread pool: {}, using the global pool", e);
                run_all(&config, catalog, &progress)
            }
        }
    } else {
        run_all(&config, catalog, &progress)
    };

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<RunSummary> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} runs, {} errors in {:.1}s",
        runs.len(),
        errors.len(),
        duration_seconds
    );

    BatchResults {
        config,
        runs,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::GoalSpec;

    fn write_scenario(dir: &Path, file: &str, scenario: &Scenario) {
        let text = ron::ser::to_string_pretty(scenario, ron::ser::PrettyConfig::default()).unwrap();
        std::fs::write(dir.join(file), text).unwrap();
    }

    #[test]
    fn test_from_dir_picks_scenarios_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path(), "b.ron", &Scenario::default());
        write_scenario(dir.path(), "a.ron", &Scenario::default());
        std::fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();

        let config = BatchConfig::from_dir(dir.path()).unwrap();

        let names: Vec<_> = config
            .scenarios
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.ron", "b.ron"]);
    }

    #[test]
    fn test_batch_collects_runs_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let probes = Scenario {
            name: "Probes".to_string(),
            goals: vec![GoalSpec::unit("Protoss_Probe", 6)],
            ticks: 3,
            ..Scenario::default()
        };
        let broken = Scenario {
            goals: vec![GoalSpec::unit("Protoss_Carrierr", 1)],
            ..Scenario::default()
        };
        write_scenario(dir.path(), "probes.ron", &probes);
        write_scenario(dir.path(), "broken.ron", &broken);
        let catalog = TypeCatalog::protoss().unwrap();

        let config = BatchConfig::from_dir(dir.path()).unwrap().with_parallel(2);
        let results = run_batch(config, &catalog);

        assert_eq!(results.runs.len(), 1);
        assert_eq!(results.runs[0].name, "Probes");
        assert_eq!(results.runs[0].ticks, 3);
        assert_eq!(results.errors.len(), 1);
        assert!(results.errors[0].message.contains("Protoss_Carrierr"));
    }

    #[test]
    fn test_results_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("batch.json");
        let results = BatchResults {
            config: BatchConfig {
                scenarios: vec![PathBuf::from("a.ron")],
                parallel: 0,
            },
            runs: Vec::new(),
            duration_seconds: 0.5,
            errors: vec![BatchError {
                path: PathBuf::from("a.ron"),
                message: "boom".to_string(),
            }],
        };

        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();

        assert_eq!(loaded.errors, results.errors);
        assert_eq!(loaded.config.scenarios, results.config.scenarios);
    }
}
