//! Headless scheduler runner for scenario testing and CI verification.
//!
//! This crate drives the production scheduler against a scripted world
//! without a game attached. This enables:
//!
//! - **Scenario testing**: Check what the planner orders, tick by tick,
//!   from a described starting position
//! - **CI verification**: Run a directory of scenarios in parallel and
//!   compare final schedule hashes between revisions
//! - **Tuning**: Load alternative catalogs and tunables from RON
//!
//! # Example
//!
//! ```bash
//! # Plan a scenario and print the orders and final board
//! cargo run -p producer_headless -- plan scenarios/opening.ron
//!
//! # Run every scenario in a directory
//! cargo run -p producer_headless -- batch scenarios --output results/batch.json
//! ```

pub mod batch;
pub mod runner;
pub mod scenario;
pub mod world;

pub use batch::{run_batch, BatchConfig, BatchResults, RunSummary};
pub use runner::{run_scenario, RunReport, TickSummary};
pub use scenario::{GoalSpec, Scenario, ScenarioError, UnitSpec};
pub use world::ScriptedWorld;
