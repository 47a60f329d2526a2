//! Tick loop for a single scenario.
//!
//! Each tick the planner captures the scripted world, plans, and issues
//! whatever is due; the world then runs forward `tick_frames` frames.

use std::fmt::Write as _;

use producer_core::commands::IssuedCommand;
use producer_core::data::TypeCatalog;
use producer_core::goals::{ProductionGoal, UnitGoal};
use producer_core::schedule::Schedule;
use producer_core::ProductionPlanner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::{Scenario, ScenarioError};
use crate::world::ScriptedWorld;

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Game frame of the tick.
    pub frame: i32,
    /// Bank at the start of the tick.
    pub minerals: i32,
    /// Bank at the start of the tick.
    pub gas: i32,
    /// Items in the schedule.
    pub planned: usize,
    /// Commands sent to the world.
    pub commands: Vec<IssuedCommand>,
}

/// A finished scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name.
    pub name: String,
    /// One entry per tick.
    pub ticks: Vec<TickSummary>,
    /// Schedule of the last tick.
    pub final_schedule: Schedule,
    /// Frame the run ended on.
    pub final_frame: i32,
}

impl RunReport {
    /// Total commands issued over the run.
    pub fn command_count(&self) -> usize {
        self.ticks.iter().map(|t| t.commands.len()).sum()
    }

    /// Commands other than the per-tick gas worker update.
    pub fn orders(&self) -> impl Iterator<Item = &IssuedCommand> {
        self.ticks
            .iter()
            .flat_map(|t| &t.commands)
            .filter(|c| !matches!(c, IssuedCommand::GasWorkers { .. }))
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} ===", self.name);
        for tick in &self.ticks {
            for command in &tick.commands {
                if matches!(command, IssuedCommand::GasWorkers { .. }) {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "[{:>6}] {:>5}m {:>5}g  {:?}",
                    tick.frame, tick.minerals, tick.gas, command
                );
            }
        }
        let _ = writeln!(out, "--- final schedule (frame {}) ---", self.final_frame);
        out.push_str(&self.final_schedule.board());
        out
    }
}

/// The part of each goal the world has not reached yet.
///
/// Scenario goals are totals; the planner wants what is still missing.
fn outstanding(goals: &[ProductionGoal], world: &ScriptedWorld) -> Vec<ProductionGoal> {
    goals
        .iter()
        .filter_map(|goal| match goal {
            ProductionGoal::Unit(unit) => match unit.count {
                Some(count) => {
                    let have = world.count_all(unit.unit_type) as u32;
                    let left = count.saturating_sub(have);
                    (left > 0).then(|| {
                        UnitGoal {
                            count: Some(left),
                            ..unit.clone()
                        }
                        .into()
                    })
                }
                None => Some(goal.clone()),
            },
            ProductionGoal::Upgrade(upgrade) => {
                (world.upgrade_level(upgrade.upgrade) < upgrade.level).then(|| goal.clone())
            }
        })
        .collect()
}

/// Run a scenario to completion.
pub fn run_scenario(scenario: &Scenario, catalog: &TypeCatalog) -> Result<RunReport, ScenarioError> {
    let config = scenario.planner_config()?;
    let planner = ProductionPlanner::new(catalog.clone(), config.clone())?;
    let goals = scenario.goals(catalog)?;
    let mut world = ScriptedWorld::from_scenario(scenario, catalog, &config)?;

    info!(scenario = %scenario.name, ticks = scenario.ticks, goals = goals.len(), "running scenario");

    let mut ticks = Vec::with_capacity(scenario.ticks as usize);
    let mut final_schedule = None;
    for _ in 0..scenario.ticks.max(1) {
        let (minerals, gas) = world.bank();
        let frame = world.frame();
        let goals = outstanding(&goals, &world);
        let report = planner.plan_tick(&mut world.collaborators(), &goals, &scenario.reservations);
        debug!(frame, planned = report.schedule.items.len(), commands = report.commands.len(), "tick");

        ticks.push(TickSummary {
            frame,
            minerals,
            gas,
            planned: report.schedule.items.len(),
            commands: report.commands,
        });
        final_schedule = Some(report.schedule);
        world.advance(scenario.tick_frames);
    }

    Ok(RunReport {
        name: scenario.name.clone(),
        ticks,
        final_schedule: final_schedule.unwrap_or_default(),
        final_frame: world.frame(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::GoalSpec;

    #[test]
    fn test_single_tick_trains_probe() {
        let catalog = TypeCatalog::protoss().unwrap();
        let scenario = Scenario {
            goals: vec![GoalSpec::unit("Protoss_Probe", 5)],
            ..Scenario::default()
        };

        let report = run_scenario(&scenario, &catalog).unwrap();

        assert_eq!(report.ticks.len(), 1);
        assert!(report
            .orders()
            .any(|c| matches!(c, IssuedCommand::Train { .. })));
        assert!(report.render().contains(&scenario.name));
    }

    #[test]
    fn test_reached_goals_are_dropped() {
        let catalog = TypeCatalog::protoss().unwrap();
        let scenario = Scenario {
            minerals: 500,
            goals: vec![GoalSpec::unit("Protoss_Probe", 4)],
            ..Scenario::default()
        };

        let report = run_scenario(&scenario, &catalog).unwrap();

        assert_eq!(report.orders().count(), 0);
        assert!(report.final_schedule.items.is_empty());
    }

    #[test]
    fn test_multi_tick_run_builds_pylon() {
        let catalog = TypeCatalog::protoss().unwrap();
        let scenario = Scenario {
            minerals: 150,
            goals: vec![GoalSpec::unit("Protoss_Pylon", 1)],
            ticks: 40,
            tick_frames: 24,
            ..Scenario::default()
        };

        let report = run_scenario(&scenario, &catalog).unwrap();

        let builds = report
            .orders()
            .filter(|c| matches!(c, IssuedCommand::Build { .. }))
            .count();
        assert_eq!(builds, 1, "{}", report.render());
        assert_eq!(report.final_frame, 40 * 24);
    }

    #[test]
    fn test_runs_are_repeatable() {
        let catalog = TypeCatalog::protoss().unwrap();
        let scenario = Scenario {
            minerals: 400,
            goals: vec![
                GoalSpec::unit("Protoss_Probe", 7),
                GoalSpec::unit("Protoss_Gateway", 1),
            ],
            ticks: 10,
            ..Scenario::default()
        };

        let first = run_scenario(&scenario, &catalog).unwrap();
        let second = run_scenario(&scenario, &catalog).unwrap();

        assert_eq!(first, second);
    }
}
