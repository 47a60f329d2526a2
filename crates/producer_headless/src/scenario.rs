//! Scenario loading and configuration.
//!
//! Scenarios describe a starting economy and a prioritized goal list by
//! type name. They are written in RON or JSON (picked by file extension)
//! and resolved against a [`TypeCatalog`] before planning.

use std::path::Path;

use producer_core::config::PlannerConfig;
use producer_core::data::TypeCatalog;
use producer_core::error::PlannerError;
use producer_core::goals::{MineralReservation, ProductionGoal, UnitGoal, UpgradeGoal};
use producer_core::snapshot::{BuildLocation, OwnUnit, PoweredLocation, TickSnapshot, WorkerCounts};
use producer_core::types::{ItemLocation, RegionId, TilePosition, UnitId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to parse JSON.
    #[error("Failed to parse scenario JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    /// The extension is neither `.ron` nor `.json`.
    #[error("Unsupported scenario format: {0}")]
    UnsupportedFormat(String),
    /// A unit name the catalog does not know.
    #[error("Unknown unit type '{0}'")]
    UnknownUnit(String),
    /// An upgrade name the catalog does not know.
    #[error("Unknown upgrade '{0}'")]
    UnknownUpgrade(String),
    /// Catalog or configuration rejected by the planner.
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

/// Units present at the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Catalog name.
    pub unit: String,
    /// How many.
    #[serde(default = "one")]
    pub count: u32,
}

impl UnitSpec {
    /// `count` completed units of a type.
    pub fn new(unit: impl Into<String>, count: u32) -> Self {
        Self {
            unit: unit.into(),
            count,
        }
    }
}

fn one() -> u32 {
    1
}

fn default_tick_frames() -> i32 {
    24
}

fn default_builder_frames() -> i32 {
    60
}

/// A goal written by type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalSpec {
    /// Units or buildings.
    Unit {
        /// Catalog name.
        unit: String,
        /// How many, `None` for as many as possible.
        #[serde(default)]
        count: Option<u32>,
        /// Producer limit.
        #[serde(default)]
        producer_limit: Option<u32>,
        /// Region to build in.
        #[serde(default)]
        region: Option<u32>,
        /// Absolute completion frame.
        #[serde(default)]
        target_frame: Option<i32>,
    },
    /// An upgrade level or tech.
    Upgrade {
        /// Catalog name.
        upgrade: String,
        /// Level to reach.
        #[serde(default = "one_level")]
        level: u8,
        /// Extra building required first.
        #[serde(default)]
        prerequisite: Option<String>,
        /// Absolute completion frame.
        #[serde(default)]
        target_frame: Option<i32>,
    },
}

fn one_level() -> u8 {
    1
}

impl GoalSpec {
    /// Goal for `count` units of a type.
    pub fn unit(unit: impl Into<String>, count: u32) -> Self {
        Self::Unit {
            unit: unit.into(),
            count: Some(count),
            producer_limit: None,
            region: None,
            target_frame: None,
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Starting game frame.
    #[serde(default)]
    pub frame: i32,
    /// Banked minerals.
    #[serde(default)]
    pub minerals: i32,
    /// Banked gas.
    #[serde(default)]
    pub gas: i32,
    /// Supply used.
    #[serde(default)]
    pub supply_used: i32,
    /// Supply total.
    #[serde(default)]
    pub supply_total: i32,
    /// Workers mining minerals.
    #[serde(default)]
    pub mineral_workers: i32,
    /// Workers mining gas.
    #[serde(default)]
    pub gas_workers: i32,
    /// Completed units at the start.
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    /// Power source sites in the main base, each powering one large and
    /// one medium location.
    #[serde(default)]
    pub power_sites: u32,
    /// Free gas geysers.
    #[serde(default)]
    pub geysers: u32,
    /// Builder travel frames to every generated location.
    #[serde(default = "default_builder_frames")]
    pub builder_frames: i32,
    /// Goals, highest priority first.
    #[serde(default)]
    pub goals: Vec<GoalSpec>,
    /// Minerals set aside for other systems.
    #[serde(default)]
    pub reservations: Vec<MineralReservation>,
    /// Number of ticks to run.
    #[serde(default = "one")]
    pub ticks: u32,
    /// Frames between ticks.
    #[serde(default = "default_tick_frames")]
    pub tick_frames: i32,
    /// Planner tunables, defaults when absent.
    #[serde(default)]
    pub config: Option<PlannerConfig>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Opening".to_string(),
            description: "Nexus, four probes and a few pylon sites".to_string(),
            frame: 0,
            minerals: 50,
            gas: 0,
            supply_used: 8,
            supply_total: 18,
            mineral_workers: 4,
            gas_workers: 0,
            units: vec![UnitSpec::new("Protoss_Nexus", 1), UnitSpec::new("Protoss_Probe", 4)],
            power_sites: 4,
            geysers: 1,
            builder_frames: default_builder_frames(),
            goals: Vec::new(),
            reservations: Vec::new(),
            ticks: 1,
            tick_frames: default_tick_frames(),
            config: None,
        }
    }
}

impl Scenario {
    /// Load a scenario from a `.ron` or `.json` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Self::from_ron_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            _ => Err(ScenarioError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Load from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        Ok(scenario)
    }

    /// Planner tunables for this scenario.
    pub fn planner_config(&self) -> Result<PlannerConfig, ScenarioError> {
        let config = self.config.clone().unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// The starting snapshot.
    pub fn snapshot(&self, catalog: &TypeCatalog) -> Result<TickSnapshot, ScenarioError> {
        let mut units = Vec::new();
        let mut next_id = 1;
        for spec in &self.units {
            let unit_type = catalog
                .unit_id(&spec.unit)
                .ok_or_else(|| ScenarioError::UnknownUnit(spec.unit.clone()))?;
            for _ in 0..spec.count {
                units.push(OwnUnit {
                    id: UnitId(next_id),
                    unit_type,
                    completed: true,
                    base: None,
                    tile: TilePosition::default(),
                    remaining_train_time: 0,
                    remaining_research_time: 0,
                    last_command: None,
                });
                next_id += 1;
            }
        }

        let build_locations = (0..self.power_sites as i32)
            .map(|i| self.power_site(i * 10, 0))
            .collect();
        let extractor_sites = (0..self.geysers as i32)
            .map(|i| self.location(100 + i * 10, 100, 4, 0))
            .collect();

        Ok(TickSnapshot {
            frame: self.frame,
            minerals: self.minerals,
            gas: self.gas,
            supply_used: self.supply_used,
            supply_total: self.supply_total,
            workers: WorkerCounts {
                mineral: self.mineral_workers,
                gas: self.gas_workers,
                ..WorkerCounts::default()
            },
            units,
            build_locations,
            extractor_sites,
            ..TickSnapshot::default()
        })
    }

    /// Goals resolved to catalog ids.
    pub fn goals(&self, catalog: &TypeCatalog) -> Result<Vec<ProductionGoal>, ScenarioError> {
        self.goals
            .iter()
            .map(|spec| resolve_goal(spec, catalog))
            .collect()
    }

    fn location(&self, x: i32, y: i32, width: u8, powered: i32) -> BuildLocation {
        BuildLocation {
            tile: TilePosition::new(x, y),
            region: RegionId::MAIN_BASE,
            width,
            builder_frames: self.builder_frames,
            frames_until_powered: powered,
            has_exit: true,
            distance_to_exit: 0,
            powers: Vec::new(),
        }
    }

    fn power_site(&self, x: i32, y: i32) -> BuildLocation {
        let powers = [(x + 2, y, 4), (x, y + 3, 3)]
            .into_iter()
            .map(|(px, py, width)| PoweredLocation {
                tile: TilePosition::new(px, py),
                width,
                builder_frames: self.builder_frames,
                has_exit: true,
                distance_to_exit: 0,
            })
            .collect();
        BuildLocation {
            powers,
            ..self.location(x, y, 2, 0)
        }
    }
}

fn resolve_goal(spec: &GoalSpec, catalog: &TypeCatalog) -> Result<ProductionGoal, ScenarioError> {
    let unit_id = |name: &str| {
        catalog
            .unit_id(name)
            .ok_or_else(|| ScenarioError::UnknownUnit(name.to_string()))
    };
    match spec {
        GoalSpec::Unit {
            unit,
            count,
            producer_limit,
            region,
            target_frame,
        } => Ok(UnitGoal {
            unit_type: unit_id(unit)?,
            location: region.map_or(ItemLocation::Anywhere, |r| ItemLocation::Region(RegionId(r))),
            count: *count,
            producer_limit: *producer_limit,
            reserved_worker: None,
            target_frame: *target_frame,
        }
        .into()),
        GoalSpec::Upgrade {
            upgrade,
            level,
            prerequisite,
            target_frame,
        } => Ok(UpgradeGoal {
            upgrade: catalog
                .upgrade_id(upgrade)
                .ok_or_else(|| ScenarioError::UnknownUpgrade(upgrade.clone()))?,
            level: *level,
            prerequisite: prerequisite.as_deref().map(unit_id).transpose()?,
            target_frame: *target_frame,
        }
        .into()),
    }
}

/// Load a catalog file, or the embedded Protoss catalog when `path` is `None`.
pub fn load_catalog(path: Option<&Path>) -> Result<TypeCatalog, ScenarioError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ScenarioError::FileNotFound(path.display().to_string()));
            }
            Ok(TypeCatalog::from_ron_str(&std::fs::read_to_string(path)?)?)
        }
        None => Ok(TypeCatalog::protoss()?),
    }
}

/// Load planner tunables from RON.
pub fn load_config(path: &Path) -> Result<PlannerConfig, ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    Ok(PlannerConfig::from_ron_str(&std::fs::read_to_string(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_resolves() {
        let catalog = TypeCatalog::protoss().unwrap();
        let scenario = Scenario::default();
        let snapshot = scenario.snapshot(&catalog).unwrap();

        assert_eq!(snapshot.units.len(), 5);
        assert_eq!(snapshot.build_locations.len(), 4);
        assert_eq!(snapshot.extractor_sites.len(), 1);
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Probes",
                minerals: 100,
                units: [UnitSpec(unit: "Protoss_Nexus")],
                goals: [
                    Unit(unit: "Protoss_Probe", count: Some(2)),
                    Upgrade(upgrade: "Singularity_Charge"),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        let catalog = TypeCatalog::protoss().unwrap();

        assert_eq!(scenario.ticks, 1);
        assert_eq!(scenario.goals(&catalog).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_from_json() {
        let json = r#"{
            "name": "Gate",
            "goals": [{"Unit": {"unit": "Protoss_Gateway", "count": 1}}]
        }"#;
        let scenario = Scenario::from_json_str(json).unwrap();
        assert_eq!(scenario.goals, vec![GoalSpec::unit("Protoss_Gateway", 1)]);
    }

    #[test]
    fn test_unknown_unit_is_reported() {
        let catalog = TypeCatalog::protoss().unwrap();
        let scenario = Scenario {
            goals: vec![GoalSpec::unit("Protoss_Gatway", 1)],
            ..Scenario::default()
        };

        let err = scenario.goals(&catalog).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownUnit(name) if name == "Protoss_Gatway"));
    }
}
