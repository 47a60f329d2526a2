//! The world as the scheduler sees it at the start of a tick.
//!
//! A [`TickSnapshot`] is captured once from the collaborators (see
//! [`crate::collaborators`]) and is then the only input to planning
//! besides the goals. Everything in here is plain data so that scenarios
//! can be written to disk and replayed.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{
    BaseId, PendingBuildingId, ProductionType, RegionId, TilePosition, UnitId, UnitTypeId,
    UpgradeTypeId,
};

/// Kinds of command a unit can have been given most recently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Train a unit.
    Train,
    /// Research a tech.
    Research,
    /// Research an upgrade level.
    Upgrade,
    /// Anything else.
    Other,
}

/// The last command issued to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCommand {
    /// Command kind.
    pub kind: CommandKind,
    /// What was ordered.
    pub target: ProductionType,
    /// Absolute frame the command was issued on.
    pub frame: i32,
}

/// One of our own units or buildings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnUnit {
    /// Engine id.
    pub id: UnitId,
    /// Unit type.
    pub unit_type: UnitTypeId,
    /// Whether construction or training has finished.
    pub completed: bool,
    /// Base the unit belongs to, for depots.
    #[serde(default)]
    pub base: Option<BaseId>,
    /// Tile position.
    #[serde(default)]
    pub tile: TilePosition,
    /// Frames left on the unit currently being trained, 0 if idle.
    #[serde(default)]
    pub remaining_train_time: i32,
    /// Frames left on the research or upgrade in progress, 0 if idle.
    #[serde(default)]
    pub remaining_research_time: i32,
    /// Most recent command.
    #[serde(default)]
    pub last_command: Option<LastCommand>,
}

/// A building handed to the builder that has not completed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBuilding {
    /// Builder-side id.
    pub id: PendingBuildingId,
    /// Building type.
    pub unit_type: UnitTypeId,
    /// Where it is placed.
    pub tile: TilePosition,
    /// Frames until construction is expected to start.
    pub frames_until_started: i32,
    /// Frames until construction is expected to complete.
    pub frames_until_completed: i32,
    /// Whether the building exists in the game yet.
    pub construction_started: bool,
    /// Engine unit once construction has started.
    #[serde(default)]
    pub unit: Option<UnitId>,
    /// Frame before which the builder will not place the building (0 = none).
    #[serde(default)]
    pub desired_start_frame: i32,
    /// Whether the assigned worker is at the site.
    #[serde(default)]
    pub builder_ready: bool,
}

/// A smaller location made available when a power source is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoweredLocation {
    /// Tile.
    pub tile: TilePosition,
    /// Footprint width (3 or 4).
    pub width: u8,
    /// Worker travel frames to the site.
    pub builder_frames: i32,
    /// Whether units can leave a building placed here.
    #[serde(default)]
    pub has_exit: bool,
    /// Distance from the location to the nearest exit tile.
    #[serde(default)]
    pub distance_to_exit: i32,
}

/// A candidate build location.
///
/// Locations order by when they are powered, then non-exit locations
/// before exit locations, then by travel plus exit distance, then by tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLocation {
    /// Tile.
    pub tile: TilePosition,
    /// Region the location belongs to.
    #[serde(default)]
    pub region: RegionId,
    /// Footprint width.
    pub width: u8,
    /// Worker travel frames to the site.
    pub builder_frames: i32,
    /// Frames until the location has power (0 = powered now).
    #[serde(default)]
    pub frames_until_powered: i32,
    /// Whether units can leave a building placed here.
    #[serde(default)]
    pub has_exit: bool,
    /// Distance from the location to the nearest exit tile.
    #[serde(default)]
    pub distance_to_exit: i32,
    /// Locations a power source here would power.
    #[serde(default)]
    pub powers: Vec<PoweredLocation>,
}

impl BuildLocation {
    /// A location with no metadata, for fixed-tile goals.
    #[must_use]
    pub fn at(tile: TilePosition, width: u8) -> Self {
        Self {
            tile,
            region: RegionId::MAIN_BASE,
            width,
            builder_frames: 0,
            frames_until_powered: 0,
            has_exit: true,
            distance_to_exit: 0,
            powers: Vec::new(),
        }
    }

    /// Locations of the given width this one would power.
    pub fn powers_width(&self, width: u8) -> impl Iterator<Item = &PoweredLocation> {
        self.powers.iter().filter(move |p| p.width == width)
    }
}

impl Ord for BuildLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frames_until_powered
            .cmp(&other.frames_until_powered)
            .then_with(|| self.has_exit.cmp(&other.has_exit))
            .then_with(|| {
                (self.builder_frames + self.distance_to_exit)
                    .cmp(&(other.builder_frames + other.distance_to_exit))
            })
            .then_with(|| self.tile.cmp(&other.tile))
            .then_with(|| self.width.cmp(&other.width))
    }
}

impl PartialOrd for BuildLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Worker allocation at the start of the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerCounts {
    /// Workers mining minerals.
    pub mineral: i32,
    /// Workers on saturated gas.
    pub gas: i32,
    /// Workers on gas that gather at a reduced rate.
    #[serde(default)]
    pub unsaturated_gas: i32,
    /// Mineral workers that could be moved to gas.
    #[serde(default)]
    pub reassignable: i32,
}

/// Everything the scheduler reads from the world for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TickSnapshot {
    /// Current game frame.
    pub frame: i32,
    /// Command latency in frames.
    pub latency_frames: i32,
    /// Frames until a command issued now takes effect.
    pub remaining_latency_frames: i32,
    /// Banked minerals.
    pub minerals: i32,
    /// Banked gas.
    pub gas: i32,
    /// Supply in use.
    pub supply_used: i32,
    /// Supply capacity of completed providers.
    pub supply_total: i32,
    /// Worker allocation.
    pub workers: WorkerCounts,
    /// Own units and buildings.
    pub units: Vec<OwnUnit>,
    /// Buildings queued with the builder.
    pub pending_buildings: Vec<PendingBuilding>,
    /// Candidate build locations, all regions and widths.
    pub build_locations: Vec<BuildLocation>,
    /// Free gas geysers.
    pub extractor_sites: Vec<BuildLocation>,
    /// Completed upgrade levels.
    pub upgrade_levels: BTreeMap<UpgradeTypeId, u8>,
    /// Upgrades currently being researched.
    pub researching: BTreeSet<UpgradeTypeId>,
}

impl TickSnapshot {
    /// Number of completed units of a type.
    #[must_use]
    pub fn count_completed(&self, unit_type: UnitTypeId) -> usize {
        self.units
            .iter()
            .filter(|u| u.completed && u.unit_type == unit_type)
            .count()
    }

    /// Number of units of a type, complete or not, plus pending buildings.
    #[must_use]
    pub fn count_all(&self, unit_type: UnitTypeId) -> usize {
        let pending = self
            .pending_buildings
            .iter()
            .filter(|p| p.unit_type == unit_type && !p.construction_started)
            .count();
        self.units.iter().filter(|u| u.unit_type == unit_type).count() + pending
    }

    /// Pending buildings of a type.
    pub fn pending_of_type(
        &self,
        unit_type: UnitTypeId,
    ) -> impl Iterator<Item = &PendingBuilding> + '_ {
        self.pending_buildings
            .iter()
            .filter(move |p| p.unit_type == unit_type)
    }

    /// Completed upgrade level.
    #[must_use]
    pub fn upgrade_level(&self, upgrade: UpgradeTypeId) -> u8 {
        self.upgrade_levels.get(&upgrade).copied().unwrap_or(0)
    }

    /// Current free supply.
    #[must_use]
    pub fn free_supply(&self) -> i32 {
        self.supply_total - self.supply_used
    }
}
