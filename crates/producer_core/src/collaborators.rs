//! Interfaces to the rest of the bot.
//!
//! The scheduler never talks to the game directly. Each tick it reads a
//! [`TickSnapshot`] through these traits and, once the plan is made, sends
//! the commands whose time has come back through them.

use std::collections::{BTreeMap, BTreeSet};

use crate::snapshot::{BuildLocation, OwnUnit, PendingBuilding, TickSnapshot, WorkerCounts};
use crate::types::{PendingBuildingId, TilePosition, UnitId, UnitTypeId, UpgradeTypeId};

/// The game engine's view of our own units.
pub trait UnitApi {
    /// Current game frame.
    fn frame(&self) -> i32;
    /// Command latency in frames.
    fn latency_frames(&self) -> i32;
    /// Frames until a command issued now takes effect.
    fn remaining_latency_frames(&self) -> i32;
    /// Banked minerals and gas.
    fn bank(&self) -> (i32, i32);
    /// Supply used and supply total.
    fn supply(&self) -> (i32, i32);
    /// All own units, including incomplete ones.
    fn own_units(&self) -> Vec<OwnUnit>;
    /// Completed upgrade levels.
    fn upgrade_levels(&self) -> BTreeMap<UpgradeTypeId, u8>;
    /// Upgrades and techs being researched.
    fn researching(&self) -> BTreeSet<UpgradeTypeId>;
    /// Order a unit trained. Returns whether the engine accepted it.
    fn train(&mut self, producer: UnitId, unit_type: UnitTypeId) -> bool;
    /// Order a tech researched.
    fn research(&mut self, producer: UnitId, upgrade: UpgradeTypeId) -> bool;
    /// Order an upgrade level researched.
    fn upgrade(&mut self, producer: UnitId, upgrade: UpgradeTypeId) -> bool;
}

/// Worker routing and construction.
pub trait BuilderService {
    /// Buildings handed over and not yet complete.
    fn pending_buildings(&self) -> Vec<PendingBuilding>;
    /// Queue a building to be placed at `frame` (absolute).
    fn build(
        &mut self,
        unit_type: UnitTypeId,
        tile: TilePosition,
        worker: Option<UnitId>,
        frame: i32,
    ) -> PendingBuildingId;
    /// Worker that would build at `tile`, and the frames it needs to get there.
    fn builder_unit(&self, tile: TilePosition, unit_type: UnitTypeId) -> Option<(UnitId, i32)>;
    /// Whether a building is already queued at `tile`.
    fn is_pending_here(&self, tile: TilePosition) -> bool;
    /// Number of queued buildings of a type.
    fn pending_of_type(&self, unit_type: UnitTypeId) -> usize;
    /// Let the builder place a queued building as soon as it can.
    fn clear_desired_start_frame(&mut self, id: PendingBuildingId);
}

/// Build location geometry.
pub trait PlacementService {
    /// Candidate build locations for every region and width.
    fn build_locations(&self) -> Vec<BuildLocation>;
    /// Free gas geysers.
    fn extractor_sites(&self) -> Vec<BuildLocation>;
}

/// Worker allocation.
pub trait EconomyService {
    /// Current worker allocation.
    fn worker_counts(&self) -> WorkerCounts;
    /// How many more workers the plan wants on gas.
    fn set_desired_gas_worker_delta(&mut self, delta: i32);
}

/// Everything the scheduler talks to during a tick.
pub struct Collaborators<'a> {
    /// Engine unit API.
    pub units: &'a mut dyn UnitApi,
    /// Builder.
    pub builder: &'a mut dyn BuilderService,
    /// Placement.
    pub placement: &'a dyn PlacementService,
    /// Economy.
    pub economy: &'a mut dyn EconomyService,
}

impl Collaborators<'_> {
    /// Read the world into a snapshot.
    #[must_use]
    pub fn capture(&self) -> TickSnapshot {
        let (minerals, gas) = self.units.bank();
        let (supply_used, supply_total) = self.units.supply();
        TickSnapshot {
            frame: self.units.frame(),
            latency_frames: self.units.latency_frames(),
            remaining_latency_frames: self.units.remaining_latency_frames(),
            minerals,
            gas,
            supply_used,
            supply_total,
            workers: self.economy.worker_counts(),
            units: self.units.own_units(),
            pending_buildings: self.builder.pending_buildings(),
            build_locations: self.placement.build_locations(),
            extractor_sites: self.placement.extractor_sites(),
            upgrade_levels: self.units.upgrade_levels(),
            researching: self.units.researching(),
        }
    }
}
