//! In-memory collaborators.
//!
//! [`FakeWorld`] answers every collaborator trait from a [`TickSnapshot`]
//! and records what the scheduler asks of it. Each trait lives on its own
//! field so [`FakeWorld::collaborators`] can hand out disjoint borrows.

use std::collections::{BTreeMap, BTreeSet};

use producer_core::collaborators::{
    BuilderService, Collaborators, EconomyService, PlacementService, UnitApi,
};
use producer_core::snapshot::{BuildLocation, OwnUnit, PendingBuilding, TickSnapshot, WorkerCounts};
use producer_core::types::{PendingBuildingId, TilePosition, UnitId, UnitTypeId, UpgradeTypeId};

/// Engine side: units, bank and accepted orders.
#[derive(Debug, Clone, Default)]
pub struct FakeUnits {
    /// Current frame.
    pub frame: i32,
    /// Command latency.
    pub latency_frames: i32,
    /// Frames until a command takes effect.
    pub remaining_latency_frames: i32,
    /// Bank.
    pub minerals: i32,
    /// Bank.
    pub gas: i32,
    /// Supply used.
    pub supply_used: i32,
    /// Supply total.
    pub supply_total: i32,
    /// Own units.
    pub units: Vec<OwnUnit>,
    /// Completed upgrade levels.
    pub upgrade_levels: BTreeMap<UpgradeTypeId, u8>,
    /// Research in progress.
    pub researching: BTreeSet<UpgradeTypeId>,
    /// When false every order is refused.
    pub accept_orders: bool,
    /// Orders accepted: (producer, what).
    pub trained: Vec<(UnitId, UnitTypeId)>,
    /// Research orders accepted.
    pub researched: Vec<(UnitId, UpgradeTypeId)>,
}

impl UnitApi for FakeUnits {
    fn frame(&self) -> i32 {
        self.frame
    }

    fn latency_frames(&self) -> i32 {
        self.latency_frames
    }

    fn remaining_latency_frames(&self) -> i32 {
        self.remaining_latency_frames
    }

    fn bank(&self) -> (i32, i32) {
        (self.minerals, self.gas)
    }

    fn supply(&self) -> (i32, i32) {
        (self.supply_used, self.supply_total)
    }

    fn own_units(&self) -> Vec<OwnUnit> {
        self.units.clone()
    }

    fn upgrade_levels(&self) -> BTreeMap<UpgradeTypeId, u8> {
        self.upgrade_levels.clone()
    }

    fn researching(&self) -> BTreeSet<UpgradeTypeId> {
        self.researching.clone()
    }

    fn train(&mut self, producer: UnitId, unit_type: UnitTypeId) -> bool {
        if self.accept_orders {
            self.trained.push((producer, unit_type));
        }
        self.accept_orders
    }

    fn research(&mut self, producer: UnitId, upgrade: UpgradeTypeId) -> bool {
        if self.accept_orders {
            self.researched.push((producer, upgrade));
        }
        self.accept_orders
    }

    fn upgrade(&mut self, producer: UnitId, upgrade: UpgradeTypeId) -> bool {
        self.research(producer, upgrade)
    }
}

/// A building handed to the fake builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOrder {
    /// Id handed back to the scheduler.
    pub id: PendingBuildingId,
    /// Building type.
    pub unit_type: UnitTypeId,
    /// Placement.
    pub tile: TilePosition,
    /// Worker, if one was named.
    pub worker: Option<UnitId>,
    /// Absolute frame.
    pub frame: i32,
}

/// Builder side: queued buildings and build orders received.
#[derive(Debug, Clone, Default)]
pub struct FakeBuilder {
    /// Buildings queued before this tick.
    pub pending: Vec<PendingBuilding>,
    /// Worker returned by `builder_unit`, with its travel frames.
    pub builder: Option<(UnitId, i32)>,
    /// Orders received this tick.
    pub orders: Vec<BuildOrder>,
    /// Pending buildings released early.
    pub released: Vec<PendingBuildingId>,
    next_id: u32,
}

impl BuilderService for FakeBuilder {
    fn pending_buildings(&self) -> Vec<PendingBuilding> {
        self.pending.clone()
    }

    fn build(
        &mut self,
        unit_type: UnitTypeId,
        tile: TilePosition,
        worker: Option<UnitId>,
        frame: i32,
    ) -> PendingBuildingId {
        self.next_id += 1;
        let id = PendingBuildingId(1_000 + self.next_id);
        self.orders.push(BuildOrder {
            id,
            unit_type,
            tile,
            worker,
            frame,
        });
        id
    }

    fn builder_unit(&self, _tile: TilePosition, _unit_type: UnitTypeId) -> Option<(UnitId, i32)> {
        self.builder
    }

    fn is_pending_here(&self, tile: TilePosition) -> bool {
        self.pending.iter().any(|p| p.tile == tile) || self.orders.iter().any(|o| o.tile == tile)
    }

    fn pending_of_type(&self, unit_type: UnitTypeId) -> usize {
        self.pending.iter().filter(|p| p.unit_type == unit_type).count()
            + self.orders.iter().filter(|o| o.unit_type == unit_type).count()
    }

    fn clear_desired_start_frame(&mut self, id: PendingBuildingId) {
        self.released.push(id);
    }
}

/// Placement side.
#[derive(Debug, Clone, Default)]
pub struct FakePlacement {
    /// Candidate locations.
    pub locations: Vec<BuildLocation>,
    /// Free geysers.
    pub extractor_sites: Vec<BuildLocation>,
}

impl PlacementService for FakePlacement {
    fn build_locations(&self) -> Vec<BuildLocation> {
        self.locations.clone()
    }

    fn extractor_sites(&self) -> Vec<BuildLocation> {
        self.extractor_sites.clone()
    }
}

/// Economy side.
#[derive(Debug, Clone, Default)]
pub struct FakeEconomy {
    /// Worker allocation.
    pub workers: WorkerCounts,
    /// Last desired gas worker delta received.
    pub gas_worker_delta: Option<i32>,
}

impl EconomyService for FakeEconomy {
    fn worker_counts(&self) -> WorkerCounts {
        self.workers
    }

    fn set_desired_gas_worker_delta(&mut self, delta: i32) {
        self.gas_worker_delta = Some(delta);
    }
}

/// All collaborators of one bot.
#[derive(Debug, Clone, Default)]
pub struct FakeWorld {
    /// Engine.
    pub units: FakeUnits,
    /// Builder.
    pub builder: FakeBuilder,
    /// Placement.
    pub placement: FakePlacement,
    /// Economy.
    pub economy: FakeEconomy,
}

impl FakeWorld {
    /// A world that reads back as `snapshot` and accepts every order.
    #[must_use]
    pub fn from_snapshot(snapshot: &TickSnapshot) -> Self {
        Self {
            units: FakeUnits {
                frame: snapshot.frame,
                latency_frames: snapshot.latency_frames,
                remaining_latency_frames: snapshot.remaining_latency_frames,
                minerals: snapshot.minerals,
                gas: snapshot.gas,
                supply_used: snapshot.supply_used,
                supply_total: snapshot.supply_total,
                units: snapshot.units.clone(),
                upgrade_levels: snapshot.upgrade_levels.clone(),
                researching: snapshot.researching.clone(),
                accept_orders: true,
                ..FakeUnits::default()
            },
            builder: FakeBuilder {
                pending: snapshot.pending_buildings.clone(),
                ..FakeBuilder::default()
            },
            placement: FakePlacement {
                locations: snapshot.build_locations.clone(),
                extractor_sites: snapshot.extractor_sites.clone(),
            },
            economy: FakeEconomy {
                workers: snapshot.workers,
                gas_worker_delta: None,
            },
        }
    }

    /// Borrow every collaborator for one tick.
    pub fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            units: &mut self.units,
            builder: &mut self.builder,
            placement: &self.placement,
            economy: &mut self.economy,
        }
    }
}
