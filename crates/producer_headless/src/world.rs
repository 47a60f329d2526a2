//! A scripted game world for headless runs.
//!
//! [`ScriptedWorld`] implements every collaborator trait and moves the game
//! forward frame by frame: workers mine, producers finish what they were
//! told to make, the builder walks to its sites and places buildings once
//! the bank allows. It is deliberately coarse; the point is to feed the
//! planner plausible snapshots tick after tick, not to model the engine.

use std::collections::{BTreeMap, BTreeSet};

use producer_core::collaborators::{
    BuilderService, Collaborators, EconomyService, PlacementService, UnitApi,
};
use producer_core::config::PlannerConfig;
use producer_core::data::TypeCatalog;
use producer_core::math::Fixed;
use producer_core::snapshot::{
    BuildLocation, CommandKind, LastCommand, OwnUnit, PendingBuilding, TickSnapshot, WorkerCounts,
};
use producer_core::types::{
    PendingBuildingId, ProductionType, TilePosition, UnitId, UnitTypeId, UpgradeTypeId,
};
use tracing::{debug, trace};

use crate::scenario::{Scenario, ScenarioError};

/// Command latency of the scripted engine.
const LATENCY_FRAMES: i32 = 2;

/// Engine side: bank, units and what they are busy with.
#[derive(Debug, Clone)]
pub struct ScriptedUnits {
    catalog: TypeCatalog,
    frame: i32,
    minerals: Fixed,
    gas: Fixed,
    supply_used: i32,
    supply_total: i32,
    units: Vec<OwnUnit>,
    upgrade_levels: BTreeMap<UpgradeTypeId, u8>,
    training: Vec<(UnitId, UnitTypeId)>,
    research: Vec<(UnitId, UpgradeTypeId, u8)>,
    next_unit: u32,
}

impl ScriptedUnits {
    fn affordable(&self, minerals: i32, gas: i32) -> bool {
        self.minerals >= Fixed::from_num(minerals) && self.gas >= Fixed::from_num(gas)
    }

    fn spend(&mut self, minerals: i32, gas: i32) {
        self.minerals -= Fixed::from_num(minerals);
        self.gas -= Fixed::from_num(gas);
    }

    fn idle_producer(&mut self, id: UnitId) -> Option<&mut OwnUnit> {
        self.units.iter_mut().find(|u| {
            u.id == id && u.completed && u.remaining_train_time == 0 && u.remaining_research_time == 0
        })
    }

    fn spawn(&mut self, unit_type: UnitTypeId, tile: TilePosition, completed: bool) -> UnitId {
        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        self.units.push(OwnUnit {
            id,
            unit_type,
            completed,
            base: None,
            tile,
            remaining_train_time: 0,
            remaining_research_time: 0,
            last_command: None,
        });
        id
    }

    fn start_research(&mut self, producer: UnitId, upgrade: UpgradeTypeId, kind: CommandKind) -> bool {
        if self.research.iter().any(|(_, u, _)| *u == upgrade) {
            return false;
        }
        let level = self.upgrade_levels.get(&upgrade).copied().unwrap_or(0) + 1;
        let Some(cost) = self
            .catalog
            .upgrade(upgrade)
            .levels
            .get(usize::from(level) - 1)
            .cloned()
        else {
            return false;
        };
        if !self.affordable(cost.mineral_price, cost.gas_price) {
            return false;
        }
        let frame = self.frame;
        let Some(unit) = self.idle_producer(producer) else {
            return false;
        };
        unit.remaining_research_time = cost.research_time;
        unit.last_command = Some(LastCommand {
            kind,
            target: ProductionType::Upgrade { upgrade, level },
            frame,
        });
        self.spend(cost.mineral_price, cost.gas_price);
        self.research.push((producer, upgrade, level));
        true
    }
}

impl UnitApi for ScriptedUnits {
    fn frame(&self) -> i32 {
        self.frame
    }

    fn latency_frames(&self) -> i32 {
        LATENCY_FRAMES
    }

    fn remaining_latency_frames(&self) -> i32 {
        LATENCY_FRAMES - 1
    }

    fn bank(&self) -> (i32, i32) {
        (self.minerals.to_num::<i32>(), self.gas.to_num::<i32>())
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
        self.research.iter().map(|(_, u, _)| *u).collect()
    }

    fn train(&mut self, producer: UnitId, unit_type: UnitTypeId) -> bool {
        let data = self.catalog.unit(unit_type);
        let (minerals, gas, time, supply) = (
            data.mineral_price,
            data.gas_price,
            data.build_time,
            data.supply_required,
        );
        if !self.affordable(minerals, gas) || self.supply_used + supply > self.supply_total {
            return false;
        }
        let frame = self.frame;
        let Some(unit) = self.idle_producer(producer) else {
            return false;
        };
        unit.remaining_train_time = time;
        unit.last_command = Some(LastCommand {
            kind: CommandKind::Train,
            target: ProductionType::Unit(unit_type),
            frame,
        });
        self.spend(minerals, gas);
        self.supply_used += supply;
        self.training.push((producer, unit_type));
        true
    }

    fn research(&mut self, producer: UnitId, upgrade: UpgradeTypeId) -> bool {
        self.start_research(producer, upgrade, CommandKind::Research)
    }

    fn upgrade(&mut self, producer: UnitId, upgrade: UpgradeTypeId) -> bool {
        self.start_research(producer, upgrade, CommandKind::Upgrade)
    }
}

/// Builder side: the queue of buildings handed over.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBuilder {
    pending: Vec<PendingBuilding>,
    worker: Option<UnitId>,
    builder_frames: i32,
    next_id: u32,
}

impl BuilderService for ScriptedBuilder {
    fn pending_buildings(&self) -> Vec<PendingBuilding> {
        self.pending.clone()
    }

    fn build(
        &mut self,
        unit_type: UnitTypeId,
        tile: TilePosition,
        _worker: Option<UnitId>,
        frame: i32,
    ) -> PendingBuildingId {
        self.next_id += 1;
        let id = PendingBuildingId(self.next_id);
        debug!(%tile, ?unit_type, frame, "building queued");
        self.pending.push(PendingBuilding {
            id,
            unit_type,
            tile,
            frames_until_started: self.builder_frames,
            frames_until_completed: 0,
            construction_started: false,
            unit: None,
            desired_start_frame: frame,
            builder_ready: false,
        });
        id
    }

    fn builder_unit(&self, _tile: TilePosition, _unit_type: UnitTypeId) -> Option<(UnitId, i32)> {
        self.worker.map(|w| (w, self.builder_frames))
    }

    fn is_pending_here(&self, tile: TilePosition) -> bool {
        self.pending.iter().any(|p| p.tile == tile)
    }

    fn pending_of_type(&self, unit_type: UnitTypeId) -> usize {
        self.pending.iter().filter(|p| p.unit_type == unit_type).count()
    }

    fn clear_desired_start_frame(&mut self, id: PendingBuildingId) {
        if let Some(pending) = self.pending.iter_mut().find(|p| p.id == id) {
            pending.desired_start_frame = 0;
        }
    }
}

/// Placement side: free sites, less the occupied ones.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPlacement {
    locations: Vec<BuildLocation>,
    extractor_sites: Vec<BuildLocation>,
    occupied: BTreeSet<TilePosition>,
}

impl ScriptedPlacement {
    fn occupy(&mut self, tile: TilePosition) {
        self.occupied.insert(tile);
        let powered: Vec<BuildLocation> = self
            .locations
            .iter()
            .filter(|l| l.tile == tile)
            .flat_map(|l| {
                l.powers.iter().map(|p| BuildLocation {
                    tile: p.tile,
                    region: l.region,
                    width: p.width,
                    builder_frames: p.builder_frames,
                    frames_until_powered: i32::MAX,
                    has_exit: p.has_exit,
                    distance_to_exit: p.distance_to_exit,
                    powers: Vec::new(),
                })
            })
            .collect();
        for location in powered {
            if !self.locations.iter().any(|l| l.tile == location.tile) {
                self.locations.push(location);
            }
        }
    }

    /// Locations powered by a source at `source` get power in `frames`.
    fn power_from(&mut self, source: TilePosition, frames: i32) {
        let tiles: Vec<TilePosition> = self
            .locations
            .iter()
            .filter(|l| l.tile == source)
            .flat_map(|l| l.powers.iter().map(|p| p.tile))
            .collect();
        for location in self.locations.iter_mut().filter(|l| tiles.contains(&l.tile)) {
            location.frames_until_powered = location.frames_until_powered.min(frames);
        }
    }

    fn tick_power(&mut self) {
        for location in &mut self.locations {
            if location.frames_until_powered > 0 && location.frames_until_powered != i32::MAX {
                location.frames_until_powered -= 1;
            }
        }
    }
}

impl PlacementService for ScriptedPlacement {
    fn build_locations(&self) -> Vec<BuildLocation> {
        self.locations
            .iter()
            .filter(|l| !self.occupied.contains(&l.tile))
            .cloned()
            .collect()
    }

    fn extractor_sites(&self) -> Vec<BuildLocation> {
        self.extractor_sites
            .iter()
            .filter(|l| !self.occupied.contains(&l.tile))
            .cloned()
            .collect()
    }
}

/// Economy side: worker allocation.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEconomy {
    workers: WorkerCounts,
    desired_gas_delta: i32,
}

impl EconomyService for ScriptedEconomy {
    fn worker_counts(&self) -> WorkerCounts {
        self.workers
    }

    fn set_desired_gas_worker_delta(&mut self, delta: i32) {
        self.desired_gas_delta = delta;
    }
}

/// The whole scripted game.
#[derive(Debug, Clone)]
pub struct ScriptedWorld {
    config: PlannerConfig,
    /// Engine.
    pub units: ScriptedUnits,
    /// Builder.
    pub builder: ScriptedBuilder,
    /// Placement.
    pub placement: ScriptedPlacement,
    /// Economy.
    pub economy: ScriptedEconomy,
}

impl ScriptedWorld {
    /// Set up the world a scenario starts from.
    pub fn from_scenario(
        scenario: &Scenario,
        catalog: &TypeCatalog,
        config: &PlannerConfig,
    ) -> Result<Self, ScenarioError> {
        let snapshot = scenario.snapshot(catalog)?;
        Ok(Self::from_snapshot(&snapshot, catalog, config, scenario.builder_frames))
    }

    /// Set up the world from a snapshot.
    pub fn from_snapshot(
        snapshot: &TickSnapshot,
        catalog: &TypeCatalog,
        config: &PlannerConfig,
        builder_frames: i32,
    ) -> Self {
        let worker_type = catalog.race().worker;
        let worker = snapshot
            .units
            .iter()
            .find(|u| u.unit_type == worker_type && u.completed)
            .map(|u| u.id);
        let next_unit = snapshot.units.iter().map(|u| u.id.0).max().unwrap_or(0) + 1;

        Self {
            config: config.clone(),
            units: ScriptedUnits {
                catalog: catalog.clone(),
                frame: snapshot.frame,
                minerals: Fixed::from_num(snapshot.minerals),
                gas: Fixed::from_num(snapshot.gas),
                supply_used: snapshot.supply_used,
                supply_total: snapshot.supply_total,
                units: snapshot.units.clone(),
                upgrade_levels: snapshot.upgrade_levels.clone(),
                training: Vec::new(),
                research: Vec::new(),
                next_unit,
            },
            builder: ScriptedBuilder {
                pending: snapshot.pending_buildings.clone(),
                worker,
                builder_frames,
                next_id: 0,
            },
            placement: ScriptedPlacement {
                locations: snapshot.build_locations.clone(),
                extractor_sites: snapshot.extractor_sites.clone(),
                occupied: BTreeSet::new(),
            },
            economy: ScriptedEconomy {
                workers: snapshot.workers,
                desired_gas_delta: 0,
            },
        }
    }

    /// Borrow the world as the planner's collaborators.
    pub fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            units: &mut self.units,
            builder: &mut self.builder,
            placement: &self.placement,
            economy: &mut self.economy,
        }
    }

    /// Current frame.
    pub fn frame(&self) -> i32 {
        self.units.frame
    }

    /// Banked minerals and gas.
    pub fn bank(&self) -> (i32, i32) {
        self.units.bank()
    }

    /// Completed units of a type.
    pub fn count_completed(&self, unit_type: UnitTypeId) -> usize {
        self.units
            .units
            .iter()
            .filter(|u| u.unit_type == unit_type && u.completed)
            .count()
    }

    /// Units of a type that exist, are in training or are queued with the
    /// builder.
    pub fn count_all(&self, unit_type: UnitTypeId) -> usize {
        let owned = self.units.units.iter().filter(|u| u.unit_type == unit_type).count();
        let training = self.units.training.iter().filter(|(_, t)| *t == unit_type).count();
        let queued = self
            .builder
            .pending
            .iter()
            .filter(|p| p.unit_type == unit_type && !p.construction_started)
            .count();
        owned + training + queued
    }

    /// Completed level of an upgrade.
    pub fn upgrade_level(&self, upgrade: UpgradeTypeId) -> u8 {
        self.units.upgrade_levels.get(&upgrade).copied().unwrap_or(0)
    }

    /// Run the world forward.
    pub fn advance(&mut self, frames: i32) {
        self.assign_gas_workers();
        for _ in 0..frames {
            self.step();
        }
    }

    fn assign_gas_workers(&mut self) {
        let refinery = self.units.catalog.race().refinery;
        let capacity = self.count_completed(refinery) as i32 * self.config.workers_per_refinery;
        let workers = &mut self.economy.workers;
        let target = (workers.gas + self.economy.desired_gas_delta).clamp(0, capacity);
        let moved = (target - workers.gas).min(workers.mineral);
        workers.mineral -= moved;
        workers.gas += moved;
        self.economy.desired_gas_delta = 0;
        if moved != 0 {
            debug!(moved, gas = workers.gas, "gas workers reassigned");
        }
    }

    fn step(&mut self) {
        let units = &mut self.units;
        units.frame += 1;
        let workers = self.economy.workers;
        units.minerals += self.config.minerals_per_worker_frame * Fixed::from_num(workers.mineral);
        units.gas += self.config.gas_per_worker_frame * Fixed::from_num(workers.gas);

        self.step_training();
        self.step_research();
        self.step_construction();
        self.placement.tick_power();
    }

    fn step_training(&mut self) {
        let units = &mut self.units;
        let mut finished = Vec::new();
        for unit in &mut units.units {
            if unit.remaining_train_time > 0 {
                unit.remaining_train_time -= 1;
                if unit.remaining_train_time == 0 {
                    finished.push((unit.id, unit.tile));
                }
            }
        }
        for (producer, tile) in finished {
            let Some(index) = units.training.iter().position(|(p, _)| *p == producer) else {
                continue;
            };
            let (_, unit_type) = units.training.remove(index);
            units.spawn(unit_type, tile, true);
            trace!(frame = units.frame, ?unit_type, "unit trained");
            if units.catalog.unit(unit_type).is_worker {
                self.economy.workers.mineral += 1;
            }
        }
    }

    fn step_research(&mut self) {
        let units = &mut self.units;
        let mut finished = Vec::new();
        for unit in &mut units.units {
            if unit.remaining_research_time > 0 {
                unit.remaining_research_time -= 1;
                if unit.remaining_research_time == 0 {
                    finished.push(unit.id);
                }
            }
        }
        for producer in finished {
            let Some(index) = units.research.iter().position(|(p, _, _)| *p == producer) else {
                continue;
            };
            let (_, upgrade, level) = units.research.remove(index);
            units.upgrade_levels.insert(upgrade, level);
            debug!(frame = units.frame, ?upgrade, level, "research complete");
        }
    }

    fn step_construction(&mut self) {
        let frame = self.units.frame;
        let supply_cap = self.config.supply_cap;
        let supply_provider = self.units.catalog.race().supply_provider;
        let mut completed = Vec::new();

        for pending in &mut self.builder.pending {
            if pending.construction_started {
                pending.frames_until_completed -= 1;
                if pending.frames_until_completed <= 0 {
                    completed.push(pending.id);
                }
                continue;
            }

            pending.frames_until_started = (pending.frames_until_started - 1).max(0);
            if pending.frames_until_started > 0 {
                continue;
            }
            pending.builder_ready = true;
            if pending.desired_start_frame > frame {
                continue;
            }
            let data = self.units.catalog.unit(pending.unit_type);
            let (minerals, gas, build_time) = (data.mineral_price, data.gas_price, data.build_time);
            if !self.units.affordable(minerals, gas) {
                continue;
            }
            self.units.spend(minerals, gas);
            let unit = self.units.spawn(pending.unit_type, pending.tile, false);
            pending.construction_started = true;
            pending.unit = Some(unit);
            pending.frames_until_completed = build_time;
            self.placement.occupy(pending.tile);
            if pending.unit_type == supply_provider {
                self.placement.power_from(pending.tile, build_time);
            }
            debug!(frame, tile = %pending.tile, "construction started");
        }

        for id in completed {
            let Some(index) = self.builder.pending.iter().position(|p| p.id == id) else {
                continue;
            };
            let pending = self.builder.pending.remove(index);
            let Some(unit) = pending
                .unit
                .and_then(|u| self.units.units.iter_mut().find(|o| o.id == u))
            else {
                continue;
            };
            unit.completed = true;
            let provided = self.units.catalog.unit(pending.unit_type).supply_provided;
            self.units.supply_total = (self.units.supply_total + provided).min(supply_cap);
            debug!(frame, tile = %pending.tile, "construction complete");
        }
    }
}
