//! The planning pass and the public scheduler.
//!
//! Each tick builds a fresh [`PlanningPass`] over the snapshot, seeds the
//! forecast, then walks the goals in priority order. Every goal works on
//! the shared [`PassState`]; an attempt that cannot be placed inside the
//! window restores the state saved before it, so earlier goals are never
//! disturbed by later ones.

use std::collections::BTreeSet;

use tracing::{debug, error, info_span, trace};

use crate::collaborators::Collaborators;
use crate::config::PlannerConfig;
use crate::data::TypeCatalog;
use crate::error::{BlockReason, Result};
use crate::forecast::seed_timelines;
use crate::goals::{MineralReservation, ProductionGoal, UnitGoal};
use crate::item::{ItemArena, ItemId, ItemSet, ProducerId, ProductionItem};
use crate::locations::LocationPool;
use crate::producers::{ProducerPool, ProducerSource};
use crate::schedule::{GoalOutcome, ProducerRef, Schedule, ScheduledItem, TickReport};
use crate::snapshot::TickSnapshot;
use crate::timeline::{Resource, Timelines};
use crate::types::{ItemLocation, ProductionType, UnitId, UnitTypeId};

/// Lowest resource levels an attempt may leave behind.
///
/// Taken before a goal is attempted: a resource that was already negative
/// somewhere may stay that low, but no attempt may push it lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Floors {
    pub(crate) minerals: i32,
    pub(crate) gas: i32,
}

/// Everything a goal may change. Cloned to checkpoint an attempt.
#[derive(Debug, Clone)]
pub(crate) struct PassState {
    pub(crate) timelines: Timelines,
    pub(crate) items: ItemArena,
    pub(crate) committed: ItemSet,
    pub(crate) locations: LocationPool,
    pub(crate) producers: ProducerPool,
    /// Workers moved from minerals to gas by the plan.
    pub(crate) gas_worker_delta: i32,
}

/// One tick of planning.
pub(crate) struct PlanningPass<'a> {
    pub(crate) catalog: &'a TypeCatalog,
    pub(crate) config: &'a PlannerConfig,
    pub(crate) snapshot: &'a TickSnapshot,
    pub(crate) state: PassState,
    pub(crate) outcomes: Vec<GoalOutcome>,
}

impl<'a> PlanningPass<'a> {
    pub(crate) fn new(
        catalog: &'a TypeCatalog,
        config: &'a PlannerConfig,
        snapshot: &'a TickSnapshot,
    ) -> Self {
        let occupied: BTreeSet<_> = snapshot.pending_buildings.iter().map(|p| p.tile).collect();
        let state = PassState {
            timelines: seed_timelines(config, snapshot),
            items: ItemArena::new(),
            committed: ItemSet::new(),
            locations: LocationPool::new(
                &snapshot.build_locations,
                &snapshot.extractor_sites,
                &occupied,
            ),
            producers: ProducerPool::default(),
            gas_worker_delta: 0,
        };
        Self {
            catalog,
            config,
            snapshot,
            state,
            outcomes: Vec::new(),
        }
    }

    /// Plan every goal, then run the post-pass.
    pub(crate) fn run(&mut self, goals: &[ProductionGoal], reservations: &[MineralReservation]) {
        self.initialize_resources(reservations);
        for (index, goal) in goals.iter().enumerate() {
            let _span = info_span!("goal", index).entered();
            self.handle_goal(index, goal);
        }
        self.optimize();
        self.place_supply_providers();
    }

    pub(crate) fn window(&self) -> i32 {
        self.state.timelines.window()
    }

    /// A fresh item for `kind` starting at `start`.
    pub(crate) fn new_item(
        &self,
        kind: ProductionType,
        start: i32,
        location: ItemLocation,
    ) -> ProductionItem {
        let cost = self.catalog.cost(kind);
        ProductionItem {
            id: ItemId(0),
            kind,
            location,
            start,
            completion: start + cost.build_time,
            base_minerals: cost.minerals,
            travel_penalty: 0,
            gas_price: cost.gas,
            supply_provided: cost.supply_provided,
            supply_required: cost.supply_required,
            producer: None,
            build_location: None,
            is_prerequisite: false,
            in_progress: None,
            construction_started: false,
            builder: None,
        }
    }

    /// Whether a refinery exists, is queued or is committed.
    pub(crate) fn refinery_exists(&self) -> bool {
        let refinery = self.catalog.race().refinery;
        self.snapshot.count_all(refinery) > 0
            || self
                .state
                .committed
                .ids()
                .any(|id| self.state.items.get(id).is(refinery))
    }

    /// Move the refinery's workers from minerals to gas when it completes.
    pub(crate) fn apply_refinery_workers(&mut self, completion: i32) {
        let workers = self.config.workers_per_refinery;
        let timelines = &mut self.state.timelines;
        timelines.apply_rate_change(
            Resource::Minerals,
            completion,
            -workers,
            self.config.minerals_per_worker_frame,
        );
        timelines.apply_rate_change(
            Resource::Gas,
            completion,
            workers,
            self.config.gas_per_worker_frame,
        );
    }

    pub(crate) fn floors(&self) -> Floors {
        let timelines = &self.state.timelines;
        Floors {
            minerals: timelines.min_from(Resource::Minerals, 0).min(0),
            gas: timelines.min_from(Resource::Gas, 0).min(0),
        }
    }

    pub(crate) fn within(&self, floors: Floors) -> bool {
        let timelines = &self.state.timelines;
        timelines.min_from(Resource::Minerals, 0) >= floors.minerals
            && timelines.min_from(Resource::Gas, 0) >= floors.gas
    }

    /// Run `change`, keeping its effects only if it succeeds and leaves
    /// both resources at or above `floors`.
    pub(crate) fn checked(&mut self, floors: Floors, change: impl FnOnce(&mut Self) -> bool) -> bool {
        let saved = self.state.clone();
        if change(self) && self.within(floors) {
            true
        } else {
            self.state = saved;
            false
        }
    }

    /// Run `attempt` on the current state and hand back the resulting state,
    /// leaving the current state untouched.
    pub(crate) fn trial<T>(
        &mut self,
        attempt: impl FnOnce(&mut Self) -> std::result::Result<T, BlockReason>,
    ) -> std::result::Result<(T, PassState), BlockReason> {
        let saved = self.state.clone();
        let result = attempt(self);
        let after = std::mem::replace(&mut self.state, saved);
        result.map(|value| (value, after))
    }

    /// Apply an item's costs and effects to the forecast and commit it.
    pub(crate) fn commit_item(&mut self, id: ItemId) {
        let item = self.state.items.get(id).clone();
        let race = *self.catalog.race();
        let timelines = &mut self.state.timelines;

        timelines.spend(Resource::Minerals, item.mineral_price(), item.start);
        timelines.spend(Resource::Gas, item.gas_price, item.start);
        timelines.use_supply(item.supply_required, item.start);
        timelines.add_supply(item.supply_provided, item.completion);
        if item.is(race.worker) {
            timelines.apply_rate_change(
                Resource::Minerals,
                item.completion,
                1,
                self.config.minerals_per_worker_frame,
            );
        }
        if item.is(race.refinery) {
            self.apply_refinery_workers(item.completion);
        }

        self.state.committed.insert(&self.state.items, id);
        if let Some(producer) = item.producer {
            self.state.producers.add_item(producer, id, &self.state.items);
        }
        if item.build_location.is_some() {
            self.refresh_power(id);
        }

        debug!(
            item = %self.catalog.label(item.kind),
            start = item.start,
            completion = item.completion,
            minerals = item.mineral_price(),
            gas = item.gas_price,
            prerequisite = item.is_prerequisite,
            "committed"
        );
    }

    /// Move a committed item and all of its effects by `delta` frames.
    ///
    /// Items mirroring queued buildings are never moved.
    pub(crate) fn shift_committed(&mut self, id: ItemId, delta: i32) {
        let item = self.state.items.get(id).clone();
        if delta == 0 || item.is_queued() {
            return;
        }
        let race = *self.catalog.race();
        let mineral_rate = self.config.minerals_per_worker_frame;
        let gas_rate = self.config.gas_per_worker_frame;
        let timelines = &mut self.state.timelines;

        timelines.move_spend(Resource::Minerals, item.mineral_price(), item.start, delta);
        timelines.move_spend(Resource::Gas, item.gas_price, item.start, delta);
        timelines.move_supply_use(item.supply_required, item.start, delta);
        timelines.move_supply(item.supply_provided, item.completion, delta);
        if item.is(race.worker) {
            timelines.move_rate_change(Resource::Minerals, item.completion, delta, 1, mineral_rate);
        }
        if item.is(race.refinery) {
            let workers = self.config.workers_per_refinery;
            timelines.move_rate_change(
                Resource::Minerals,
                item.completion,
                delta,
                -workers,
                mineral_rate,
            );
            timelines.move_rate_change(Resource::Gas, item.completion, delta, workers, gas_rate);
        }

        self.state
            .items
            .shift_in(&mut self.state.committed, id, delta);
        if let Some(producer) = item.producer {
            self.state.producers.resort(producer, &self.state.items);
        }
        if item.build_location.is_some() {
            self.refresh_power(id);
        }
        trace!(item = %self.catalog.label(item.kind), from = item.start, delta, "shifted");
    }

    /// [`Self::shift_committed`], undone if it overspends.
    pub(crate) fn shift_committed_checked(&mut self, id: ItemId, delta: i32, floors: Floors) -> bool {
        self.checked(floors, |pass| {
            pass.shift_committed(id, delta);
            true
        })
    }

    fn record(&mut self, index: usize, kind: ProductionType) -> usize {
        let label = if self.catalog.contains(kind) {
            self.catalog.label(kind)
        } else {
            format!("{:?}", kind)
        };
        self.outcomes.push(GoalOutcome {
            goal: index,
            label,
            committed: 0,
            blocked: None,
            skipped: false,
        });
        self.outcomes.len() - 1
    }

    /// Plan one goal.
    pub(crate) fn handle_goal(&mut self, index: usize, goal: &ProductionGoal) {
        let kind = goal.kind();
        let outcome = self.record(index, kind);

        if !self.catalog.contains(kind) {
            error!(?kind, "goal refers to an unknown type");
            self.outcomes[outcome].skipped = true;
            return;
        }

        // Upgrades are researched one level at a time: plan the next level,
        // not the goal's target level.
        let kind = match goal {
            ProductionGoal::Upgrade(upgrade) => {
                let current = self.snapshot.upgrade_level(upgrade.upgrade);
                if current >= upgrade.level || self.snapshot.researching.contains(&upgrade.upgrade) {
                    debug!(upgrade = %self.catalog.label(kind), "already reached or in progress");
                    self.outcomes[outcome].skipped = true;
                    return;
                }
                ProductionType::Upgrade {
                    upgrade: upgrade.upgrade,
                    level: current + 1,
                }
            }
            ProductionGoal::Unit(_) => kind,
        };

        let Some(producer_type) = self.catalog.producer_of(kind) else {
            error!(item = %self.catalog.label(kind), "type has no producer");
            self.outcomes[outcome].skipped = true;
            return;
        };

        let build_time = self.catalog.build_time(kind);
        let earliest = goal
            .target_frame()
            .map_or(0, |target| (target - self.snapshot.frame - build_time).max(0));

        match goal {
            ProductionGoal::Unit(unit) if self.catalog.is_building(kind) => {
                self.handle_building_goal(outcome, unit, earliest);
            }
            _ => self.handle_producer_goal(outcome, goal, kind, producer_type, earliest),
        }

        let result = &self.outcomes[outcome];
        debug!(
            goal = %result.label,
            committed = result.committed,
            blocked = ?result.blocked,
            "goal done"
        );
    }

    /// Expand and place the missing prerequisites of `kind`.
    ///
    /// Returns the open prerequisite items (in start order) and the first
    /// frame the goal's own item may start.
    fn prepare_prerequisites(
        &mut self,
        kind: ProductionType,
        extra: Option<UnitTypeId>,
        location: ItemLocation,
        earliest: i32,
        floors: Floors,
    ) -> std::result::Result<(Vec<ItemId>, i32), BlockReason> {
        let Some(mut prerequisites) = self.add_missing_prerequisites(kind, extra, location) else {
            return Err(BlockReason::Producer);
        };
        self.normalize_start_frame(&mut prerequisites);
        let committed_ready = self.resolve_duplicates(&mut prerequisites);

        let added = self.reserve_build_positions(&prerequisites, floors)?;
        prerequisites.extend(added);
        self.state.items.sort(&mut prerequisites);

        let available = prerequisites
            .iter()
            .map(|&id| self.state.items.get(id).completion)
            .fold(committed_ready.max(earliest), i32::max);
        Ok((prerequisites, available))
    }

    fn handle_building_goal(&mut self, outcome: usize, goal: &UnitGoal, earliest: i32) {
        let kind = ProductionType::Unit(goal.unit_type);
        let mut remaining = goal.count.unwrap_or(1);

        // Committed buildings of the same type, whether planned for an
        // earlier goal or added while resolving one, count toward the goal.
        if !matches!(goal.location, ItemLocation::Tile(_)) {
            let reused = self
                .state
                .committed
                .ids()
                .filter(|&id| {
                    let item = self.state.items.get(id);
                    item.is(goal.unit_type) && !item.is_queued()
                })
                .take(remaining as usize)
                .count() as u32;
            if reused > 0 {
                debug!(reused, "reusing committed buildings");
            }
            remaining -= reused;
            self.outcomes[outcome].committed += reused;
        }

        while remaining > 0 {
            let floors = self.floors();
            let saved = self.state.clone();
            match self.try_building(goal, kind, earliest, floors) {
                Ok(_) => {
                    self.outcomes[outcome].committed += 1;
                    remaining -= 1;
                }
                Err(reason) => {
                    self.state = saved;
                    debug!(%reason, "building goal blocked");
                    self.outcomes[outcome].blocked = Some(reason);
                    break;
                }
            }
        }
    }

    fn try_building(
        &mut self,
        goal: &UnitGoal,
        kind: ProductionType,
        earliest: i32,
        floors: Floors,
    ) -> std::result::Result<ItemId, BlockReason> {
        let (mut prerequisites, available) =
            self.prepare_prerequisites(kind, None, goal.location, earliest, floors)?;

        let mut item = self.new_item(kind, available, goal.location);
        item.builder = goal.reserved_worker;
        let id = self.state.items.push(item);

        let mut ordered = prerequisites.clone();
        ordered.push(id);
        let added = self.reserve_build_positions(&ordered, floors)?;
        prerequisites.extend(added);
        self.state.items.sort(&mut prerequisites);

        let unit = self.catalog.unit(goal.unit_type);
        if self.state.items.get(id).build_location.is_none()
            && goal.unit_type != self.catalog.race().supply_provider
        {
            error!(building = %unit.name, "building goal has no location");
            return Err(BlockReason::Location);
        }

        self.resolve_blocks(id, &mut prerequisites, floors)?;
        Ok(id)
    }

    fn handle_producer_goal(
        &mut self,
        outcome: usize,
        goal: &ProductionGoal,
        kind: ProductionType,
        producer_type: UnitTypeId,
        earliest: i32,
    ) {
        let (count, limit, location, extra, reserved) = match goal {
            ProductionGoal::Unit(unit) => (
                unit.count,
                unit.producer_limit,
                unit.location,
                None,
                unit.reserved_worker,
            ),
            ProductionGoal::Upgrade(upgrade) => {
                (Some(1), Some(1), ItemLocation::Anywhere, upgrade.prerequisite, None)
            }
        };

        let floors = self.floors();
        let saved = self.state.clone();
        let (mut prerequisites, available) =
            match self.prepare_prerequisites(kind, extra, location, earliest, floors) {
                Ok(prepared) => prepared,
                Err(reason) => {
                    self.state = saved;
                    self.outcomes[outcome].blocked = Some(reason);
                    return;
                }
            };

        let mut to_produce = count;
        let Some(mut producers) =
            self.collect_producers(kind, producer_type, location, &prerequisites, &mut to_produce)
        else {
            self.state = saved;
            debug!(item = %self.catalog.label(kind), "covered by in-flight commands");
            return;
        };
        let mut used: BTreeSet<ProducerId> = BTreeSet::new();

        loop {
            if to_produce == Some(0) {
                break;
            }
            let limit_reached = limit.is_some_and(|l| used.len() >= l as usize);
            let commit_immediately = !prerequisites.is_empty() || limit_reached || to_produce.is_none();
            // An unlimited goal saturates the producers it has, then builds more.
            let may_add_producer = !limit_reached && prerequisites.is_empty();

            let best = producers
                .iter()
                .copied()
                .filter(|p| !limit_reached || used.contains(p))
                .map(|p| (self.producer_available_at(p, kind, available), p))
                .min();

            let floors = self.floors();
            let window = self.window();
            let existing = match best {
                Some((start, producer)) if start < window => {
                    let open = prerequisites.clone();
                    self.trial(|pass| {
                        pass.try_on_producer(kind, location, producer, start, reserved, open, floors)
                    })
                }
                _ => Err(BlockReason::Producer),
            };

            let fresh = if !may_add_producer || (commit_immediately && existing.is_ok()) {
                Err(BlockReason::Producer)
            } else {
                self.trial(|pass| {
                    pass.try_on_new_producer(kind, producer_type, location, available, reserved, floors)
                })
            };

            let (producer, state) = match (existing, fresh) {
                (Ok((a, state_a)), Ok((b, state_b))) => {
                    if b.0 < a.0 {
                        (b.1, state_b)
                    } else {
                        (a.1, state_a)
                    }
                }
                (Ok((a, state)), Err(_)) => (a.1, state),
                (Err(_), Ok((b, state))) => (b.1, state),
                (Err(reason), Err(_)) => {
                    self.outcomes[outcome].blocked = Some(reason);
                    break;
                }
            };

            self.state = state;
            if !producers.contains(&producer) {
                producers.push(producer);
            }
            used.insert(producer);
            prerequisites.clear();
            self.outcomes[outcome].committed += 1;
            if let Some(remaining) = to_produce.as_mut() {
                *remaining -= 1;
            }
        }

        if self.outcomes[outcome].committed == 0 {
            self.state = saved;
        }
    }

    /// Schedule one item on an existing producer. Returns (start, producer).
    fn try_on_producer(
        &mut self,
        kind: ProductionType,
        location: ItemLocation,
        producer: ProducerId,
        start: i32,
        reserved: Option<UnitId>,
        mut prerequisites: Vec<ItemId>,
        floors: Floors,
    ) -> std::result::Result<(i32, ProducerId), BlockReason> {
        let mut item = self.new_item(kind, start, location);
        item.producer = Some(producer);
        item.builder = reserved;
        let id = self.state.items.push(item);
        self.resolve_blocks(id, &mut prerequisites, floors)?;
        Ok((self.state.items.get(id).start, producer))
    }

    /// Build another producer and schedule one item on it.
    fn try_on_new_producer(
        &mut self,
        kind: ProductionType,
        producer_type: UnitTypeId,
        location: ItemLocation,
        available: i32,
        reserved: Option<UnitId>,
        floors: Floors,
    ) -> std::result::Result<(i32, ProducerId), BlockReason> {
        let building = ProductionType::Unit(producer_type);
        if !self.catalog.is_building(building) {
            return Err(BlockReason::Producer);
        }
        let region = match location {
            ItemLocation::Region(_) => location,
            _ => ItemLocation::Anywhere,
        };
        let mut item = self.new_item(building, 0, region);
        item.is_prerequisite = true;
        let building_id = self.state.items.push(item);
        let mut open = self.reserve_build_positions(&[building_id], floors)?;
        if self.state.items.get(building_id).build_location.is_none() {
            return Err(BlockReason::Location);
        }
        self.resolve_blocks(building_id, &mut open, floors)?;

        let completion = self.state.items.get(building_id).completion;
        let producer = self.state.producers.planned(building_id, completion);
        let start = self.producer_available_at(producer, kind, available.max(completion));
        if start >= self.window() {
            return Err(BlockReason::Producer);
        }
        self.try_on_producer(kind, location, producer, start, reserved, Vec::new(), floors)
    }

    /// Give every location-less power source its final location.
    fn place_supply_providers(&mut self) {
        let power = self.catalog.race().supply_provider;
        for id in self.state.committed.to_vec() {
            let item = self.state.items.get(id);
            if item.is(power) && !item.is_queued() && item.build_location.is_none() {
                let region = item.location.region();
                if !self.choose_power_location(id, region, false, None) {
                    debug!(item = ?id, "no location for supply provider");
                }
            }
        }
    }

    /// Owned view of the committed set.
    pub(crate) fn schedule(&self) -> Schedule {
        let mut sequences = std::collections::BTreeMap::new();
        let ids = self.state.committed.to_vec();
        for (sequence, &id) in ids.iter().enumerate() {
            sequences.insert(id, sequence as u32);
        }

        let items = ids
            .iter()
            .enumerate()
            .map(|(sequence, &id)| {
                let item = self.state.items.get(id);
                let producer = item.producer.map(|p| match self.state.producers.get(p).source {
                    ProducerSource::Existing(unit) => ProducerRef::Existing(unit),
                    ProducerSource::Planned(planned) => {
                        ProducerRef::Planned(sequences.get(&planned).copied().unwrap_or(u32::MAX))
                    }
                });
                ScheduledItem {
                    sequence: sequence as u32,
                    kind: item.kind,
                    label: self.catalog.label(item.kind),
                    start: item.start,
                    completion: item.completion,
                    mineral_price: item.mineral_price(),
                    gas_price: item.gas_price,
                    supply_provided: item.supply_provided,
                    supply_required: item.supply_required,
                    location: item.location,
                    tile: item.build_location.as_ref().map(|l| l.tile),
                    producer,
                    is_prerequisite: item.is_prerequisite,
                    in_progress: item.in_progress,
                }
            })
            .collect();

        Schedule {
            frame: self.snapshot.frame,
            window: self.window(),
            items,
            goals: self.outcomes.clone(),
            gas_worker_delta: self.state.gas_worker_delta,
        }
    }
}

/// Production scheduler.
///
/// Stateless between ticks: every call replans from scratch.
///
/// ```
/// use producer_core::prelude::*;
///
/// let planner = ProductionPlanner::protoss().unwrap();
/// let pylon = planner.catalog().race().supply_provider;
/// let snapshot = TickSnapshot {
///     minerals: 100,
///     supply_total: 18,
///     ..TickSnapshot::default()
/// };
///
/// let schedule = planner.plan(&snapshot, &[UnitGoal::new(pylon, 1).into()], &[]);
/// assert_eq!(schedule.items[0].start, 0);
/// ```
#[derive(Debug, Clone)]
pub struct ProductionPlanner {
    catalog: TypeCatalog,
    config: PlannerConfig,
}

impl ProductionPlanner {
    /// Create a scheduler.
    pub fn new(catalog: TypeCatalog, config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    /// Scheduler over the embedded Protoss catalog with default tunables.
    pub fn protoss() -> Result<Self> {
        Self::new(TypeCatalog::protoss()?, PlannerConfig::default())
    }

    /// Type catalog.
    #[must_use]
    pub const fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Tunables.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a tick from a snapshot without issuing anything.
    #[must_use]
    pub fn plan(
        &self,
        snapshot: &TickSnapshot,
        goals: &[ProductionGoal],
        reservations: &[MineralReservation],
    ) -> Schedule {
        let _span = info_span!("plan", frame = snapshot.frame).entered();
        let mut pass = PlanningPass::new(&self.catalog, &self.config, snapshot);
        pass.run(goals, reservations);
        pass.schedule()
    }

    /// Capture the world, plan and issue this tick's commands.
    pub fn plan_tick(
        &self,
        world: &mut Collaborators<'_>,
        goals: &[ProductionGoal],
        reservations: &[MineralReservation],
    ) -> TickReport {
        let snapshot = world.capture();
        let _span = info_span!("tick", frame = snapshot.frame).entered();
        let mut pass = PlanningPass::new(&self.catalog, &self.config, &snapshot);
        pass.run(goals, reservations);
        let commands = pass.issue_commands(world);
        TickReport {
            schedule: pass.schedule(),
            commands,
        }
    }
}
