//! Resource forecasting at the start of a tick.
//!
//! Seeds the timelines from the bank and worker counts, then folds in
//! everything that is already decided before any goal is looked at:
//! workers in training, buildings handed to the builder and external
//! mineral reservations.

use tracing::{debug, trace};

use crate::config::PlannerConfig;
use crate::data::TypeCatalog;
use crate::goals::MineralReservation;
use crate::item::ItemId;
use crate::math::Fixed;
use crate::scheduler::PlanningPass;
use crate::snapshot::{BuildLocation, CommandKind, OwnUnit, TickSnapshot};
use crate::timeline::{Resource, Timelines};
use crate::types::{ItemLocation, ProductionType};

/// Frames until a producer can take new work, or -1 if it is idle.
///
/// A command issued within the latency window has not shown up in the
/// unit's state yet, so the full duration of the ordered item is assumed.
pub(crate) fn remaining_build_time(
    unit: &OwnUnit,
    command: CommandKind,
    catalog: &TypeCatalog,
    snapshot: &TickSnapshot,
) -> i32 {
    if let Some(last) = unit.last_command {
        if last.kind == command
            && snapshot.frame - last.frame - 1 <= snapshot.latency_frames
            && catalog.contains(last.target)
        {
            return catalog.build_time(last.target);
        }
    }

    let remaining = match command {
        CommandKind::Train => unit.remaining_train_time,
        CommandKind::Research | CommandKind::Upgrade => unit.remaining_research_time,
        CommandKind::Other => 0,
    };
    if remaining > 0 {
        remaining
    } else {
        -1
    }
}

/// Seed mineral, gas and supply timelines from the bank and workers.
pub(crate) fn seed_timelines(config: &PlannerConfig, snapshot: &TickSnapshot) -> Timelines {
    let window = config.window_for_frame(snapshot.frame);
    let mut timelines = Timelines::new(window, config.supply_cap);

    let workers = snapshot.workers;
    let mineral_rate = config.minerals_per_worker_frame * Fixed::from_num(workers.mineral);
    let gas_rate = config.gas_per_worker_frame * Fixed::from_num(workers.gas)
        + config.gas_per_worker_frame * Fixed::from_num(workers.unsaturated_gas)
            / Fixed::from_num(config.unsaturated_gas_divisor);

    timelines.seed(Resource::Minerals, snapshot.minerals, mineral_rate);
    timelines.seed(Resource::Gas, snapshot.gas, gas_rate);
    timelines.add_supply(snapshot.supply_total, 0);
    timelines.use_supply(snapshot.supply_used, 0);
    timelines
}

impl PlanningPass<'_> {
    /// Build the starting state of the tick.
    pub(crate) fn initialize_resources(&mut self, reservations: &[MineralReservation]) {
        let catalog = self.catalog;
        let snapshot = self.snapshot;
        let rate = self.config.minerals_per_worker_frame;

        // Workers in training go to minerals when they pop
        for depot in snapshot
            .units
            .iter()
            .filter(|u| {
                u.completed
                    && catalog
                        .get_unit(u.unit_type)
                        .is_some_and(|t| t.is_resource_depot)
            })
        {
            let remaining = remaining_build_time(depot, CommandKind::Train, catalog, snapshot);
            if remaining >= 0 {
                self.state
                    .timelines
                    .apply_rate_change(Resource::Minerals, remaining + 1, 1, rate);
            }
        }

        let mut pending: Vec<_> = snapshot.pending_buildings.iter().collect();
        pending.sort_by_key(|p| p.id);
        for building in pending {
            if catalog.get_unit(building.unit_type).is_none() {
                tracing::error!(building = ?building.id, "pending building of unknown type");
                continue;
            }
            let kind = ProductionType::Unit(building.unit_type);
            let mut item = self.new_item(kind, building.frames_until_started, ItemLocation::Anywhere);
            item.completion = building.frames_until_completed;
            item.in_progress = Some(building.id);
            item.construction_started = building.construction_started;
            item.build_location = Some(BuildLocation::at(
                building.tile,
                catalog.unit(building.unit_type).tile_width,
            ));
            let id = self.state.items.push(item);
            self.commit_pending(id);
        }

        for reservation in reservations {
            self.reserve_minerals(reservation);
        }
    }

    /// Commit a building that is already with the builder.
    fn commit_pending(&mut self, id: ItemId) {
        let item = self.state.items.get(id).clone();
        let timelines = &mut self.state.timelines;

        if !item.construction_started {
            timelines.spend(Resource::Minerals, item.base_minerals, item.start);
            timelines.spend(Resource::Gas, item.gas_price, item.start);
        }
        timelines.add_supply(item.supply_provided, item.completion);
        if item.is(self.catalog.race().refinery) {
            self.apply_refinery_workers(item.completion);
        }

        trace!(
            item = %self.catalog.label(item.kind),
            start = item.start,
            completion = item.completion,
            started = item.construction_started,
            "committed pending building"
        );
        self.state.committed.insert(&self.state.items, id);
    }

    /// Spend a reservation at the earliest frame at or after its desired
    /// frame from which minerals never drop below the amount again.
    fn reserve_minerals(&mut self, reservation: &MineralReservation) {
        if reservation.amount <= 0 {
            return;
        }
        let timelines = &self.state.timelines;
        let window = timelines.window();
        let earliest = reservation.desired_frame.clamp(0, window);

        let mut frame = window - 1;
        while frame >= earliest && timelines.at(Resource::Minerals, frame) >= reservation.amount {
            frame -= 1;
        }
        frame += 1;

        if frame >= window {
            debug!(
                amount = reservation.amount,
                "mineral reservation cannot be met within window"
            );
            return;
        }
        debug!(amount = reservation.amount, frame, "reserved minerals");
        self.state
            .timelines
            .spend(Resource::Minerals, reservation.amount, frame);
    }
}
