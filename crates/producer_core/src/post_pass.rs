//! Adjustments made after every goal has been planned.
//!
//! Refineries and supply providers are pulled earlier where the mineral
//! forecast has room. When we sit at the supply cap with little headroom,
//! spare minerals go into extra army producers.

use tracing::debug;

use crate::item::ItemId;
use crate::math::frames_to_gather;
use crate::scheduler::PlanningPass;
use crate::timeline::Resource;
use crate::types::{ItemLocation, ProductionType, RegionId, UnitTypeId};

impl PlanningPass<'_> {
    /// Run every post-pass adjustment.
    pub(crate) fn optimize(&mut self) {
        if self.config.pull_refineries {
            self.pull_refineries();
        }
        self.pull_supply_providers();
        self.add_army_producers();
    }

    fn movable(&self, unit_type: UnitTypeId) -> Vec<ItemId> {
        self.state
            .committed
            .ids()
            .filter(|&id| {
                let item = self.state.items.get(id);
                item.is(unit_type) && !item.is_queued() && item.start > 0
            })
            .collect()
    }

    /// Pull refineries earlier, as far as the minerals left over after
    /// they complete can pay for the workers moved to gas sooner.
    pub(crate) fn pull_refineries(&mut self) {
        let floors = self.floors();
        for id in self.movable(self.catalog.race().refinery) {
            let item = self.state.items.get(id);
            let spare = self.state.timelines.min_from(Resource::Minerals, item.completion);
            if spare <= 0 {
                continue;
            }
            let lookback = frames_to_gather(
                spare,
                self.config.minerals_per_worker_frame,
                self.config.workers_per_refinery,
            );
            let desired = item.start.saturating_sub(lookback);
            let new_start = self.earliest_affordable_move(id, desired);
            let delta = new_start - self.state.items.get(id).start;
            if delta < 0 && self.shift_committed_checked(id, delta, floors) {
                debug!(item = ?id, delta, "refinery pulled earlier");
            }
        }
    }

    /// Pull supply providers earlier by a bounded number of frames.
    pub(crate) fn pull_supply_providers(&mut self) {
        let floors = self.floors();
        let limit = self.config.supply_provider_pull_limit;
        for id in self.movable(self.catalog.race().supply_provider) {
            let desired = self.state.items.get(id).start - limit;
            let new_start = self.earliest_affordable_move(id, desired);
            let delta = new_start - self.state.items.get(id).start;
            if delta < 0 && self.shift_committed_checked(id, delta, floors) {
                debug!(item = ?id, delta, "supply provider pulled earlier");
            }
        }
    }

    /// Spend a floating bank on army producers while maxed out.
    pub(crate) fn add_army_producers(&mut self) {
        let timelines = &self.state.timelines;
        let maxed = timelines.total_supply(0) >= timelines.supply_cap()
            && timelines.supply(0) <= self.config.maxed_supply_headroom;
        if !maxed {
            return;
        }

        let catalog = self.catalog;
        let producer = catalog.race().army_producer;
        let unit = catalog.unit(producer);
        let planned = self
            .state
            .committed
            .ids()
            .filter(|&id| self.state.items.get(id).is(producer))
            .count();
        let mut count = self.snapshot.count_all(producer) + planned;

        let bank = self.state.timelines.min_from(Resource::Minerals, 0);
        let affordable = if unit.mineral_price > 0 {
            (bank / unit.mineral_price).max(0) as usize
        } else {
            0
        };
        let wanted = affordable.min(self.config.army_producer_ceiling.saturating_sub(count));

        for _ in 0..wanted {
            let region = RegionId::MAIN_BASE;
            let free = self
                .state
                .locations
                .iter(region, unit.tile_width)
                .filter(|l| l.frames_until_powered == 0 && (!unit.requires_exit || l.has_exit))
                .count();
            if free <= self.config.reserved_location_slots {
                debug!(free, "keeping remaining build locations free");
                break;
            }
            let Some(location) = self
                .state
                .locations
                .first(region, unit.tile_width, unit.requires_exit)
                .filter(|l| l.frames_until_powered == 0)
                .cloned()
            else {
                break;
            };

            let floors = self.floors();
            let window = self.window();
            let added = self.checked(floors, |pass| {
                let kind = ProductionType::Unit(producer);
                let item = pass.new_item(kind, 0, ItemLocation::Anywhere);
                let id = pass.state.items.push(item);
                pass.state.locations.take(&location);
                pass.assign_location(id, location);

                let price = pass.state.items.get(id).mineral_price();
                let start = pass.sufficient_from(Resource::Minerals, price);
                pass.state.items.shift(id, start);
                if pass.state.items.get(id).completion >= window {
                    return false;
                }
                pass.commit_item(id);
                true
            });
            if !added {
                break;
            }
            count += 1;
            debug!(count, "army producer added while maxed");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PlannerConfig;
    use crate::data::TypeCatalog;
    use crate::scheduler::PlanningPass;
    use crate::snapshot::{BuildLocation, TickSnapshot};
    use crate::timeline::Resource;
    use crate::types::{ItemLocation, ProductionType, RegionId, TilePosition};

    fn powered(x: i32) -> BuildLocation {
        BuildLocation {
            tile: TilePosition::new(x, 0),
            region: RegionId::MAIN_BASE,
            width: 4,
            builder_frames: 40,
            frames_until_powered: 0,
            has_exit: true,
            distance_to_exit: 0,
            powers: Vec::new(),
        }
    }

    #[test]
    fn test_supply_provider_pulled_by_at_most_limit() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = TickSnapshot {
            minerals: 1_000,
            ..TickSnapshot::default()
        };
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);
        let pylon = ProductionType::Unit(catalog.race().supply_provider);

        let item = pass.new_item(pylon, 500, ItemLocation::Anywhere);
        let id = pass.state.items.push(item);
        pass.commit_item(id);

        pass.pull_supply_providers();

        assert_eq!(pass.state.items.get(id).start, 500 - config.supply_provider_pull_limit);
        assert_eq!(pass.state.timelines.at(Resource::Minerals, 452), 900);
        assert_eq!(pass.state.timelines.at(Resource::Minerals, 451), 1_000);
    }

    #[test]
    fn test_army_producers_added_when_maxed() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = TickSnapshot {
            minerals: 1_000,
            supply_used: 396,
            supply_total: 400,
            build_locations: (0..6).map(|x| powered(x * 5)).collect(),
            ..TickSnapshot::default()
        };
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);

        pass.add_army_producers();

        // Six free locations, two kept back: four producers at 150 each.
        let gateway = catalog.race().army_producer;
        let added = pass
            .state
            .committed
            .ids()
            .filter(|&id| pass.state.items.get(id).is(gateway))
            .count();
        assert_eq!(added, 4);
    }

    #[test]
    fn test_no_army_producers_below_cap() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = TickSnapshot {
            minerals: 1_000,
            supply_used: 100,
            supply_total: 200,
            build_locations: (0..6).map(|x| powered(x * 5)).collect(),
            ..TickSnapshot::default()
        };
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);

        pass.add_army_producers();

        assert!(pass.state.committed.is_empty());
    }
}
