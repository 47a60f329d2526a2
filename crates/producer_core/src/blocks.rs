//! Resource block resolution.
//!
//! An item and its still-open prerequisites form a group that moves as
//! one. Resolution runs a single fixed pass: minerals, gas, supply, then a
//! settling rescan and a producer re-check. Every step can only push the
//! group later. Anything that cannot be placed inside the window fails
//! the whole attempt with a [`BlockReason`] and the caller restores its
//! checkpoint.

use tracing::{debug, trace};

use crate::error::BlockReason;
use crate::item::ItemId;
use crate::math::{frames_to_gather, project, scale};
use crate::scheduler::{Floors, PlanningPass};
use crate::timeline::Resource;
use crate::types::{ItemLocation, ProductionType};

/// Upper bound on supply resolution rounds for one item.
const MAX_SUPPLY_ROUNDS: usize = 32;

impl PlanningPass<'_> {
    /// Place `item` and its open prerequisites and commit them.
    pub(crate) fn resolve_blocks(
        &mut self,
        item: ItemId,
        prerequisites: &mut Vec<ItemId>,
        floors: Floors,
    ) -> Result<(), BlockReason> {
        self.shift_for_minerals(item, prerequisites)?;
        self.shift_for_gas(item, prerequisites, floors)?;
        self.shift_for_supply(item, prerequisites, floors)?;
        self.settle(item, prerequisites)?;
        self.recheck_producer(item, prerequisites)?;
        self.commit_group(item, prerequisites, floors)
    }

    /// Earliest frame from which `resource` stays at or above `amount`
    /// until the end of the window; the window length if it never does.
    pub(crate) fn sufficient_from(&self, resource: Resource, amount: i32) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let timelines = &self.state.timelines;
        let mut frame = self.window() - 1;
        while frame >= 0 && timelines.at(resource, frame) >= amount {
            frame -= 1;
        }
        frame + 1
    }

    /// Cumulative price of the group at each member's offset from the
    /// item's start, in offset order.
    ///
    /// While a gas-tech prerequisite still waits for the first refinery,
    /// the mineral price of the group also covers that refinery and the
    /// mining lost to the prerequisites' gas.
    fn checkpoints(&self, item: ItemId, prerequisites: &[ItemId], resource: Resource) -> Vec<(i32, i32)> {
        let start = self.state.items.get(item).start;
        let gas_tech = match resource {
            Resource::Minerals => self.open_gas_tech(prerequisites),
            Resource::Gas => None,
        };
        let conversion = self.config.minerals_per_gas_unit;
        let refinery_price = self.catalog.unit(self.catalog.race().refinery).mineral_price;

        let mut spends: Vec<(i32, i32)> = prerequisites
            .iter()
            .chain(std::iter::once(&item))
            .copied()
            .filter(|&id| !self.state.items.get(id).is_queued())
            .map(|id| {
                let i = self.state.items.get(id);
                let price = match resource {
                    Resource::Minerals => {
                        let mut price = i.mineral_price();
                        if gas_tech.is_some() && id != item {
                            price += scale(i.gas_price, conversion);
                        }
                        if gas_tech == Some(id) {
                            price += refinery_price;
                        }
                        price
                    }
                    Resource::Gas => i.gas_price,
                };
                (i.start - start, price)
            })
            .filter(|&(_, price)| price > 0)
            .collect();
        spends.sort_unstable();

        let mut total = 0;
        spends
            .into_iter()
            .map(|(offset, price)| {
                total += price;
                (offset, total)
            })
            .collect()
    }

    /// Earliest start for the item, no earlier than its current start, at
    /// which the group can pay for `resource` at every member's offset.
    pub(crate) fn frame_when_resources_met(
        &self,
        item: ItemId,
        prerequisites: &[ItemId],
        resource: Resource,
    ) -> i32 {
        let window = self.window();
        let mut start = self.state.items.get(item).start;
        for (offset, total) in self.checkpoints(item, prerequisites, resource) {
            let from = self.sufficient_from(resource, total);
            if from >= window {
                return window;
            }
            start = start.max(from - offset);
        }
        start
    }

    /// Earliest start for a worker with no open prerequisites.
    ///
    /// A worker only has to be affordable net of what it mines itself
    /// after it completes.
    fn worker_break_even(&self, item: ItemId) -> i32 {
        let window = self.window();
        let worker = self.state.items.get(item);
        let price = worker.mineral_price();
        let build_time = worker.completion - worker.start;
        let rate = self.config.minerals_per_worker_frame;
        let timelines = &self.state.timelines;

        let mut start = worker.start;
        let mut frame = start.max(0);
        while frame < window {
            let completion = start + build_time;
            let mined = if frame > completion {
                project(rate, 1, frame - completion)
            } else {
                0
            };
            if timelines.at(Resource::Minerals, frame) - price + mined < 0 {
                start = frame + 1;
            }
            frame += 1;
        }
        start
    }

    fn mineral_frame(&self, item: ItemId, prerequisites: &[ItemId]) -> i32 {
        let is_worker = self.state.items.get(item).is(self.catalog.race().worker);
        if is_worker && prerequisites.is_empty() {
            self.worker_break_even(item)
        } else {
            self.frame_when_resources_met(item, prerequisites, Resource::Minerals)
        }
    }

    /// Move the group so the item starts at `start`.
    fn move_group_to(&mut self, item: ItemId, prerequisites: &[ItemId], start: i32) {
        let delta = start - self.state.items.get(item).start;
        if delta <= 0 {
            return;
        }
        trace!(delta, "group moved");
        self.state.items.shift(item, delta);
        for &id in prerequisites {
            if !self.state.items.get(id).is_queued() {
                self.state.items.shift(id, delta);
            }
        }
    }

    fn shift_for_minerals(&mut self, item: ItemId, prerequisites: &[ItemId]) -> Result<(), BlockReason> {
        let start = self.mineral_frame(item, prerequisites);
        if start >= self.window() {
            return Err(BlockReason::Minerals);
        }
        self.move_group_to(item, prerequisites, start);
        Ok(())
    }

    /// Gas still missing for the group at its current start.
    fn gas_deficit(&self, item: ItemId, prerequisites: &[ItemId]) -> i32 {
        let start = self.state.items.get(item).start;
        self.checkpoints(item, prerequisites, Resource::Gas)
            .into_iter()
            .map(|(offset, total)| total - self.state.timelines.min_from(Resource::Gas, start + offset))
            .max()
            .unwrap_or(0)
    }

    fn shift_for_gas(
        &mut self,
        item: ItemId,
        prerequisites: &[ItemId],
        floors: Floors,
    ) -> Result<(), BlockReason> {
        self.queue_refinery_for_gas_tech(prerequisites, floors);

        let needs_gas = prerequisites
            .iter()
            .chain(std::iter::once(&item))
            .any(|&id| self.state.items.get(id).gas_price > 0);
        if !needs_gas {
            return Ok(());
        }

        if self.gas_deficit(item, prerequisites) > 0 {
            self.reassign_gas_workers(item, prerequisites, floors);
        }
        if self.gas_deficit(item, prerequisites) > 0 {
            self.pull_refineries_for_gas(item, prerequisites, floors);
        }
        if self.gas_deficit(item, prerequisites) > 0 {
            self.queue_refinery_for_gas(item, prerequisites, floors);
        }

        let start = self.frame_when_resources_met(item, prerequisites, Resource::Gas);
        if start >= self.window() {
            return Err(BlockReason::Gas);
        }
        self.move_group_to(item, prerequisites, start);
        Ok(())
    }

    /// The first open gas-tech prerequisite, while no refinery exists and
    /// a geyser is free.
    fn open_gas_tech(&self, prerequisites: &[ItemId]) -> Option<ItemId> {
        if self.refinery_exists() || !self.state.locations.has_extractor_site() {
            return None;
        }
        prerequisites.iter().copied().find(|&id| {
            let i = self.state.items.get(id);
            !i.is_queued()
                && i
                    .kind
                    .unit()
                    .is_some_and(|u| self.catalog.unit(u).is_gas_tech)
        })
    }

    /// A gas-tech prerequisite without any refinery gets one queued
    /// alongside it.
    fn queue_refinery_for_gas_tech(&mut self, prerequisites: &[ItemId], floors: Floors) {
        let Some(gas_tech) = self.open_gas_tech(prerequisites) else {
            return;
        };
        let start = self.state.items.get(gas_tech).start;
        if self.queue_refinery(start, floors).is_some() {
            debug!(start, "refinery queued for gas tech");
        }
    }

    /// Commit a refinery at the first affordable frame at or after `desired`.
    fn queue_refinery(&mut self, desired: i32, floors: Floors) -> Option<ItemId> {
        let refinery = self.catalog.race().refinery;
        let kind = ProductionType::Unit(refinery);
        let mut committed = None;
        let kept = self.checked(floors, |pass| {
            let Some(site) = pass.state.locations.take_extractor_site() else {
                return false;
            };
            let mut item = pass.new_item(kind, desired.max(0), ItemLocation::Anywhere);
            item.is_prerequisite = true;
            let id = pass.state.items.push(item);
            pass.assign_location(id, site);

            let price = pass.state.items.get(id).mineral_price();
            let start = desired.max(pass.sufficient_from(Resource::Minerals, price));
            let current = pass.state.items.get(id).start;
            pass.state.items.shift(id, start - current);
            if pass.state.items.get(id).completion >= pass.window() {
                return false;
            }
            pass.commit_item(id);
            committed = Some(id);
            true
        });
        committed.filter(|_| kept)
    }

    /// Move reassignable mineral workers to gas one at a time while the
    /// group's minerals stay affordable at its current start.
    fn reassign_gas_workers(&mut self, item: ItemId, prerequisites: &[ItemId], floors: Floors) {
        let mineral_rate = self.config.minerals_per_worker_frame;
        let gas_rate = self.config.gas_per_worker_frame;
        let mut available = self.snapshot.workers.reassignable - self.state.gas_worker_delta;

        while available > 0 && self.gas_deficit(item, prerequisites) > 0 {
            let timelines = &mut self.state.timelines;
            timelines.apply_rate_change(Resource::Minerals, 0, -1, mineral_rate);
            timelines.apply_rate_change(Resource::Gas, 0, 1, gas_rate);

            let start = self.state.items.get(item).start;
            let affordable = self.state.timelines.min_from(Resource::Minerals, 0) >= floors.minerals
                && self.mineral_frame(item, prerequisites) <= start;
            if !affordable {
                let timelines = &mut self.state.timelines;
                timelines.apply_rate_change(Resource::Minerals, 0, 1, mineral_rate);
                timelines.apply_rate_change(Resource::Gas, 0, -1, gas_rate);
                break;
            }

            self.state.gas_worker_delta += 1;
            available -= 1;
            trace!(delta = self.state.gas_worker_delta, "worker moved to gas");
        }
    }

    /// Frame by which a refinery must complete for its workers to cover
    /// the current deficit before the item starts.
    fn refinery_deadline(&self, item: ItemId, prerequisites: &[ItemId]) -> i32 {
        let deficit = self.gas_deficit(item, prerequisites);
        let frames = frames_to_gather(
            deficit,
            self.config.gas_per_worker_frame,
            self.config.workers_per_refinery,
        );
        self.state.items.get(item).start.saturating_sub(frames)
    }

    /// Pull committed refineries earlier where minerals allow.
    fn pull_refineries_for_gas(&mut self, item: ItemId, prerequisites: &[ItemId], floors: Floors) {
        let refinery = self.catalog.race().refinery;
        let candidates: Vec<ItemId> = self
            .state
            .committed
            .ids()
            .filter(|&id| {
                let i = self.state.items.get(id);
                i.is(refinery) && !i.is_queued() && i.start > 0
            })
            .collect();

        for id in candidates {
            if self.gas_deficit(item, prerequisites) <= 0 {
                break;
            }
            let deadline = self.refinery_deadline(item, prerequisites);
            let refinery_item = self.state.items.get(id);
            let build_time = refinery_item.completion - refinery_item.start;
            let desired = (deadline - build_time).max(0);
            let new_start = self.earliest_affordable_move(id, desired);
            let delta = new_start - self.state.items.get(id).start;
            if delta < 0 && self.shift_committed_checked(id, delta, floors) {
                debug!(item = ?id, delta, "refinery pulled for gas");
            }
        }
    }

    /// Earliest frame at or after `desired` a committed item can move its
    /// mineral spend to, scanning back from its current start.
    pub(crate) fn earliest_affordable_move(&self, id: ItemId, desired: i32) -> i32 {
        let item = self.state.items.get(id);
        let price = item.mineral_price();
        let timelines = &self.state.timelines;
        let mut frame = item.start - 1;
        while frame >= desired.max(0) && timelines.at(Resource::Minerals, frame) >= price {
            frame -= 1;
        }
        frame + 1
    }

    fn queue_refinery_for_gas(&mut self, item: ItemId, prerequisites: &[ItemId], floors: Floors) {
        if !self.state.locations.has_extractor_site() {
            return;
        }
        let build_time = self.catalog.unit(self.catalog.race().refinery).build_time;
        let desired = (self.refinery_deadline(item, prerequisites) - build_time).max(0);
        if let Some(id) = self.queue_refinery(desired, floors) {
            debug!(item = ?id, "refinery queued for gas");
        }
    }

    fn shift_for_supply(
        &mut self,
        item: ItemId,
        prerequisites: &[ItemId],
        floors: Floors,
    ) -> Result<(), BlockReason> {
        let required = self.state.items.get(item).supply_required;
        if required <= 0 {
            return Ok(());
        }
        let window = self.window();
        let cap = self.state.timelines.supply_cap();

        for _ in 0..MAX_SUPPLY_ROUNDS {
            let start = self.state.items.get(item).start;
            let blocked = (start..window).find(|&f| self.state.timelines.supply(f) < required);
            let Some(blocked) = blocked else {
                return Ok(());
            };
            if self.state.timelines.total_supply(blocked) >= cap {
                debug!(frame = blocked, "supply blocked at cap");
                return Err(BlockReason::SupplyCap);
            }

            match self.next_supply_provider(blocked) {
                Some(provider) => {
                    let provider_item = self.state.items.get(provider);
                    if !provider_item.is_queued() {
                        let build_time = provider_item.completion - provider_item.start;
                        let desired = (blocked - build_time).max(0);
                        let new_start = self.earliest_affordable_move(provider, desired);
                        let delta = new_start - provider_item.start;
                        if delta < 0 && self.shift_committed_checked(provider, delta, floors) {
                            debug!(item = ?provider, delta, "supply provider pulled");
                        }
                    }
                    let completion = self.state.items.get(provider).completion;
                    if completion > blocked {
                        self.move_group_to(item, prerequisites, completion);
                    }
                }
                None => {
                    let completion = self.queue_supply_provider(blocked, floors)?;
                    if completion > blocked {
                        self.move_group_to(item, prerequisites, completion);
                    }
                }
            }

            if self.state.items.get(item).start >= window {
                return Err(BlockReason::Supply);
            }
        }
        Err(BlockReason::Supply)
    }

    /// First committed supply provider completing after `frame`.
    fn next_supply_provider(&self, frame: i32) -> Option<ItemId> {
        self.state
            .committed
            .ids()
            .filter(|&id| {
                let i = self.state.items.get(id);
                i.supply_provided > 0 && i.completion > frame
            })
            .min_by_key(|&id| (self.state.items.get(id).completion, id))
    }

    /// Commit a new supply provider for a block at `blocked`. Returns its
    /// completion frame.
    fn queue_supply_provider(&mut self, blocked: i32, floors: Floors) -> Result<i32, BlockReason> {
        let provider = self.catalog.race().supply_provider;
        let kind = ProductionType::Unit(provider);
        let build_time = self.catalog.unit(provider).build_time;
        let window = self.window();
        let mut completion = None;

        let kept = self.checked(floors, |pass| {
            let mut item = pass.new_item(kind, (blocked - build_time).max(0), ItemLocation::Anywhere);
            item.is_prerequisite = true;
            let id = pass.state.items.push(item);
            pass.choose_power_location(id, ItemLocation::Anywhere.region(), true, None);

            let price = pass.state.items.get(id).mineral_price();
            let current = pass.state.items.get(id).start;
            let start = current.max(pass.sufficient_from(Resource::Minerals, price));
            pass.state.items.shift(id, start - current);
            let done = pass.state.items.get(id).completion;
            if done >= window {
                return false;
            }
            pass.commit_item(id);
            debug!(start, completion = done, "supply provider queued");
            completion = Some(done);
            true
        });

        completion.filter(|_| kept).ok_or(BlockReason::Supply)
    }

    /// Rescan minerals and gas after the supply step may have spent.
    fn settle(&mut self, item: ItemId, prerequisites: &[ItemId]) -> Result<(), BlockReason> {
        let window = self.window();
        let minerals = self.mineral_frame(item, prerequisites);
        if minerals >= window {
            return Err(BlockReason::Minerals);
        }
        self.move_group_to(item, prerequisites, minerals);

        let gas = self.frame_when_resources_met(item, prerequisites, Resource::Gas);
        if gas >= window {
            return Err(BlockReason::Gas);
        }
        self.move_group_to(item, prerequisites, gas);
        Ok(())
    }

    fn recheck_producer(&mut self, item: ItemId, prerequisites: &[ItemId]) -> Result<(), BlockReason> {
        let current = self.state.items.get(item);
        let Some(producer) = current.producer else {
            return Ok(());
        };
        let available = self.producer_available_at(producer, current.kind, current.start);
        if available >= self.window() {
            return Err(BlockReason::Producer);
        }
        self.move_group_to(item, prerequisites, available);
        Ok(())
    }

    fn commit_group(
        &mut self,
        item: ItemId,
        prerequisites: &[ItemId],
        floors: Floors,
    ) -> Result<(), BlockReason> {
        for &id in prerequisites {
            if !self.state.items.get(id).is_queued() {
                self.state.items.get_mut(id).is_prerequisite = true;
                self.commit_item(id);
            }
        }
        self.commit_item(item);

        if !self.within(floors) {
            return Err(BlockReason::Overspent);
        }
        let start = self.state.items.get(item).start;
        if self.state.timelines.supply(start) < 0 {
            return Err(BlockReason::Supply);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::data::TypeCatalog;
    use crate::snapshot::{BuildLocation, TickSnapshot, WorkerCounts};
    use crate::types::TilePosition;

    fn snapshot(minerals: i32, gas: i32, workers: i32) -> TickSnapshot {
        TickSnapshot {
            minerals,
            gas,
            supply_used: 10,
            supply_total: 18,
            workers: WorkerCounts {
                mineral: workers,
                ..WorkerCounts::default()
            },
            ..TickSnapshot::default()
        }
    }

    #[test]
    fn test_sufficient_from_scans_backward() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = snapshot(0, 0, 10);
        let pass = PlanningPass::new(&catalog, &config, &snapshot);

        assert_eq!(pass.sufficient_from(Resource::Minerals, 0), 0);
        // 10 workers mine 0.465 per frame; 100 minerals at frame 216.
        let frame = pass.sufficient_from(Resource::Minerals, 100);
        assert!((214..=216).contains(&frame), "frame {frame}");
        assert_eq!(pass.sufficient_from(Resource::Gas, 1), pass.window());
    }

    #[test]
    fn test_group_checkpoints_account_for_offsets() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = snapshot(150, 0, 0);
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);
        let gateway = ProductionType::Unit(catalog.unit_id("Protoss_Gateway").unwrap());
        let zealot = ProductionType::Unit(catalog.unit_id("Protoss_Zealot").unwrap());

        let prerequisite = pass.new_item(gateway, 0, ItemLocation::Anywhere);
        let prerequisite = pass.state.items.push(prerequisite);
        let completion = pass.state.items.get(prerequisite).completion;
        let item = pass.new_item(zealot, completion, ItemLocation::Anywhere);
        let item = pass.state.items.push(item);

        // 150 minerals with no income cover the gateway (150) but not the zealot.
        let start = pass.frame_when_resources_met(item, &[prerequisite], Resource::Minerals);
        assert_eq!(start, pass.window());
    }

    #[test]
    fn test_worker_break_even_allows_overlap() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = snapshot(50, 0, 0);
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);
        let probe = ProductionType::Unit(catalog.race().worker);

        let item = pass.new_item(probe, 0, ItemLocation::Anywhere);
        let item = pass.state.items.push(item);

        assert_eq!(pass.worker_break_even(item), 0);
        pass.state.timelines.spend(Resource::Minerals, 10, 0);
        assert_eq!(pass.worker_break_even(item), pass.window());
    }

    #[test]
    fn test_supply_block_queues_provider() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = TickSnapshot {
            supply_used: 18,
            ..snapshot(500, 0, 8)
        };
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);
        let floors = pass.floors();
        let zealot = ProductionType::Unit(catalog.unit_id("Protoss_Zealot").unwrap());

        let item = pass.new_item(zealot, 0, ItemLocation::Anywhere);
        let item = pass.state.items.push(item);
        pass.resolve_blocks(item, &mut Vec::new(), floors).unwrap();

        let pylon_time = catalog.unit(catalog.race().supply_provider).build_time;
        assert_eq!(pass.state.items.get(item).start, pylon_time);
        assert_eq!(pass.state.committed.len(), 2);
    }

    #[test]
    fn test_supply_block_at_cap_fails() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = TickSnapshot {
            supply_used: 400,
            supply_total: 400,
            ..snapshot(500, 0, 8)
        };
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);
        let floors = pass.floors();
        let zealot = ProductionType::Unit(catalog.unit_id("Protoss_Zealot").unwrap());

        let item = pass.new_item(zealot, 0, ItemLocation::Anywhere);
        let item = pass.state.items.push(item);

        assert_eq!(
            pass.resolve_blocks(item, &mut Vec::new(), floors),
            Err(BlockReason::SupplyCap)
        );
    }

    fn with_geyser(snapshot: TickSnapshot) -> TickSnapshot {
        TickSnapshot {
            extractor_sites: vec![BuildLocation::at(TilePosition::new(40, 40), 4)],
            ..snapshot
        }
    }

    #[test]
    fn test_gas_tech_prerequisite_queues_refinery_alongside() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let snapshot = with_geyser(snapshot(1_000, 0, 8));
        let mut pass = PlanningPass::new(&catalog, &config, &snapshot);
        let floors = pass.floors();
        let core = ProductionType::Unit(catalog.unit_id("Protoss_Cybernetics_Core").unwrap());

        let mut item = pass.new_item(core, 300, ItemLocation::Anywhere);
        item.is_prerequisite = true;
        let core = pass.state.items.push(item);
        assert!(!pass.refinery_exists());

        pass.queue_refinery_for_gas_tech(&[core], floors);

        assert!(pass.refinery_exists());
        let refinery = catalog.race().refinery;
        let queued = pass
            .state
            .committed
            .ids()
            .map(|id| pass.state.items.get(id))
            .find(|i| i.is(refinery))
            .unwrap();
        assert_eq!(queued.start, 300);
        assert!(queued.build_location.is_some());
    }

    #[test]
    fn test_open_gas_tech_adds_refinery_to_mineral_price() {
        let catalog = TypeCatalog::protoss().unwrap();
        let config = PlannerConfig::default();
        let unit = |name: &str| ProductionType::Unit(catalog.unit_id(name).unwrap());

        let totals = |snapshot: &TickSnapshot| {
            let mut pass = PlanningPass::new(&catalog, &config, snapshot);
            let core = pass.new_item(unit("Protoss_Cybernetics_Core"), 0, ItemLocation::Anywhere);
            let core = pass.state.items.push(core);
            let citadel = pass.new_item(unit("Protoss_Citadel_of_Adun"), 0, ItemLocation::Anywhere);
            let citadel = pass.state.items.push(citadel);
            let dragoon = pass.new_item(unit("Protoss_Dragoon"), 0, ItemLocation::Anywhere);
            let dragoon = pass.state.items.push(dragoon);
            let citadel_gas = pass.state.items.get(citadel).gas_price;
            let checkpoints = pass.checkpoints(dragoon, &[core, citadel], Resource::Minerals);
            (checkpoints.last().map_or(0, |&(_, total)| total), citadel_gas)
        };

        let (without_geyser, _) = totals(&snapshot(0, 0, 0));
        let (with_geyser, citadel_gas) = totals(&with_geyser(snapshot(0, 0, 0)));

        let refinery_price = catalog.unit(catalog.race().refinery).mineral_price;
        let mined_gas = scale(citadel_gas, config.minerals_per_gas_unit);
        assert!(mined_gas > 0);
        assert_eq!(with_geyser - without_geyser, refinery_price + mined_gas);
    }
}
