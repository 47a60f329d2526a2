//! Build location bookkeeping.
//!
//! The placement collaborator hands us every candidate location up front.
//! [`LocationPool`] groups them per region and footprint width, keeps each
//! group ordered (see [`BuildLocation`]'s ordering) and hands them out as
//! buildings are planned. Building a power source adds the locations it
//! powers, annotated with the frame the power arrives.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::error::BlockReason;
use crate::item::ItemId;
use crate::scheduler::{Floors, PlanningPass};
use crate::snapshot::{BuildLocation, PoweredLocation};
use crate::timeline::Resource;
use crate::types::{ItemLocation, ProductionType, RegionId, TilePosition};

/// Footprint width of the power source.
const POWER_WIDTH: u8 = 2;

/// How many locations of each larger width we try to keep powered.
const DESIRED_POWERED: usize = 2;

/// Candidate build locations still free this tick.
#[derive(Debug, Clone, Default)]
pub struct LocationPool {
    sets: BTreeMap<(RegionId, u8), BTreeSet<BuildLocation>>,
    extractor_sites: BTreeSet<BuildLocation>,
}

impl LocationPool {
    /// Build the pool, leaving out tiles where a building is already queued.
    #[must_use]
    pub fn new(
        locations: &[BuildLocation],
        extractor_sites: &[BuildLocation],
        occupied: &BTreeSet<TilePosition>,
    ) -> Self {
        let mut pool = Self::default();
        for location in locations.iter().filter(|l| !occupied.contains(&l.tile)) {
            pool.add(location.clone());
        }
        pool.extractor_sites = extractor_sites
            .iter()
            .filter(|l| !occupied.contains(&l.tile))
            .cloned()
            .collect();
        pool
    }

    /// Add a location. A tile already in the pool keeps whichever entry is
    /// powered first.
    pub fn add(&mut self, location: BuildLocation) {
        let set = self
            .sets
            .entry((location.region, location.width))
            .or_default();
        if let Some(existing) = set.iter().find(|l| l.tile == location.tile).cloned() {
            if existing.frames_until_powered <= location.frames_until_powered {
                return;
            }
            set.remove(&existing);
        }
        set.insert(location);
    }

    /// Number of free locations of a width in a region.
    #[must_use]
    pub fn count(&self, region: RegionId, width: u8) -> usize {
        self.sets.get(&(region, width)).map_or(0, BTreeSet::len)
    }

    /// Best free location of a width, optionally requiring an exit.
    #[must_use]
    pub fn first(&self, region: RegionId, width: u8, needs_exit: bool) -> Option<&BuildLocation> {
        self.sets
            .get(&(region, width))?
            .iter()
            .find(|l| !needs_exit || l.has_exit)
    }

    /// Locations of a width in a region, best first.
    pub fn iter(&self, region: RegionId, width: u8) -> impl Iterator<Item = &BuildLocation> {
        self.sets.get(&(region, width)).into_iter().flatten()
    }

    /// Remove a location.
    pub fn take(&mut self, location: &BuildLocation) -> bool {
        self.sets
            .get_mut(&(location.region, location.width))
            .is_some_and(|set| set.remove(location))
    }

    /// Remove and return the location at a tile, if it is in the pool.
    pub fn take_tile(&mut self, tile: TilePosition, width: u8) -> Option<BuildLocation> {
        let found = self
            .sets
            .iter()
            .filter(|((_, w), _)| *w == width)
            .flat_map(|(_, set)| set.iter())
            .find(|l| l.tile == tile)
            .cloned()?;
        self.take(&found);
        Some(found)
    }

    /// Whether any gas geyser is free.
    #[must_use]
    pub fn has_extractor_site(&self) -> bool {
        !self.extractor_sites.is_empty()
    }

    /// Remove and return the best free geyser.
    pub fn take_extractor_site(&mut self) -> Option<BuildLocation> {
        self.extractor_sites.pop_first()
    }
}

impl PlanningPass<'_> {
    /// Mining lost by a builder travelling `frames` each way.
    pub(crate) fn travel_penalty(&self, frames: i32) -> i32 {
        crate::math::project(
            self.config.minerals_per_worker_frame,
            self.config.worker_travel_trips,
            frames,
        )
    }

    /// Score power source locations and pick the best one.
    ///
    /// Scoring starts from travel frames and doubles for every larger
    /// location short of [`DESIRED_POWERED`] that the site would not power.
    /// With `required_width` set, only sites powering that width count;
    /// if none does, the first site is returned.
    pub(crate) fn best_power_location(
        &self,
        region: RegionId,
        required_width: Option<u8>,
    ) -> Option<BuildLocation> {
        let pool = &self.state.locations;
        let desired_medium = DESIRED_POWERED.saturating_sub(pool.count(region, 3));
        let desired_large = DESIRED_POWERED.saturating_sub(pool.count(region, 4));

        let mut best: Option<(i64, &BuildLocation)> = None;
        for candidate in pool.iter(region, POWER_WIDTH) {
            let medium = candidate.powers_width(3).count();
            let large = candidate.powers_width(4).count();
            match required_width {
                Some(3) if medium == 0 => continue,
                Some(4) if large == 0 => continue,
                _ => {}
            }

            let missing = desired_medium.saturating_sub(medium) + desired_large.saturating_sub(large);
            let score = i64::from(candidate.builder_frames) << missing.min(16);
            if best.map_or(true, |(b, _)| score < b) {
                best = Some((score, candidate));
            }
        }

        best.map(|(_, l)| l.clone())
            .or_else(|| pool.iter(region, POWER_WIDTH).next().cloned())
    }

    /// Choose a power source location for an item.
    ///
    /// A tentative choice only estimates the travel penalty; a final one
    /// also takes the location and makes what it powers available from the
    /// item's completion.
    pub(crate) fn choose_power_location(
        &mut self,
        item: ItemId,
        region: RegionId,
        tentative: bool,
        required_width: Option<u8>,
    ) -> bool {
        let Some(location) = self.best_power_location(region, required_width) else {
            return false;
        };

        if tentative {
            let penalty = self.travel_penalty(location.builder_frames);
            self.state.items.get_mut(item).travel_penalty = penalty;
            return true;
        }

        self.state.locations.take(&location);
        let completion = self.state.items.get(item).completion;
        for powered in &location.powers {
            self.state
                .locations
                .add(powered_location(powered, region, completion));
        }
        trace!(tile = %location.tile, powered_from = completion, "power location chosen");
        self.state.items.get_mut(item).build_location = Some(location);
        true
    }

    /// Reserve build locations for the buildings in a goal's item list.
    ///
    /// Items are visited in order. A building that needs power it will not
    /// have in time pulls a power source earlier or queues a new one, and
    /// the building and everything after it are pushed back to when the
    /// location is powered. New power sources are returned so the caller
    /// can add them to the goal's items.
    pub(crate) fn reserve_build_positions(
        &mut self,
        ids: &[ItemId],
        floors: Floors,
    ) -> Result<Vec<ItemId>, BlockReason> {
        let catalog = self.catalog;
        let mut added = Vec::new();
        let power = catalog.race().supply_provider;
        let refinery = catalog.race().refinery;

        for (index, &id) in ids.iter().enumerate() {
            let item = self.state.items.get(id);
            if item.is_queued() || item.build_location.is_some() {
                continue;
            }
            let ProductionType::Unit(unit_type) = item.kind else {
                continue;
            };
            let location = item.location;
            let start = item.start;
            let unit = catalog.unit(unit_type);
            if !unit.is_building {
                continue;
            }

            if let ItemLocation::Tile(tile) = location {
                let chosen = self
                    .state
                    .locations
                    .take_tile(tile, unit.tile_width)
                    .unwrap_or_else(|| BuildLocation::at(tile, unit.tile_width));
                self.assign_location(id, chosen);
                continue;
            }

            if unit_type == power {
                self.choose_power_location(id, location.region(), true, None);
                continue;
            }

            if unit_type == refinery {
                let Some(site) = self.state.locations.take_extractor_site() else {
                    debug!("no free geyser for refinery");
                    return Err(BlockReason::Location);
                };
                self.assign_location(id, site);
                continue;
            }

            let region = location.region();
            let width = unit.tile_width;
            let needs_exit = unit.requires_exit;

            if !unit.requires_power {
                let Some(chosen) = self.state.locations.first(region, width, needs_exit).cloned()
                else {
                    warn!(building = %unit.name, "no build location available");
                    return Err(BlockReason::Location);
                };
                self.state.locations.take(&chosen);
                self.assign_location(id, chosen);
                continue;
            }

            let powered_at = self
                .state
                .locations
                .first(region, width, needs_exit)
                .map_or(i32::MAX, |l| l.frames_until_powered);

            if powered_at > start {
                if let Some(new_power) = self.provide_power(start, powered_at, region, width, floors) {
                    added.push(new_power);
                }
            }

            let Some(chosen) = self.state.locations.first(region, width, needs_exit).cloned() else {
                warn!(building = %unit.name, "no build location available");
                return Err(BlockReason::Location);
            };
            self.state.locations.take(&chosen);
            let delta = chosen.frames_until_powered - start;
            self.assign_location(id, chosen);

            if delta > 0 {
                debug!(delta, "shifting for power");
                self.state.items.shift_all(ids, index, delta);
            }
        }

        Ok(added)
    }

    pub(crate) fn assign_location(&mut self, id: ItemId, location: BuildLocation) {
        let penalty = self.travel_penalty(location.builder_frames);
        let item = self.state.items.get_mut(id);
        item.travel_penalty = penalty;
        item.build_location = Some(location);
    }

    /// Bring the locations a committed power source powers in line with
    /// its current completion frame.
    pub(crate) fn refresh_power(&mut self, id: ItemId) {
        let item = self.state.items.get(id);
        if !item.is(self.catalog.race().supply_provider) {
            return;
        }
        let Some(location) = item.build_location.as_ref() else {
            return;
        };
        let completion = item.completion;
        let region = location.region;
        let tiles: Vec<_> = location.powers.iter().map(|p| (p.tile, p.width)).collect();

        for (tile, width) in tiles {
            let stale = self
                .state
                .locations
                .iter(region, width)
                .find(|l| l.tile == tile && l.frames_until_powered != completion && l.frames_until_powered > 0)
                .cloned();
            if let Some(mut moved) = stale {
                self.state.locations.take(&moved);
                moved.frames_until_powered = completion;
                self.state.locations.add(moved);
            }
        }
    }

    /// Make sure a location of `width` is powered by `needed_at`.
    ///
    /// Prefers a committed power source that has no location yet; otherwise
    /// queues a new one unless the best existing location is powered sooner
    /// than one could be built. Returns the id of a newly queued source.
    fn provide_power(
        &mut self,
        needed_at: i32,
        powered_at: i32,
        region: RegionId,
        width: u8,
        floors: Floors,
    ) -> Option<ItemId> {
        let power = self.catalog.race().supply_provider;
        let build_time = self.catalog.unit(power).build_time;

        let committed = self.state.committed.ids().find(|&id| {
            let item = self.state.items.get(id);
            item.is(power) && !item.is_queued() && item.build_location.is_none()
        });

        let mut created = None;
        let source = match committed {
            Some(id) => Some(id),
            None if powered_at >= build_time => {
                let start = (needed_at - build_time).max(0);
                let item = self.new_item(ProductionType::Unit(power), start, ItemLocation::Region(region));
                let id = self.state.items.push(item);
                created = Some(id);
                Some(id)
            }
            None => None,
        }?;

        let source_item = self.state.items.get(source);
        let mut keep = true;
        if source_item.completion > needed_at && source_item.start > 0 {
            let desired = (needed_at - build_time).max(0);
            let price = source_item.mineral_price();
            let current_start = source_item.start;

            let mut frame = current_start - 1;
            while frame >= desired && self.state.timelines.at(Resource::Minerals, frame) >= price {
                frame -= 1;
            }
            frame += 1;

            if frame + build_time >= powered_at {
                keep = false;
            } else if created.is_some() {
                self.state.items.shift(source, frame - current_start);
            } else if !self.shift_committed_checked(source, frame - current_start, floors) {
                keep = false;
            }
        }

        if !keep {
            return None;
        }

        self.choose_power_location(source, region, false, Some(width));
        created
    }
}

fn powered_location(powered: &PoweredLocation, region: RegionId, powered_from: i32) -> BuildLocation {
    BuildLocation {
        tile: powered.tile,
        region,
        width: powered.width,
        builder_frames: powered.builder_frames,
        frames_until_powered: powered_from,
        has_exit: powered.has_exit,
        distance_to_exit: powered.distance_to_exit,
        powers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(x: i32, width: u8, powered: i32) -> BuildLocation {
        BuildLocation {
            tile: TilePosition::new(x, 0),
            region: RegionId::MAIN_BASE,
            width,
            builder_frames: x,
            frames_until_powered: powered,
            has_exit: false,
            distance_to_exit: 0,
            powers: Vec::new(),
        }
    }

    #[test]
    fn test_pool_groups_by_width_and_skips_occupied() {
        let occupied: BTreeSet<_> = [TilePosition::new(2, 0)].into_iter().collect();
        let pool = LocationPool::new(
            &[location(1, 2, 0), location(2, 2, 0), location(3, 3, 0)],
            &[],
            &occupied,
        );

        assert_eq!(pool.count(RegionId::MAIN_BASE, 2), 1);
        assert_eq!(pool.count(RegionId::MAIN_BASE, 3), 1);
        assert!(!pool.has_extractor_site());
    }

    #[test]
    fn test_first_prefers_powered_then_exit_requirement() {
        let mut with_exit = location(9, 4, 0);
        with_exit.has_exit = true;
        let pool = LocationPool::new(
            &[location(1, 4, 300), location(5, 4, 0), with_exit],
            &[],
            &BTreeSet::new(),
        );

        let first = pool.first(RegionId::MAIN_BASE, 4, false).unwrap();
        assert_eq!(first.tile.x, 5);
        let exit = pool.first(RegionId::MAIN_BASE, 4, true).unwrap();
        assert_eq!(exit.tile.x, 9);
    }

    #[test]
    fn test_take_tile() {
        let mut pool = LocationPool::new(&[location(4, 3, 0)], &[], &BTreeSet::new());
        assert!(pool.take_tile(TilePosition::new(4, 0), 3).is_some());
        assert!(pool.take_tile(TilePosition::new(4, 0), 3).is_none());
        assert_eq!(pool.count(RegionId::MAIN_BASE, 3), 0);
    }
}
