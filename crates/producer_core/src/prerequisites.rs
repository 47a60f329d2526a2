//! Missing prerequisite expansion.
//!
//! Frames are first laid out backward from the goal's item at frame 0:
//! each missing building completes exactly when the thing that needs it
//! starts. [`PlanningPass::normalize_start_frame`] then moves the whole
//! chain so the earliest item starts at frame 0.

use std::collections::BTreeSet;

use tracing::{debug, error, trace};

use crate::item::ItemId;
use crate::scheduler::PlanningPass;
use crate::types::{ItemLocation, ProductionType, UnitTypeId};

impl PlanningPass<'_> {
    /// Buildings `kind` needs that neither exist nor are under construction
    /// yet, as items ending where their dependents start.
    ///
    /// Returns `None` on a dependency cycle.
    pub(crate) fn add_missing_prerequisites(
        &mut self,
        kind: ProductionType,
        extra: Option<UnitTypeId>,
        location: ItemLocation,
    ) -> Option<Vec<ItemId>> {
        let location = match location {
            ItemLocation::Region(_) => location,
            _ => ItemLocation::Anywhere,
        };

        let mut roots = self.direct_requirements(kind);
        roots.extend(extra);

        // (type, frame it is needed by, chain of types that led here)
        let mut worklist: Vec<(UnitTypeId, i32, Vec<UnitTypeId>)> =
            roots.into_iter().rev().map(|t| (t, 0, Vec::new())).collect();
        let mut items = Vec::new();

        while let Some((unit_type, needed_by, ancestors)) = worklist.pop() {
            if ancestors.contains(&unit_type) {
                error!(
                    unit = %self.catalog.unit(unit_type).name,
                    "dependency cycle in catalog"
                );
                return None;
            }
            if self.snapshot.count_completed(unit_type) > 0 {
                continue;
            }

            let unit_kind = ProductionType::Unit(unit_type);
            let pending = self
                .snapshot
                .pending_of_type(unit_type)
                .map(|p| p.frames_until_completed)
                .min();

            if let Some(remaining) = pending {
                let mut item = self.new_item(unit_kind, needed_by - remaining.max(0), location);
                item.completion = needed_by;
                item.is_prerequisite = true;
                trace!(unit = %self.catalog.unit(unit_type).name, remaining, "placeholder for pending building");
                items.push(self.state.items.push(item));
                continue;
            }

            let build_time = self.catalog.unit(unit_type).build_time;
            let start = needed_by - build_time;
            let mut item = self.new_item(unit_kind, start, location);
            item.is_prerequisite = true;
            items.push(self.state.items.push(item));

            let mut chain = ancestors;
            chain.push(unit_type);
            for requirement in self.direct_requirements(unit_kind).into_iter().rev() {
                worklist.push((requirement, start, chain.clone()));
            }
        }

        Some(items)
    }

    /// Producer type (unless it is the worker) and required types.
    fn direct_requirements(&self, kind: ProductionType) -> Vec<UnitTypeId> {
        let worker = self.catalog.race().worker;
        let mut requirements = Vec::new();
        if let Some(producer) = self.catalog.producer_of(kind) {
            if producer != worker {
                requirements.push(producer);
            }
        }
        for &requirement in self.catalog.requirements(kind) {
            if !requirements.contains(&requirement) {
                requirements.push(requirement);
            }
        }
        requirements
    }

    /// Move items so the earliest starts at frame 0, then sort them.
    pub(crate) fn normalize_start_frame(&mut self, ids: &mut [ItemId]) {
        let Some(earliest) = ids.iter().map(|&id| self.state.items.get(id).start).min() else {
            return;
        };
        self.state.items.shift_all(ids, 0, -earliest);
        self.state.items.sort(ids);
    }

    /// Drop repeated types and types already committed this tick.
    ///
    /// When a committed item stands in for a dropped one, every later item
    /// moves back by however much later the committed item completes.
    /// Returns the latest completion among the committed stand-ins (0 if
    /// none), before which the goal's item cannot start.
    pub(crate) fn resolve_duplicates(&mut self, ids: &mut Vec<ItemId>) -> i32 {
        let mut seen = BTreeSet::new();
        let mut ready = 0;
        let mut index = 0;

        while index < ids.len() {
            let id = ids[index];
            let item = self.state.items.get(id);
            let kind = item.kind;
            let completion = item.completion;

            if !seen.insert(kind) {
                ids.remove(index);
                continue;
            }

            let committed = self
                .state
                .committed
                .ids()
                .map(|c| self.state.items.get(c))
                .filter(|c| c.kind == kind)
                .map(|c| c.completion)
                .min();

            match committed {
                Some(committed_completion) => {
                    ids.remove(index);
                    ready = ready.max(committed_completion);
                    let delta = committed_completion - completion;
                    if delta >= 1 {
                        self.state.items.shift_all(ids, index, delta);
                    }
                    debug!(
                        item = %self.catalog.label(kind),
                        completion = committed_completion,
                        "prerequisite already committed"
                    );
                }
                None => index += 1,
            }
        }

        self.state.items.sort(ids);
        ready
    }
}
