//! Producer pool and assignment.
//!
//! A producer is either a completed unit or a planned building. Each keeps
//! the items queued on it in start order, and [`available_at`] finds the
//! first gap in that queue long enough for another item.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::forecast::remaining_build_time;
use crate::item::{ItemArena, ItemId, ProducerId};
use crate::scheduler::PlanningPass;
use crate::snapshot::{CommandKind, OwnUnit};
use crate::types::{ItemLocation, ProductionType, UnitId, UnitTypeId};

/// Where a producer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerSource {
    /// A building planned or queued this tick.
    Planned(ItemId),
    /// A unit that exists in the game.
    Existing(UnitId),
}

/// A production facility.
#[derive(Debug, Clone)]
pub struct Producer {
    /// Origin.
    pub source: ProducerSource,
    /// Earliest frame it can start new work.
    pub available_from: i32,
    /// Items queued on it, in start order.
    pub items: Vec<ItemId>,
}

/// All producers referenced this tick, deduplicated by origin.
#[derive(Debug, Clone, Default)]
pub struct ProducerPool {
    producers: Vec<Producer>,
    planned: BTreeMap<ItemId, ProducerId>,
    existing: BTreeMap<UnitId, ProducerId>,
}

impl ProducerPool {
    /// Producer backed by a planned item, created on first use.
    pub fn planned(&mut self, item: ItemId, available_from: i32) -> ProducerId {
        if let Some(&id) = self.planned.get(&item) {
            return id;
        }
        let id = self.add(ProducerSource::Planned(item), available_from);
        self.planned.insert(item, id);
        id
    }

    /// Producer backed by an existing unit, created on first use.
    pub fn existing(&mut self, unit: UnitId, available_from: i32) -> ProducerId {
        if let Some(&id) = self.existing.get(&unit) {
            return id;
        }
        let id = self.add(ProducerSource::Existing(unit), available_from);
        self.existing.insert(unit, id);
        id
    }

    fn add(&mut self, source: ProducerSource, available_from: i32) -> ProducerId {
        let id = ProducerId(self.producers.len() as u32);
        self.producers.push(Producer {
            source,
            available_from,
            items: Vec::new(),
        });
        id
    }

    /// Get a producer.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this pool.
    #[must_use]
    pub fn get(&self, id: ProducerId) -> &Producer {
        &self.producers[id.0 as usize]
    }

    /// Queue an item on a producer.
    pub fn add_item(&mut self, id: ProducerId, item: ItemId, arena: &ItemArena) {
        let items = &mut self.producers[id.0 as usize].items;
        items.push(item);
        arena.sort(items);
    }

    /// Restore start order after one of a producer's items moved.
    pub fn resort(&mut self, id: ProducerId, arena: &ItemArena) {
        arena.sort(&mut self.producers[id.0 as usize].items);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.producers.len()
    }
}

/// Earliest frame at or after `start` where `producer` can fit an item of
/// `build_time` frames between its queued items; `window` if none.
#[must_use]
pub fn available_at(
    producer: &Producer,
    arena: &ItemArena,
    build_time: i32,
    start: i32,
    window: i32,
) -> i32 {
    let mut frame = start.max(producer.available_from);
    if let ProducerSource::Planned(item) = producer.source {
        frame = frame.max(arena.get(item).completion);
    }

    let mut queued = producer.items.iter().map(|&id| arena.get(id)).peekable();
    while frame < window {
        match queued.peek() {
            Some(next) if frame >= next.start - build_time => {
                frame = frame.max(next.completion);
                queued.next();
            }
            _ => return frame,
        }
    }
    window
}

impl PlanningPass<'_> {
    /// Gather every producer that could make `kind` for a goal.
    ///
    /// Returns `None` if in-flight commands already satisfy the goal's count.
    pub(crate) fn collect_producers(
        &mut self,
        kind: ProductionType,
        producer_type: UnitTypeId,
        location: ItemLocation,
        prerequisites: &[ItemId],
        to_produce: &mut Option<u32>,
    ) -> Option<Vec<ProducerId>> {
        let snapshot = self.snapshot;
        let mut producers = Vec::new();
        let push = |producers: &mut Vec<ProducerId>, id: ProducerId| {
            if !producers.contains(&id) {
                producers.push(id);
            }
        };

        // Planned by this goal
        for &id in prerequisites {
            let item = self.state.items.get(id);
            if item.is(producer_type) {
                let producer = self.state.producers.planned(id, item.completion);
                push(&mut producers, producer);
            }
        }

        // Committed by earlier goals
        for id in self.state.committed.to_vec() {
            let item = self.state.items.get(id);
            if !item.is(producer_type) {
                continue;
            }
            let completion = item.completion;
            let unit = item.in_progress.and_then(|building| {
                snapshot
                    .pending_buildings
                    .iter()
                    .find(|p| p.id == building)
                    .and_then(|p| p.unit)
            });
            let producer = match unit {
                Some(unit) => self.state.producers.existing(unit, completion),
                None => self.state.producers.planned(id, completion),
            };
            push(&mut producers, producer);
        }

        // Completed units
        let command = match kind {
            ProductionType::Unit(_) => CommandKind::Train,
            ProductionType::Upgrade { upgrade, .. } => {
                if self.catalog.upgrade(upgrade).is_tech {
                    CommandKind::Research
                } else {
                    CommandKind::Upgrade
                }
            }
        };
        let mut units: Vec<&OwnUnit> = snapshot
            .units
            .iter()
            .filter(|u| u.completed && u.unit_type == producer_type)
            .filter(|u| self.producer_matches(kind, location, u))
            .collect();
        units.sort_by_key(|u| u.id);

        for unit in units {
            if let (ProductionType::Unit(_), Some(count)) = (kind, to_produce.as_mut()) {
                if self.has_in_flight_command(unit, kind) {
                    *count = count.saturating_sub(1);
                    debug!(unit = ?unit.id, remaining = *count, "in-flight train command counted");
                    if *count == 0 {
                        return None;
                    }
                }
            }

            let remaining = remaining_build_time(unit, command, self.catalog, snapshot);
            let producer = self.state.producers.existing(unit.id, remaining + 1);
            push(&mut producers, producer);
        }

        trace!(kind = %self.catalog.label(kind), count = producers.len(), "collected producers");
        Some(producers)
    }

    /// A base constraint only restricts which depots may train workers.
    fn producer_matches(&self, kind: ProductionType, location: ItemLocation, unit: &OwnUnit) -> bool {
        match location {
            ItemLocation::Base(base) if kind.is(self.catalog.race().worker) => unit.base == Some(base),
            _ => true,
        }
    }

    fn has_in_flight_command(&self, unit: &OwnUnit, kind: ProductionType) -> bool {
        unit.last_command.is_some_and(|command| {
            command.kind == CommandKind::Train
                && command.target == kind
                && self.snapshot.frame - command.frame - 1 < self.snapshot.latency_frames
        })
    }

    /// Earliest frame a producer can start `kind` at or after `start`.
    pub(crate) fn producer_available_at(
        &self,
        producer: ProducerId,
        kind: ProductionType,
        start: i32,
    ) -> i32 {
        available_at(
            self.state.producers.get(producer),
            &self.state.items,
            self.catalog.build_time(kind),
            start,
            self.window(),
        )
    }
}
