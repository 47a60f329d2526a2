//! Production items and the ordered sets that hold them.
//!
//! Items live in an [`ItemArena`] and are referred to by [`ItemId`], which
//! doubles as the insertion sequence number. An [`ItemSet`] is a sorted
//! index over arena items keyed by `(start, completion, id)`. Because the
//! key embeds the frames, an item that belongs to a set must be removed
//! before its frames change and reinserted afterwards; [`ItemArena::shift_in`]
//! does this.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::snapshot::BuildLocation;
use crate::types::{ItemLocation, PendingBuildingId, ProductionType, UnitId};

/// Stable handle of an item within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Handle of a producer within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProducerId(pub u32);

/// A planned production action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionItem {
    /// Handle and insertion sequence.
    pub id: ItemId,
    /// What is produced.
    pub kind: ProductionType,
    /// Placement or origin constraint.
    pub location: ItemLocation,
    /// Frame offset at which production starts.
    pub start: i32,
    /// Frame offset at which production completes.
    pub completion: i32,
    /// Mineral price of the kind.
    pub base_minerals: i32,
    /// Estimated mining lost to the builder's trip.
    pub travel_penalty: i32,
    /// Gas price.
    pub gas_price: i32,
    /// Supply added on completion.
    pub supply_provided: i32,
    /// Supply consumed from the start.
    pub supply_required: i32,
    /// Producer that will make this item.
    pub producer: Option<ProducerId>,
    /// Chosen build location, buildings only.
    pub build_location: Option<BuildLocation>,
    /// Whether the prerequisite expansion inserted this item.
    pub is_prerequisite: bool,
    /// Builder entry this item mirrors, if the work is already queued.
    pub in_progress: Option<PendingBuildingId>,
    /// Whether the mirrored building has already been placed.
    pub construction_started: bool,
    /// Worker set aside to construct this item.
    pub builder: Option<UnitId>,
}

impl ProductionItem {
    /// Total mineral price including the travel penalty.
    #[must_use]
    pub const fn mineral_price(&self) -> i32 {
        self.base_minerals + self.travel_penalty
    }

    /// Check if this item is a unit of the given type.
    #[must_use]
    pub fn is(&self, unit_type: crate::types::UnitTypeId) -> bool {
        self.kind.is(unit_type)
    }

    /// Whether this item mirrors a building already queued with the builder.
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Sort key for ordered sets.
    #[must_use]
    pub const fn key(&self) -> ItemKey {
        ItemKey {
            start: self.start,
            completion: self.completion,
            id: self.id,
        }
    }

    fn offset(&mut self, delta: i32) {
        self.start += delta;
        self.completion += delta;
    }
}

/// Ordering key: start frame, then completion frame, then insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemKey {
    start: i32,
    completion: i32,
    id: ItemId,
}

/// Owning storage for every item created during a tick.
#[derive(Debug, Clone, Default)]
pub struct ItemArena {
    items: Vec<ProductionItem>,
}

impl ItemArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, assigning its id.
    pub fn push(&mut self, mut item: ProductionItem) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        item.id = id;
        self.items.push(item);
        id
    }

    /// Get an item.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this arena.
    #[must_use]
    pub fn get(&self, id: ItemId) -> &ProductionItem {
        &self.items[id.0 as usize]
    }

    /// Get an item mutably. Must not be used to change frames of an item
    /// that is in an [`ItemSet`].
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this arena.
    pub fn get_mut(&mut self, id: ItemId) -> &mut ProductionItem {
        &mut self.items[id.0 as usize]
    }

    /// Number of items created this tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Shift an item that is not in any ordered set.
    pub fn shift(&mut self, id: ItemId, delta: i32) {
        self.get_mut(id).offset(delta);
    }

    /// Shift an item that belongs to `set`, keeping the set ordered.
    pub fn shift_in(&mut self, set: &mut ItemSet, id: ItemId, delta: i32) {
        let item = &mut self.items[id.0 as usize];
        let present = set.keys.remove(&item.key());
        item.offset(delta);
        if present {
            set.keys.insert(item.key());
        }
    }

    /// Shift every item in `ids` from position `from` onward.
    pub fn shift_all(&mut self, ids: &[ItemId], from: usize, delta: i32) {
        if delta == 0 {
            return;
        }
        for &id in ids.iter().skip(from) {
            self.shift(id, delta);
        }
    }

    /// Sort a list of item ids by the set ordering.
    pub fn sort(&self, ids: &mut [ItemId]) {
        ids.sort_by_key(|&id| self.get(id).key());
    }
}

/// Ordered index over arena items.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    keys: BTreeSet<ItemKey>,
}

impl ItemSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item at its current frames.
    pub fn insert(&mut self, arena: &ItemArena, id: ItemId) {
        self.keys.insert(arena.get(id).key());
    }

    /// Remove an item. Must be called before the item's frames change.
    pub fn remove(&mut self, arena: &ItemArena, id: ItemId) -> bool {
        self.keys.remove(&arena.get(id).key())
    }

    /// Whether the set holds the item at its current frames.
    #[must_use]
    pub fn contains(&self, arena: &ItemArena, id: ItemId) -> bool {
        self.keys.contains(&arena.get(id).key())
    }

    /// Item ids in order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = ItemId> + '_ {
        self.keys.iter().map(|k| k.id)
    }

    /// Item ids in order, collected so the arena can be mutated while walking.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ItemId> {
        self.ids().collect()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::UnitTypeId;

    pub(crate) fn item(start: i32, duration: i32) -> ProductionItem {
        ProductionItem {
            id: ItemId(0),
            kind: ProductionType::Unit(UnitTypeId(0)),
            location: ItemLocation::Anywhere,
            start,
            completion: start + duration,
            base_minerals: 100,
            travel_penalty: 0,
            gas_price: 0,
            supply_provided: 0,
            supply_required: 0,
            producer: None,
            build_location: None,
            is_prerequisite: false,
            in_progress: None,
            construction_started: false,
            builder: None,
        }
    }

    #[test]
    fn test_set_orders_by_start_completion_then_sequence() {
        let mut arena = ItemArena::new();
        let mut set = ItemSet::new();
        let late = arena.push(item(50, 100));
        let early_long = arena.push(item(10, 300));
        let early_short = arena.push(item(10, 100));
        let tie = arena.push(item(10, 100));
        for id in [late, early_long, early_short, tie] {
            set.insert(&arena, id);
        }

        assert_eq!(set.to_vec(), vec![early_short, tie, early_long, late]);
    }

    #[test]
    fn test_shift_in_reorders() {
        let mut arena = ItemArena::new();
        let mut set = ItemSet::new();
        let a = arena.push(item(0, 100));
        let b = arena.push(item(20, 100));
        set.insert(&arena, a);
        set.insert(&arena, b);

        arena.shift_in(&mut set, a, 50);

        assert_eq!(set.to_vec(), vec![b, a]);
        assert_eq!(arena.get(a).completion, 150);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_shift_all_from_position() {
        let mut arena = ItemArena::new();
        let ids = vec![arena.push(item(0, 10)), arena.push(item(5, 10))];

        arena.shift_all(&ids, 1, 7);

        assert_eq!(arena.get(ids[0]).start, 0);
        assert_eq!(arena.get(ids[1]).start, 12);
    }
}
