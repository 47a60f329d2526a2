//! Production goals and mineral reservations.
//!
//! Goals arrive as an ordered list, highest priority first. The scheduler
//! never reorders them.

use serde::{Deserialize, Serialize};

use crate::types::{ItemLocation, ProductionType, UnitId, UnitTypeId, UpgradeTypeId};

/// Request to produce units or buildings of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitGoal {
    /// Type to produce.
    pub unit_type: UnitTypeId,
    /// Placement or origin constraint.
    #[serde(default)]
    pub location: ItemLocation,
    /// How many to produce, `None` for as many as possible.
    #[serde(default)]
    pub count: Option<u32>,
    /// Maximum number of producers to use, `None` for no limit.
    #[serde(default)]
    pub producer_limit: Option<u32>,
    /// Worker already set aside to construct the building.
    #[serde(default)]
    pub reserved_worker: Option<UnitId>,
    /// Absolute frame by which the items should complete.
    #[serde(default)]
    pub target_frame: Option<i32>,
}

impl UnitGoal {
    /// Goal for a fixed number of units anywhere.
    #[must_use]
    pub fn new(unit_type: UnitTypeId, count: u32) -> Self {
        Self {
            unit_type,
            location: ItemLocation::Anywhere,
            count: Some(count),
            producer_limit: None,
            reserved_worker: None,
            target_frame: None,
        }
    }

    /// Goal for as many units as can be afforded.
    #[must_use]
    pub fn unlimited(unit_type: UnitTypeId) -> Self {
        Self {
            count: None,
            ..Self::new(unit_type, 0)
        }
    }

    /// Set the producer limit.
    #[must_use]
    pub const fn with_producer_limit(mut self, limit: u32) -> Self {
        self.producer_limit = Some(limit);
        self
    }

    /// Set the location constraint.
    #[must_use]
    pub const fn at(mut self, location: ItemLocation) -> Self {
        self.location = location;
        self
    }
}

/// Request to research the next level of an upgrade or a tech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeGoal {
    /// Upgrade to research.
    pub upgrade: UpgradeTypeId,
    /// Level to reach.
    pub level: u8,
    /// Building that must exist before this level (beyond the researcher).
    #[serde(default)]
    pub prerequisite: Option<UnitTypeId>,
    /// Absolute frame by which the research should complete.
    #[serde(default)]
    pub target_frame: Option<i32>,
}

/// One entry of the prioritized goal list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionGoal {
    /// Units or buildings.
    Unit(UnitGoal),
    /// An upgrade level or tech.
    Upgrade(UpgradeGoal),
}

impl ProductionGoal {
    /// What this goal produces.
    #[must_use]
    pub const fn kind(&self) -> ProductionType {
        match self {
            Self::Unit(goal) => ProductionType::Unit(goal.unit_type),
            Self::Upgrade(goal) => ProductionType::Upgrade {
                upgrade: goal.upgrade,
                level: goal.level,
            },
        }
    }

    /// Target completion frame, if any.
    #[must_use]
    pub const fn target_frame(&self) -> Option<i32> {
        match self {
            Self::Unit(goal) => goal.target_frame,
            Self::Upgrade(goal) => goal.target_frame,
        }
    }
}

impl From<UnitGoal> for ProductionGoal {
    fn from(goal: UnitGoal) -> Self {
        Self::Unit(goal)
    }
}

impl From<UpgradeGoal> for ProductionGoal {
    fn from(goal: UpgradeGoal) -> Self {
        Self::Upgrade(goal)
    }
}

/// Minerals another subsystem wants set aside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineralReservation {
    /// Amount to reserve.
    pub amount: i32,
    /// Frame offset at which the minerals are wanted (0 = now).
    #[serde(default)]
    pub desired_frame: i32,
}
