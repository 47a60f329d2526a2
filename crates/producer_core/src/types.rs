//! Identifiers shared by the catalog, snapshot and schedule.

use serde::{Deserialize, Serialize};

/// Unique identifier for unit types (including buildings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitTypeId(pub u32);

impl UnitTypeId {
    /// Create a new unit type ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for upgrade and tech types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpgradeTypeId(pub u32);

impl UpgradeTypeId {
    /// Create a new upgrade type ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Engine-side identifier of one of our own units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Identifier of a building queued with the builder collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingBuildingId(pub u32);

/// Identifier of a base (resource depot location).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseId(pub u32);

/// Identifier of a build-location region ("neighbourhood").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl RegionId {
    /// The main base region, used when a building has no region constraint.
    pub const MAIN_BASE: Self = Self(0);
}

impl Default for RegionId {
    fn default() -> Self {
        Self::MAIN_BASE
    }
}

/// A map tile coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TilePosition {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
}

impl TilePosition {
    /// Create a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for TilePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// What a production item makes.
///
/// Upgrades carry the level being produced, so producing level 2 of an
/// upgrade is a different kind from producing level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductionType {
    /// A unit or building.
    Unit(UnitTypeId),
    /// An upgrade or tech at the given level (techs only have level 1).
    Upgrade {
        /// The upgrade being researched.
        upgrade: UpgradeTypeId,
        /// Target level.
        level: u8,
    },
}

impl ProductionType {
    /// The unit type, if this is a unit.
    #[must_use]
    pub const fn unit(self) -> Option<UnitTypeId> {
        match self {
            Self::Unit(unit_type) => Some(unit_type),
            Self::Upgrade { .. } => None,
        }
    }

    /// Check if this is the given unit type.
    #[must_use]
    pub fn is(self, unit_type: UnitTypeId) -> bool {
        self.unit() == Some(unit_type)
    }
}

/// Where a goal wants its items produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemLocation {
    /// No constraint.
    #[default]
    Anywhere,
    /// Buildings must be placed in this region.
    Region(RegionId),
    /// Workers must come from this base's depot.
    Base(BaseId),
    /// Buildings must be placed at exactly this tile.
    Tile(TilePosition),
}

impl ItemLocation {
    /// Region to draw build locations from.
    #[must_use]
    pub const fn region(self) -> RegionId {
        match self {
            Self::Region(region) => region,
            _ => RegionId::MAIN_BASE,
        }
    }
}
