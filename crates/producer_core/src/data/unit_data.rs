//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

/// Behavioural flags a unit type can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitFlag {
    /// Placed on the map by a worker.
    Building,
    /// Gathers minerals and gas, constructs buildings.
    Worker,
    /// Produces workers and accepts returned resources.
    ResourceDepot,
    /// Gas extractor built on a geyser.
    Refinery,
    /// Must be placed within range of a power source.
    RequiresPower,
    /// Must be placed at a location with a free exit tile.
    RequiresExit,
    /// Unlocks gas-consuming tech; it is pointless without gas income.
    GasTech,
}

/// Data-driven unit definition.
///
/// Types refer to each other by name; names are resolved into
/// [`UnitTypeId`](crate::types::UnitTypeId)s when the catalog is built.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     name: "Protoss_Dragoon",
///     mineral_price: 125,
///     gas_price: 50,
///     build_time: 750,
///     supply_required: 4,
///     built_by: Some("Protoss_Gateway"),
///     requires: ["Protoss_Cybernetics_Core"],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique engine name of this unit type.
    pub name: String,

    /// Mineral cost.
    #[serde(default)]
    pub mineral_price: i32,

    /// Gas cost.
    #[serde(default)]
    pub gas_price: i32,

    /// Frames from start to completion.
    pub build_time: i32,

    /// Supply provided once completed (doubled units, a pylon is 16).
    #[serde(default)]
    pub supply_provided: i32,

    /// Supply consumed from the start of production (doubled units).
    #[serde(default)]
    pub supply_required: i32,

    /// Type that produces or constructs this one.
    #[serde(default)]
    pub built_by: Option<String>,

    /// Types that must exist (completed) before this one can start.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Footprint width in tiles (buildings only).
    #[serde(default)]
    pub tile_width: u8,

    /// Behavioural flags.
    #[serde(default)]
    pub flags: Vec<UnitFlag>,
}

impl UnitData {
    /// Check if this unit has the specified flag.
    #[must_use]
    pub fn has_flag(&self, flag: UnitFlag) -> bool {
        self.flags.contains(&flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_unit() {
        let unit: UnitData = ron::from_str(
            r#"UnitData(
                name: "Protoss_Pylon",
                mineral_price: 100,
                build_time: 450,
                supply_provided: 16,
                built_by: Some("Protoss_Probe"),
                tile_width: 2,
                flags: [Building],
            )"#,
        )
        .unwrap();

        assert_eq!(unit.name, "Protoss_Pylon");
        assert_eq!(unit.gas_price, 0);
        assert_eq!(unit.supply_provided, 16);
        assert!(unit.has_flag(UnitFlag::Building));
        assert!(!unit.has_flag(UnitFlag::RequiresPower));
        assert!(unit.requires.is_empty());
    }
}
