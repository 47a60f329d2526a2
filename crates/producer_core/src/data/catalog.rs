//! Resolved type catalog.
//!
//! [`CatalogData`] is the file format: types reference each other by
//! name. [`TypeCatalog`] is what the scheduler uses: every reference is
//! resolved to a typed id and every per-item question (price, build time,
//! producer, requirements) is a cheap lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::unit_data::{UnitData, UnitFlag};
use super::upgrade_data::UpgradeData;
use crate::error::{PlannerError, Result};
use crate::types::{ProductionType, UnitTypeId, UpgradeTypeId};

/// The default Protoss catalog, embedded at compile time.
const PROTOSS_CATALOG: &str = include_str!("../../data/protoss.ron");

/// Race-level roles that the scheduler needs to know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceData {
    /// Worker type.
    pub worker: String,
    /// Resource depot type.
    pub resource_depot: String,
    /// Gas extractor type.
    pub refinery: String,
    /// Supply provider (and power source) built to relieve supply blocks.
    pub supply_provider: String,
    /// Building the post-pass adds when floating minerals at max supply.
    pub army_producer: String,
}

/// Complete catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogData {
    /// Race roles.
    pub race: RaceData,
    /// All unit and building types.
    pub units: Vec<UnitData>,
    /// All upgrades and techs.
    #[serde(default)]
    pub upgrades: Vec<UpgradeData>,
}

/// A resolved unit type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitType {
    /// Catalog id.
    pub id: UnitTypeId,
    /// Engine name.
    pub name: String,
    /// Mineral cost.
    pub mineral_price: i32,
    /// Gas cost.
    pub gas_price: i32,
    /// Frames from start to completion.
    pub build_time: i32,
    /// Supply provided once complete.
    pub supply_provided: i32,
    /// Supply consumed from the start.
    pub supply_required: i32,
    /// Producer or constructor type.
    pub builder: Option<UnitTypeId>,
    /// Types that must exist before this one can start.
    pub requires: Vec<UnitTypeId>,
    /// Footprint width in tiles.
    pub tile_width: u8,
    /// Placed by a worker.
    pub is_building: bool,
    /// Gathers resources.
    pub is_worker: bool,
    /// Produces workers.
    pub is_resource_depot: bool,
    /// Gas extractor.
    pub is_refinery: bool,
    /// Needs power at its location.
    pub requires_power: bool,
    /// Needs a location with an exit tile.
    pub requires_exit: bool,
    /// Gas-consuming tech building.
    pub is_gas_tech: bool,
}

/// Price and timing of one upgrade level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeLevel {
    /// Mineral cost.
    pub mineral_price: i32,
    /// Gas cost.
    pub gas_price: i32,
    /// Frames to research.
    pub research_time: i32,
    /// Buildings required before starting.
    pub requires: Vec<UnitTypeId>,
}

/// A resolved upgrade or tech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeType {
    /// Catalog id.
    pub id: UpgradeTypeId,
    /// Engine name.
    pub name: String,
    /// Building type that researches it.
    pub researched_at: UnitTypeId,
    /// Researched with a research command.
    pub is_tech: bool,
    /// Levels, index 0 is level 1.
    pub levels: Vec<UpgradeLevel>,
}

/// Resolved race roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceTypes {
    /// Worker type.
    pub worker: UnitTypeId,
    /// Resource depot type.
    pub resource_depot: UnitTypeId,
    /// Gas extractor type.
    pub refinery: UnitTypeId,
    /// Supply provider type.
    pub supply_provider: UnitTypeId,
    /// Standing army producer type.
    pub army_producer: UnitTypeId,
}

/// Price, duration and supply of one production kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cost {
    /// Mineral price (without any worker travel penalty).
    pub minerals: i32,
    /// Gas price.
    pub gas: i32,
    /// Build or research duration.
    pub build_time: i32,
    /// Supply provided on completion.
    pub supply_provided: i32,
    /// Supply required at start.
    pub supply_required: i32,
}

/// Registry of every unit and upgrade type the scheduler may plan.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    units: Vec<UnitType>,
    upgrades: Vec<UpgradeType>,
    unit_names: BTreeMap<String, UnitTypeId>,
    upgrade_names: BTreeMap<String, UpgradeTypeId>,
    race: RaceTypes,
}

impl TypeCatalog {
    /// Load the embedded Protoss catalog.
    pub fn protoss() -> Result<Self> {
        Self::from_ron_str(PROTOSS_CATALOG)
    }

    /// Load a catalog from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(ron).map_err(|e| PlannerError::DataParseError {
            what: "catalog".to_string(),
            message: e.to_string(),
        })?;
        Self::from_data(&data)
    }

    /// Resolve a catalog from its file representation.
    pub fn from_data(data: &CatalogData) -> Result<Self> {
        let mut unit_names = BTreeMap::new();
        for (index, unit) in data.units.iter().enumerate() {
            if unit_names
                .insert(unit.name.clone(), UnitTypeId(index as u32))
                .is_some()
            {
                return Err(PlannerError::DuplicateType(unit.name.clone()));
            }
        }

        let lookup = |name: &str, referenced_by: &str| -> Result<UnitTypeId> {
            unit_names
                .get(name)
                .copied()
                .ok_or_else(|| PlannerError::UnknownType {
                    name: name.to_string(),
                    referenced_by: referenced_by.to_string(),
                })
        };

        let mut units = Vec::with_capacity(data.units.len());
        for (index, unit) in data.units.iter().enumerate() {
            if unit.build_time <= 0 {
                return Err(PlannerError::InvalidEntry {
                    name: unit.name.clone(),
                    message: "build_time must be positive".to_string(),
                });
            }
            let builder = match &unit.built_by {
                Some(name) => Some(lookup(name, &unit.name)?),
                None => None,
            };
            let requires = unit
                .requires
                .iter()
                .map(|name| lookup(name, &unit.name))
                .collect::<Result<Vec<_>>>()?;

            units.push(UnitType {
                id: UnitTypeId(index as u32),
                name: unit.name.clone(),
                mineral_price: unit.mineral_price,
                gas_price: unit.gas_price,
                build_time: unit.build_time,
                supply_provided: unit.supply_provided,
                supply_required: unit.supply_required,
                builder,
                requires,
                tile_width: unit.tile_width,
                is_building: unit.has_flag(UnitFlag::Building),
                is_worker: unit.has_flag(UnitFlag::Worker),
                is_resource_depot: unit.has_flag(UnitFlag::ResourceDepot),
                is_refinery: unit.has_flag(UnitFlag::Refinery),
                requires_power: unit.has_flag(UnitFlag::RequiresPower),
                requires_exit: unit.has_flag(UnitFlag::RequiresExit),
                is_gas_tech: unit.has_flag(UnitFlag::GasTech),
            });
        }

        let mut upgrade_names = BTreeMap::new();
        let mut upgrades = Vec::with_capacity(data.upgrades.len());
        for (index, upgrade) in data.upgrades.iter().enumerate() {
            let id = UpgradeTypeId(index as u32);
            if upgrade_names.insert(upgrade.name.clone(), id).is_some() {
                return Err(PlannerError::DuplicateType(upgrade.name.clone()));
            }
            if upgrade.levels.is_empty() {
                return Err(PlannerError::InvalidEntry {
                    name: upgrade.name.clone(),
                    message: "an upgrade needs at least one level".to_string(),
                });
            }

            let mut levels = Vec::with_capacity(upgrade.levels.len());
            for level in &upgrade.levels {
                levels.push(UpgradeLevel {
                    mineral_price: level.mineral_price,
                    gas_price: level.gas_price,
                    research_time: level.research_time,
                    requires: level
                        .requires
                        .iter()
                        .map(|name| lookup(name, &upgrade.name))
                        .collect::<Result<Vec<_>>>()?,
                });
            }

            upgrades.push(UpgradeType {
                id,
                name: upgrade.name.clone(),
                researched_at: lookup(&upgrade.researched_at, &upgrade.name)?,
                is_tech: upgrade.tech,
                levels,
            });
        }

        let race = RaceTypes {
            worker: lookup(&data.race.worker, "race")?,
            resource_depot: lookup(&data.race.resource_depot, "race")?,
            refinery: lookup(&data.race.refinery, "race")?,
            supply_provider: lookup(&data.race.supply_provider, "race")?,
            army_producer: lookup(&data.race.army_producer, "race")?,
        };

        Ok(Self {
            units,
            upgrades,
            unit_names,
            upgrade_names,
            race,
        })
    }

    /// Race roles.
    #[must_use]
    pub const fn race(&self) -> &RaceTypes {
        &self.race
    }

    /// Get a unit type.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this catalog.
    #[must_use]
    pub fn unit(&self, id: UnitTypeId) -> &UnitType {
        &self.units[id.0 as usize]
    }

    /// Get a unit type if the id belongs to this catalog.
    #[must_use]
    pub fn get_unit(&self, id: UnitTypeId) -> Option<&UnitType> {
        self.units.get(id.0 as usize)
    }

    /// Get an upgrade type.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this catalog.
    #[must_use]
    pub fn upgrade(&self, id: UpgradeTypeId) -> &UpgradeType {
        &self.upgrades[id.0 as usize]
    }

    /// Get an upgrade type if the id belongs to this catalog.
    #[must_use]
    pub fn get_upgrade(&self, id: UpgradeTypeId) -> Option<&UpgradeType> {
        self.upgrades.get(id.0 as usize)
    }

    /// Look up a unit type by engine name.
    #[must_use]
    pub fn unit_id(&self, name: &str) -> Option<UnitTypeId> {
        self.unit_names.get(name).copied()
    }

    /// Look up an upgrade by engine name.
    #[must_use]
    pub fn upgrade_id(&self, name: &str) -> Option<UpgradeTypeId> {
        self.upgrade_names.get(name).copied()
    }

    /// All unit types in id order.
    pub fn all_units(&self) -> impl Iterator<Item = &UnitType> {
        self.units.iter()
    }

    /// Number of unit types.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Check that an id pair refers into this catalog.
    #[must_use]
    pub fn contains(&self, kind: ProductionType) -> bool {
        match kind {
            ProductionType::Unit(unit_type) => self.get_unit(unit_type).is_some(),
            ProductionType::Upgrade { upgrade, level } => self
                .get_upgrade(upgrade)
                .is_some_and(|u| level >= 1 && usize::from(level) <= u.levels.len()),
        }
    }

    fn upgrade_level(&self, upgrade: UpgradeTypeId, level: u8) -> &UpgradeLevel {
        let levels = &self.upgrade(upgrade).levels;
        let index = usize::from(level.max(1) - 1).min(levels.len() - 1);
        &levels[index]
    }

    /// Price, duration and supply of a production kind.
    #[must_use]
    pub fn cost(&self, kind: ProductionType) -> Cost {
        match kind {
            ProductionType::Unit(unit_type) => {
                let unit = self.unit(unit_type);
                Cost {
                    minerals: unit.mineral_price,
                    gas: unit.gas_price,
                    build_time: unit.build_time,
                    supply_provided: unit.supply_provided,
                    supply_required: unit.supply_required,
                }
            }
            ProductionType::Upgrade { upgrade, level } => {
                let level = self.upgrade_level(upgrade, level);
                Cost {
                    minerals: level.mineral_price,
                    gas: level.gas_price,
                    build_time: level.research_time,
                    supply_provided: 0,
                    supply_required: 0,
                }
            }
        }
    }

    /// Build or research duration of a production kind.
    #[must_use]
    pub fn build_time(&self, kind: ProductionType) -> i32 {
        self.cost(kind).build_time
    }

    /// The unit type that produces a production kind.
    #[must_use]
    pub fn producer_of(&self, kind: ProductionType) -> Option<UnitTypeId> {
        match kind {
            ProductionType::Unit(unit_type) => self.unit(unit_type).builder,
            ProductionType::Upgrade { upgrade, .. } => Some(self.upgrade(upgrade).researched_at),
        }
    }

    /// Buildings that must exist before a production kind can start.
    #[must_use]
    pub fn requirements(&self, kind: ProductionType) -> &[UnitTypeId] {
        match kind {
            ProductionType::Unit(unit_type) => &self.unit(unit_type).requires,
            ProductionType::Upgrade { upgrade, level } => {
                &self.upgrade_level(upgrade, level).requires
            }
        }
    }

    /// Check if a production kind is a building.
    #[must_use]
    pub fn is_building(&self, kind: ProductionType) -> bool {
        kind.unit().is_some_and(|u| self.unit(u).is_building)
    }

    /// Human-readable label for logs and boards.
    #[must_use]
    pub fn label(&self, kind: ProductionType) -> String {
        match kind {
            ProductionType::Unit(unit_type) => self.unit(unit_type).name.clone(),
            ProductionType::Upgrade { upgrade, level } => {
                format!("{}@{}", self.upgrade(upgrade).name, level)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protoss_catalog_loads() {
        let catalog = TypeCatalog::protoss().unwrap();
        let race = catalog.race();
        assert_eq!(catalog.unit(race.worker).name, "Protoss_Probe");
        assert!(catalog.unit(race.refinery).is_refinery);
        assert_eq!(catalog.unit(race.supply_provider).supply_provided, 16);
    }

    #[test]
    fn test_dragoon_requirements_resolve() {
        let catalog = TypeCatalog::protoss().unwrap();
        let dragoon = catalog.unit_id("Protoss_Dragoon").unwrap();
        let gateway = catalog.unit_id("Protoss_Gateway").unwrap();
        let core = catalog.unit_id("Protoss_Cybernetics_Core").unwrap();

        assert_eq!(catalog.producer_of(ProductionType::Unit(dragoon)), Some(gateway));
        assert_eq!(catalog.requirements(ProductionType::Unit(dragoon)), &[core]);
        assert!(catalog.unit(core).is_gas_tech);
    }

    #[test]
    fn test_upgrade_cost_per_level() {
        let catalog = TypeCatalog::protoss().unwrap();
        let weapons = catalog.upgrade_id("Protoss_Ground_Weapons").unwrap();

        let level1 = catalog.cost(ProductionType::Upgrade {
            upgrade: weapons,
            level: 1,
        });
        let level2 = catalog.cost(ProductionType::Upgrade {
            upgrade: weapons,
            level: 2,
        });
        assert!(level2.minerals > level1.minerals);
        assert!(level2.build_time > level1.build_time);
        assert_eq!(level1.supply_required, 0);
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let ron = r#"CatalogData(
            race: RaceData(
                worker: "Probe",
                resource_depot: "Nexus",
                refinery: "Nexus",
                supply_provider: "Nexus",
                army_producer: "Nexus",
            ),
            units: [
                UnitData(name: "Probe", build_time: 300, built_by: Some("Nexus")),
                UnitData(name: "Nexus", build_time: 1800, built_by: Some("Prob")),
            ],
        )"#;

        let err = TypeCatalog::from_ron_str(ron).unwrap_err();
        assert!(matches!(err, PlannerError::UnknownType { ref name, .. } if name == "Prob"));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let ron = r#"CatalogData(
            race: RaceData(
                worker: "Probe",
                resource_depot: "Probe",
                refinery: "Probe",
                supply_provider: "Probe",
                army_producer: "Probe",
            ),
            units: [
                UnitData(name: "Probe", build_time: 300),
                UnitData(name: "Probe", build_time: 300),
            ],
        )"#;

        assert!(matches!(
            TypeCatalog::from_ron_str(ron),
            Err(PlannerError::DuplicateType(_))
        ));
    }
}
