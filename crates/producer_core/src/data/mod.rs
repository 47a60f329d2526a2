//! Data structures for the unit and upgrade catalog.
//!
//! The file types ([`CatalogData`], [`UnitData`], [`UpgradeData`]) are
//! designed to be deserialized from RON and refer to each other by name.
//! [`TypeCatalog`] is the resolved form used during planning.
//!
//! **Note:** This module contains no IO beyond the catalog embedded at
//! compile time. Loading catalog files from disk is handled by
//! `producer_headless`.

mod catalog;
mod unit_data;
mod upgrade_data;

pub use catalog::{
    CatalogData, Cost, RaceData, RaceTypes, TypeCatalog, UnitType, UpgradeLevel, UpgradeType,
};
pub use unit_data::{UnitData, UnitFlag};
pub use upgrade_data::{UpgradeData, UpgradeLevelData};
