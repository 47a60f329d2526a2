//! Upgrade and tech data structures.

use serde::{Deserialize, Serialize};

/// Price and requirements of one level of an upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeLevelData {
    /// Mineral cost of this level.
    pub mineral_price: i32,

    /// Gas cost of this level.
    pub gas_price: i32,

    /// Frames to research this level.
    pub research_time: i32,

    /// Buildings that must exist before this level can start.
    #[serde(default)]
    pub requires: Vec<String>,
}

/// Data-driven upgrade or tech definition.
///
/// Techs are single-level and are issued with a research command,
/// upgrades with an upgrade command.
///
/// # Example RON
///
/// ```ron
/// UpgradeData(
///     name: "Singularity_Charge",
///     researched_at: "Protoss_Cybernetics_Core",
///     levels: [
///         UpgradeLevelData(mineral_price: 150, gas_price: 150, research_time: 2500),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeData {
    /// Unique engine name.
    pub name: String,

    /// Building type that researches it.
    pub researched_at: String,

    /// Whether this is a tech (research command) rather than an upgrade.
    #[serde(default)]
    pub tech: bool,

    /// One entry per level, starting at level 1.
    pub levels: Vec<UpgradeLevelData>,
}

impl UpgradeData {
    /// Highest level this upgrade can reach.
    #[must_use]
    pub fn max_level(&self) -> u8 {
        self.levels.len() as u8
    }
}
