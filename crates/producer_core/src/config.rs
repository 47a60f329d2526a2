//! Scheduler tunables.
//!
//! Every constant the planner uses lives here so that the headless runner
//! can load alternative values from RON. Rates are fixed-point decimals
//! written as strings (`"0.0465"`), see [`crate::math::decimal_serde`].

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::math::{decimal_serde, Fixed};

/// Configuration for the production scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Game frame after which the window stops shrinking toward `min_window`.
    pub prediction_horizon: i32,
    /// Smallest prediction window in frames.
    pub min_window: i32,
    /// Largest prediction window in frames.
    pub max_window: i32,

    /// Minerals gathered per mineral worker per frame.
    #[serde(with = "decimal_serde")]
    pub minerals_per_worker_frame: Fixed,
    /// Gas gathered per gas worker per frame.
    #[serde(with = "decimal_serde")]
    pub gas_per_worker_frame: Fixed,
    /// Minerals forgone per unit of gas when workers are moved to gas.
    #[serde(with = "decimal_serde")]
    pub minerals_per_gas_unit: Fixed,
    /// Unsaturated gas workers gather at `1 / unsaturated_gas_divisor` of the rate.
    pub unsaturated_gas_divisor: i32,

    /// Workers moved from minerals to gas when a refinery completes.
    pub workers_per_refinery: i32,
    /// A building's travel penalty is this many one-way trips of lost mining.
    pub worker_travel_trips: i32,

    /// Hard cap on total supply (doubled units).
    pub supply_cap: i32,
    /// Furthest the post-pass pulls a supply provider earlier.
    pub supply_provider_pull_limit: i32,
    /// Whether the post-pass pulls refineries earlier.
    pub pull_refineries: bool,

    /// Maximum number of standing army producers.
    pub army_producer_ceiling: usize,
    /// Free supply at or below which we count as maxed out.
    pub maxed_supply_headroom: i32,
    /// Build locations kept free when adding army producers.
    pub reserved_location_slots: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            prediction_horizon: 12_000,
            min_window: 2_000,
            max_window: 4_500,
            minerals_per_worker_frame: Fixed::from_bits(199_715_979), // 0.0465
            gas_per_worker_frame: Fixed::from_bits(304_942_678),      // 0.071
            minerals_per_gas_unit: Fixed::from_bits(2_813_203_579),   // 0.655
            unsaturated_gas_divisor: 4,
            workers_per_refinery: 3,
            worker_travel_trips: 2,
            supply_cap: 400,
            supply_provider_pull_limit: 48,
            pull_refineries: true,
            army_producer_ceiling: 12,
            maxed_supply_headroom: 8,
            reserved_location_slots: 2,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from RON text, filling unspecified fields with defaults.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| PlannerError::DataParseError {
            what: "configuration".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that values are in range.
    pub fn validate(&self) -> Result<()> {
        if self.min_window <= 0 || self.min_window > self.max_window {
            return Err(PlannerError::InvalidConfig(format!(
                "window bounds {}..{} are invalid",
                self.min_window, self.max_window
            )));
        }
        if self.unsaturated_gas_divisor <= 0 {
            return Err(PlannerError::InvalidConfig(
                "unsaturated_gas_divisor must be positive".to_string(),
            ));
        }
        if self.supply_cap <= 0 {
            return Err(PlannerError::InvalidConfig(
                "supply_cap must be positive".to_string(),
            ));
        }
        if self.minerals_per_worker_frame <= Fixed::ZERO || self.gas_per_worker_frame <= Fixed::ZERO
        {
            return Err(PlannerError::InvalidConfig(
                "gathering rates must be positive".to_string(),
            ));
        }
        if self.minerals_per_gas_unit < Fixed::ZERO {
            return Err(PlannerError::InvalidConfig(
                "minerals_per_gas_unit must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Prediction window length for the given game frame.
    #[must_use]
    pub fn window_for_frame(&self, frame: i32) -> i32 {
        (self.prediction_horizon - frame).clamp(self.min_window, self.max_window)
    }

    /// Parse a decimal rate, for building configs in code.
    pub fn rate(text: &str) -> Result<Fixed> {
        text.parse::<Fixed>()
            .map_err(|e| PlannerError::InvalidConfig(e.to_string()))
    }
}
