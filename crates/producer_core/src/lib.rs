//! # Producer Core
//!
//! Deterministic production scheduler for an RTS bot.
//!
//! Every tick the bot hands the scheduler a snapshot of its economy and an
//! ordered list of production goals. The scheduler plans a timeline of
//! production items (what to build, when and where) that respects mineral,
//! gas and supply forecasts, then issues whatever is due right now.
//!
//! This crate contains **only** deterministic logic:
//! - No IO
//! - No system randomness
//! - No floating-point math (rates use fixed-point)
//!
//! The same snapshot and goals always produce the same schedule, so plans
//! can be replayed, diffed and checked from tests.
//!
//! ## Crate Structure
//!
//! - [`data`] - Unit and upgrade catalog loaded from RON
//! - [`snapshot`] - Per-tick view of the world
//! - [`goals`] - What the strategy layer asks for
//! - [`timeline`] - Resource and supply forecasts
//! - [`schedule`] - Planning output
//! - [`collaborators`] - Interfaces to the game, builder and economy
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod collaborators;
pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod goals;
pub mod item;
pub mod math;
pub mod schedule;
pub mod snapshot;
pub mod timeline;
pub mod types;

mod blocks;
mod forecast;
mod locations;
mod post_pass;
mod prerequisites;
mod producers;
mod scheduler;

pub use scheduler::ProductionPlanner;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::collaborators::{
        BuilderService, Collaborators, EconomyService, PlacementService, UnitApi,
    };
    pub use crate::commands::IssuedCommand;
    pub use crate::config::PlannerConfig;
    pub use crate::data::TypeCatalog;
    pub use crate::error::{BlockReason, PlannerError, Result};
    pub use crate::goals::{MineralReservation, ProductionGoal, UnitGoal, UpgradeGoal};
    pub use crate::math::Fixed;
    pub use crate::schedule::{GoalOutcome, ProducerRef, Schedule, ScheduledItem, TickReport};
    pub use crate::snapshot::{
        BuildLocation, CommandKind, LastCommand, OwnUnit, PendingBuilding, PoweredLocation,
        TickSnapshot, WorkerCounts,
    };
    pub use crate::types::{
        BaseId, ItemLocation, PendingBuildingId, ProductionType, RegionId, TilePosition, UnitId,
        UnitTypeId, UpgradeTypeId,
    };
    pub use crate::ProductionPlanner;
}
