//! The committed schedule as handed back to callers.
//!
//! Internally a tick works on arena handles; [`Schedule`] is the owned,
//! serializable view of the committed set once planning is done. It is
//! what the headless runner prints and what the determinism tests compare.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::commands::IssuedCommand;
use crate::error::{BlockReason, PlannerError, Result};
use crate::types::{ItemLocation, PendingBuildingId, ProductionType, TilePosition, UnitId};

/// Who produces a scheduled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProducerRef {
    /// An existing unit.
    Existing(UnitId),
    /// A building planned this tick, by its schedule sequence number.
    Planned(u32),
}

/// One committed item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledItem {
    /// Sequence number within the tick.
    pub sequence: u32,
    /// What is produced.
    pub kind: ProductionType,
    /// Catalog name.
    pub label: String,
    /// Start frame offset.
    pub start: i32,
    /// Completion frame offset.
    pub completion: i32,
    /// Minerals including travel penalty.
    pub mineral_price: i32,
    /// Gas.
    pub gas_price: i32,
    /// Supply added on completion.
    pub supply_provided: i32,
    /// Supply used from the start.
    pub supply_required: i32,
    /// Location constraint.
    pub location: ItemLocation,
    /// Chosen tile for buildings.
    pub tile: Option<TilePosition>,
    /// Producer.
    pub producer: Option<ProducerRef>,
    /// Inserted to satisfy another item.
    pub is_prerequisite: bool,
    /// Mirrors a building already with the builder.
    pub in_progress: Option<PendingBuildingId>,
}

/// What happened to one goal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalOutcome {
    /// Index in the goal list.
    pub goal: usize,
    /// Catalog name of the goal's kind.
    pub label: String,
    /// Items committed (or reused) for the goal.
    pub committed: u32,
    /// Why the goal stopped short, if it did.
    pub blocked: Option<BlockReason>,
    /// The goal was not attempted.
    pub skipped: bool,
}

/// The committed schedule of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schedule {
    /// Game frame the schedule was planned on.
    pub frame: i32,
    /// Prediction window length.
    pub window: i32,
    /// Committed items in start order.
    pub items: Vec<ScheduledItem>,
    /// Per-goal results, in priority order.
    pub goals: Vec<GoalOutcome>,
    /// Workers the plan moves from minerals to gas.
    pub gas_worker_delta: i32,
}

impl Schedule {
    /// Items of a given kind.
    pub fn items_of(&self, kind: ProductionType) -> impl Iterator<Item = &ScheduledItem> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    /// Items that do not mirror work already with the builder.
    pub fn planned(&self) -> impl Iterator<Item = &ScheduledItem> {
        self.items.iter().filter(|i| i.in_progress.is_none())
    }

    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            PlannerError::Serialization(format!("Failed to serialize schedule: {}", e))
        })
    }

    /// Decode from bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a schedule.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            PlannerError::Serialization(format!("Failed to deserialize schedule: {}", e))
        })
    }

    /// Hash of the committed items.
    ///
    /// Two ticks planned from the same inputs produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.frame.hash(&mut hasher);
        self.window.hash(&mut hasher);
        self.items.hash(&mut hasher);
        self.gas_worker_delta.hash(&mut hasher);
        hasher.finish()
    }

    /// Render a plain-text board.
    #[must_use]
    pub fn board(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "frame {} window {} gas workers {:+}",
            self.frame, self.window, self.gas_worker_delta
        );
        for item in &self.items {
            let tile = item.tile.map_or_else(|| "-".to_string(), |t| t.to_string());
            let mut flags = String::new();
            if item.is_prerequisite {
                flags.push('P');
            }
            if item.in_progress.is_some() {
                flags.push('Q');
            }
            let _ = writeln!(
                out,
                "{:>5} {:>5}  {:<28} {:>4}m {:>4}g  {:<8} {}",
                item.start,
                item.completion,
                item.label,
                item.mineral_price,
                item.gas_price,
                tile,
                flags
            );
        }
        for goal in &self.goals {
            let status = match (goal.skipped, goal.blocked) {
                (true, _) => "skipped".to_string(),
                (false, Some(reason)) => format!("blocked: {}", reason),
                (false, None) => "ok".to_string(),
            };
            let _ = writeln!(
                out,
                "goal {:>2} {:<28} x{} {}",
                goal.goal, goal.label, goal.committed, status
            );
        }
        out
    }
}

/// Result of a tick driven through the collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// The committed schedule.
    pub schedule: Schedule,
    /// Commands issued this tick.
    pub commands: Vec<IssuedCommand>,
}
