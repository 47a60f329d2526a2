//! Error types for the production scheduler.
//!
//! Two kinds of failure exist. [`PlannerError`] covers setup problems
//! (bad catalog data, bad configuration) and is returned through
//! [`Result`]. [`BlockReason`] is the outcome of a single scheduling
//! attempt that could not be placed inside the prediction window; it is
//! an ordinary value, the attempt is simply dropped for the tick.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`PlannerError`].
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Top-level error type for scheduler setup.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Failed to parse catalog or configuration data.
    #[error("Failed to parse {what}: {message}")]
    DataParseError {
        /// What was being parsed (e.g. "catalog").
        what: String,
        /// Error message.
        message: String,
    },

    /// A catalog entry references a type that does not exist.
    #[error("Unknown type '{name}' referenced by '{referenced_by}'")]
    UnknownType {
        /// The name that failed to resolve.
        name: String,
        /// The entry holding the reference.
        referenced_by: String,
    },

    /// Two catalog entries share a name.
    #[error("Duplicate type name: {0}")]
    DuplicateType(String),

    /// A catalog entry is internally inconsistent.
    #[error("Invalid catalog entry '{name}': {message}")]
    InvalidEntry {
        /// Entry name.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A schedule could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Why a production attempt could not be scheduled within the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockReason {
    /// Minerals never become sufficient.
    Minerals,
    /// Gas never becomes sufficient.
    Gas,
    /// A supply block could not be resolved in time.
    Supply,
    /// Supply is blocked while already at the hard cap.
    SupplyCap,
    /// No producer is free within the window.
    Producer,
    /// No build location could be found.
    Location,
    /// The attempt would drive a resource below zero.
    Overspent,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minerals => write!(f, "minerals unavailable within window"),
            Self::Gas => write!(f, "gas unavailable within window"),
            Self::Supply => write!(f, "supply block unresolved within window"),
            Self::SupplyCap => write!(f, "supply blocked at hard cap"),
            Self::Producer => write!(f, "no producer available within window"),
            Self::Location => write!(f, "no build location available"),
            Self::Overspent => write!(f, "resources would go negative"),
        }
    }
}

impl std::error::Error for BlockReason {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_error_display() {
        let err = PlannerError::UnknownType {
            name: "Protoss_Gatway".into(),
            referenced_by: "Protoss_Zealot".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown type 'Protoss_Gatway' referenced by 'Protoss_Zealot'"
        );
    }

    #[test]
    fn test_block_reason_display() {
        assert_eq!(BlockReason::SupplyCap.to_string(), "supply blocked at hard cap");
    }
}
