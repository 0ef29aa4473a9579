//! # Core Error Types
//!
//! Failures raised by the locator and the synchronization bridge. Command
//! handlers translate both into their own taxonomy.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Kinds of entity a reference can resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Inventory folder
    Folder,
    /// Inventory item
    Item,
    /// In-world primitive
    Primitive,
    /// Simulator (region)
    Simulator,
    /// Group membership
    Group,
    /// Avatar
    Agent,
    /// Land parcel
    Parcel,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Folder => "folder",
            Self::Item => "item",
            Self::Primitive => "primitive",
            Self::Simulator => "simulator",
            Self::Group => "group",
            Self::Agent => "agent",
            Self::Parcel => "parcel",
        })
    }
}

/// Reference resolution failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// Nothing matched at any resolution stage.
    #[error("{kind} not found: {reference}")]
    NotFound {
        /// What was being looked for.
        kind: EntityKind,
        /// The reference as given.
        reference: String,
    },
}

impl LocateError {
    /// Builds a not-found error.
    #[must_use]
    pub fn not_found(kind: EntityKind, reference: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            reference: reference.into(),
        }
    }

    /// Entity kind that failed to resolve.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::NotFound { kind, .. } => *kind,
        }
    }
}

/// Bridged call failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No matching reply arrived within the budget.
    #[error("no reply for {key} within {timeout:?}")]
    Timeout {
        /// Correlation key of the call.
        key: String,
        /// Budget that expired.
        timeout: Duration,
    },
}

/// Result type for locator operations.
pub type LocateResult<T> = Result<T, LocateError>;

/// Result type for bridged calls.
pub type BridgeResult<T> = Result<T, BridgeError>;
