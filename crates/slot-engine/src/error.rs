//! Error types for slot-engine operations.
//!
//! A missing working day is never an error: it resolves to an empty list of
//! available hours. Errors are reserved for contract violations and for
//! failures reported by the collaborators behind [`crate::store`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlotError {
    /// The query or one of its intervals is malformed (zero duration, end <= start, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A time-of-day string could not be parsed as `HH:MM`.
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    /// The stored working plan is not valid JSON for a [`crate::plan::WorkingPlan`].
    #[error("Invalid working plan: {0}")]
    InvalidPlan(#[from] serde_json::Error),

    /// The referenced appointment does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator (settings store, appointment store) failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The requested slot is no longer free.
    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, SlotError>;
