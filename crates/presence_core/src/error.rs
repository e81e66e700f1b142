//! crates/presence_core/src/error.rs
//!
//! The error taxonomy shared by every presence-tracking operation.

use crate::ports::PortError;

/// Errors surfaced by the tracking core.
///
/// Duplicate enter events and exits without a matching enter are not errors;
/// they are absorbed by the region state machine.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// Malformed geometry, an empty id, or a negative time delta.
    /// Rejected before any state is mutated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A region with id '{0}' already exists")]
    DuplicateId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A durable read or write failed. In-memory state stays authoritative.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] PortError),
}

/// A convenience type alias for `Result<T, TrackingError>`.
pub type TrackingResult<T> = Result<T, TrackingError>;
