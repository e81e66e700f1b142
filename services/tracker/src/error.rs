//! services/tracker/src/error.rs
//!
//! Defines the primary error type for the tracker service.

use crate::config::ConfigError;
use presence_core::TrackingError;

/// The primary error type for the `tracker` service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a failed tracking operation.
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
