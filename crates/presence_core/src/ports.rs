//! crates/presence_core/src/ports.rs
//!
//! Defines the collaborator contracts (traits) the tracking core depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the file system, the clock, and the hosting world.

use crate::domain::{RegionDescriptor, RegionId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external collaborators (e.g. file I/O).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Collaborator Ports (Traits)
//=========================================================================================

/// Durable key/value storage of JSON-shaped documents.
///
/// Implementations must make `write` atomic: a reader never observes a
/// truncated document, and a crash mid-write leaves the previous one intact.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, key: &str) -> PortResult<bool>;

    /// Returns `PortError::NotFound` when no document is stored under `key`.
    async fn read(&self, key: &str) -> PortResult<Value>;

    async fn write(&self, key: &str, document: &Value) -> PortResult<()>;
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The identity/session layer: who is currently connected.
pub trait UserDirectory: Send + Sync {
    /// Whether `identity` belongs to a connected user, as opposed to an
    /// arbitrary collider passing through a trigger volume.
    fn is_active_user(&self, identity: &str) -> bool;

    fn connected_users(&self) -> Vec<UserId>;
}

/// The spatial layer that owns the detectable trigger volumes.
#[async_trait]
pub trait VolumeHost: Send + Sync {
    /// Creates a trigger volume matching the descriptor's geometry and transform.
    async fn create_volume(&self, descriptor: &RegionDescriptor) -> PortResult<()>;

    /// Rebuilds an existing volume in place after a resize or move.
    async fn rebuild_volume(&self, descriptor: &RegionDescriptor) -> PortResult<()>;

    async fn destroy_volume(&self, region_id: &RegionId) -> PortResult<()>;
}
