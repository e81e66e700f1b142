//! crates/presence_core/src/domain.rs
//!
//! Defines the core data structures for presence tracking.
//! The region types serialize to the same shape as the persisted region document.

use crate::error::{TrackingError, TrackingResult};
use crate::time::TimeBreakdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies a connected user (the identity carried by trigger events).
pub type UserId = String;

/// The user-chosen, unique name of a region.
pub type RegionId = String;

const DEFAULT_EDGE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// Position and rotation of a region in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Quaternion,
}

impl Default for Transform {
    /// Just off the origin, resting on the floor.
    fn default() -> Self {
        Self {
            position: Vector3 {
                x: 2.0,
                y: 0.05,
                z: 0.0,
            },
            rotation: Quaternion::default(),
        }
    }
}

/// Box dimensions of a region's detection volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionGeometry {
    pub height: f64,
    pub width: f64,
    pub depth: f64,
}

impl Default for RegionGeometry {
    fn default() -> Self {
        Self {
            height: DEFAULT_EDGE,
            width: DEFAULT_EDGE,
            depth: DEFAULT_EDGE,
        }
    }
}

impl RegionGeometry {
    /// Rejects any dimension that is not a finite, strictly positive number.
    pub fn validate(&self) -> TrackingResult<()> {
        for (name, value) in [
            ("height", self.height),
            ("width", self.width),
            ("depth", self.depth),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackingError::InvalidInput(format!(
                    "{} must be a positive number (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// The persisted definition of a region.
///
/// Serializes flat as `{ id, height, width, depth, transform }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub id: RegionId,
    #[serde(flatten)]
    pub geometry: RegionGeometry,
    pub transform: Transform,
}

/// Cumulative visit count and time spent for one (user, region) pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VisitRecord {
    pub number_of_visits: u64,
    pub time_spent: TimeBreakdown,
}

/// All visit records, keyed by user and then by region.
pub type VisitDatabase = BTreeMap<UserId, BTreeMap<RegionId, VisitRecord>>;

/// A finished stay of one occupant inside one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedVisit {
    pub user_id: UserId,
    pub region_id: RegionId,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub elapsed: TimeBreakdown,
}

/// An occupant currently inside a region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupant {
    pub user_id: UserId,
    pub entered_at: DateTime<Utc>,
}
