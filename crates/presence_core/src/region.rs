//! crates/presence_core/src/region.rs
//!
//! A single presence region (location box) and the occupancy state machine
//! of the users inside it.
//!
//! Each occupant is either absent (no entry) or present since an entry
//! timestamp. The region never touches storage; exits hand back a
//! `CompletedVisit` for the registry to record.

use crate::domain::{
    CompletedVisit, Occupant, RegionDescriptor, RegionGeometry, RegionId, Transform, UserId,
};
use crate::error::TrackingResult;
use crate::time::{seconds_between, TimeBreakdown};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What an enter event did to the region's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnterOutcome {
    Entered,
    /// The occupant was already present; the original entry time is kept.
    AlreadyPresent,
}

pub struct PresenceRegion {
    descriptor: RegionDescriptor,
    occupants: BTreeMap<UserId, DateTime<Utc>>,
}

impl PresenceRegion {
    /// A fresh region with nobody inside.
    pub fn new(descriptor: RegionDescriptor) -> Self {
        Self {
            descriptor,
            occupants: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &RegionId {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &RegionDescriptor {
        &self.descriptor
    }

    pub fn is_present(&self, user_id: &str) -> bool {
        self.occupants.contains_key(user_id)
    }

    pub fn occupants(&self) -> Vec<Occupant> {
        self.occupants
            .iter()
            .map(|(user_id, entered_at)| Occupant {
                user_id: user_id.clone(),
                entered_at: *entered_at,
            })
            .collect()
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    /// Marks `user_id` present from `now`, unless already present.
    pub fn enter(&mut self, user_id: &str, now: DateTime<Utc>) -> EnterOutcome {
        if self.occupants.contains_key(user_id) {
            debug!("'{}' entered '{}' again, keeping first entry", user_id, self.id());
            return EnterOutcome::AlreadyPresent;
        }
        self.occupants.insert(user_id.to_string(), now);
        EnterOutcome::Entered
    }

    /// Closes the occupant's interval at `now`.
    ///
    /// Returns `None` when the occupant has no open entry.
    pub fn exit(&mut self, user_id: &str, now: DateTime<Utc>) -> Option<CompletedVisit> {
        let entered_at = self.occupants.remove(user_id)?;
        Some(self.complete(user_id.to_string(), entered_at, now))
    }

    /// Closes every open interval at `now`, leaving the region empty.
    pub fn exit_all(&mut self, now: DateTime<Utc>) -> Vec<CompletedVisit> {
        let occupants = std::mem::take(&mut self.occupants);
        occupants
            .into_iter()
            .map(|(user_id, entered_at)| self.complete(user_id, entered_at, now))
            .collect()
    }

    /// Replaces the detection volume's dimensions. Occupancy is untouched.
    pub fn resize(&mut self, geometry: RegionGeometry) -> TrackingResult<()> {
        geometry.validate()?;
        self.descriptor.geometry = geometry;
        Ok(())
    }

    pub fn move_to(&mut self, transform: Transform) {
        self.descriptor.transform = transform;
    }

    fn complete(
        &self,
        user_id: UserId,
        entered_at: DateTime<Utc>,
        exited_at: DateTime<Utc>,
    ) -> CompletedVisit {
        // A clock stepping backwards must not produce a negative stay.
        let seconds = seconds_between(entered_at, exited_at).unwrap_or_else(|| {
            warn!(
                "Exit of '{}' from '{}' precedes its entry, recording zero time",
                user_id,
                self.id()
            );
            0.0
        });
        let elapsed = TimeBreakdown::from_seconds(seconds).unwrap_or(TimeBreakdown::ZERO);
        CompletedVisit {
            user_id,
            region_id: self.descriptor.id.clone(),
            entered_at,
            exited_at,
            elapsed,
        }
    }
}
