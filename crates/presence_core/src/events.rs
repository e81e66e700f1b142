//! crates/presence_core/src/events.rs
//!
//! The event vocabulary the hosting environment delivers, and the single
//! dispatch entry point that routes it into the registry.

use crate::domain::{CompletedVisit, RegionId, UserId};
use crate::error::TrackingResult;
use crate::region::EnterOutcome;
use crate::registry::RegionRegistry;
use serde::{Deserialize, Serialize};

/// Something that happened in the hosting world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// An identity entered a region's trigger volume.
    TriggerEnter { region_id: RegionId, occupant: String },

    /// An identity left a region's trigger volume.
    TriggerExit { region_id: RegionId, occupant: String },

    UserJoined { user_id: UserId },

    /// A user disconnected. Any session they still have open is closed.
    UserLeft { user_id: UserId },
}

/// The effect an event had on tracking state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Entered,
    AlreadyPresent,
    /// The event carried an identity that is not a connected user, or an
    /// exit with no open entry.
    Ignored,
    VisitRecorded { visit: CompletedVisit },
    SessionsClosed { visits: Vec<CompletedVisit> },
    Joined,
}

impl RegionRegistry {
    /// Routes one host event to the matching handler and runs it to completion.
    pub async fn dispatch(&mut self, event: HostEvent) -> TrackingResult<EventOutcome> {
        let outcome = match event {
            HostEvent::TriggerEnter {
                region_id,
                occupant,
            } => match self.on_enter(&region_id, &occupant).await? {
                Some(EnterOutcome::Entered) => EventOutcome::Entered,
                Some(EnterOutcome::AlreadyPresent) => EventOutcome::AlreadyPresent,
                None => EventOutcome::Ignored,
            },
            HostEvent::TriggerExit {
                region_id,
                occupant,
            } => match self.on_exit(&region_id, &occupant).await? {
                Some(visit) => EventOutcome::VisitRecorded { visit },
                None => EventOutcome::Ignored,
            },
            HostEvent::UserJoined { user_id } => {
                self.on_user_joined(&user_id);
                EventOutcome::Joined
            }
            HostEvent::UserLeft { user_id } => EventOutcome::SessionsClosed {
                visits: self.on_user_left(&user_id).await?,
            },
        };
        Ok(outcome)
    }
}
