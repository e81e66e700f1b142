//! services/tracker/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{SessionRoster, VolumeTable};
use presence_core::RegionRegistry;
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    /// The one registry. Holding the lock for a whole handler keeps every
    /// event processed to completion before the next one starts.
    pub tracker: Mutex<RegionRegistry>,
    pub roster: Arc<SessionRoster>,
    pub volumes: Arc<VolumeTable>,
}

impl AppState {
    pub fn new(
        tracker: RegionRegistry,
        roster: Arc<SessionRoster>,
        volumes: Arc<VolumeTable>,
    ) -> Self {
        Self {
            tracker: Mutex::new(tracker),
            roster,
            volumes,
        }
    }
}
