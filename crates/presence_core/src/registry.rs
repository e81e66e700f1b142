//! crates/presence_core/src/registry.rs
//!
//! The region registry (location handler). It owns every active region,
//! routes trigger and session events to them, and forwards completed visits
//! to the visit record store.

use crate::domain::{
    CompletedVisit, Occupant, RegionDescriptor, RegionGeometry, RegionId, Transform, VisitRecord,
};
use crate::error::{TrackingError, TrackingResult};
use crate::ports::{Clock, UserDirectory, VolumeHost};
use crate::region::{EnterOutcome, PresenceRegion};
use crate::region_store::RegionDescriptorStore;
use crate::visits::VisitRecordStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The single authority over region lifecycle and occupancy.
///
/// Every method runs to completion before the next is called; the hosting
/// service serializes access.
pub struct RegionRegistry {
    regions: BTreeMap<RegionId, PresenceRegion>,
    descriptors: RegionDescriptorStore,
    visits: VisitRecordStore,
    clock: Arc<dyn Clock>,
    users: Arc<dyn UserDirectory>,
    volumes: Arc<dyn VolumeHost>,
}

impl RegionRegistry {
    pub fn new(
        descriptors: RegionDescriptorStore,
        visits: VisitRecordStore,
        clock: Arc<dyn Clock>,
        users: Arc<dyn UserDirectory>,
        volumes: Arc<dyn VolumeHost>,
    ) -> Self {
        Self {
            regions: BTreeMap::new(),
            descriptors,
            visits,
            clock,
            users,
            volumes,
        }
    }

    /// Loads the visit records, then rebuilds the saved regions.
    pub async fn startup(&mut self) -> TrackingResult<()> {
        self.visits.load().await?;
        let restored = self.load_persisted_regions().await?;
        info!("Presence tracking started with {} region(s)", restored);
        Ok(())
    }

    /// Rebuilds one region per saved descriptor. Occupancy never survives a
    /// restart, so every restored region starts empty.
    pub async fn load_persisted_regions(&mut self) -> TrackingResult<usize> {
        let descriptors = self.descriptors.load().await?;
        for descriptor in descriptors {
            if self.regions.contains_key(&descriptor.id) {
                debug!("Region '{}' already active, skipping reload", descriptor.id);
                continue;
            }
            self.spawn_volume(&descriptor).await;
            self.regions
                .insert(descriptor.id.clone(), PresenceRegion::new(descriptor));
        }
        Ok(self.regions.len())
    }

    //=====================================================================================
    // Region Lifecycle
    //=====================================================================================

    /// Creates and persists a new region, using the default geometry and
    /// transform for whatever is omitted.
    pub async fn create_region(
        &mut self,
        id: &str,
        geometry: Option<RegionGeometry>,
        transform: Option<Transform>,
    ) -> TrackingResult<RegionDescriptor> {
        let id = id.trim();
        if id.is_empty() {
            return Err(TrackingError::InvalidInput(
                "region id must not be empty".to_string(),
            ));
        }
        if self.regions.contains_key(id) {
            return Err(TrackingError::DuplicateId(id.to_string()));
        }
        let geometry = geometry.unwrap_or_default();
        geometry.validate()?;

        let descriptor = RegionDescriptor {
            id: id.to_string(),
            geometry,
            transform: transform.unwrap_or_default(),
        };
        self.spawn_volume(&descriptor).await;
        self.regions
            .insert(descriptor.id.clone(), PresenceRegion::new(descriptor.clone()));
        info!("Region '{}' created", id);

        self.descriptors.save(descriptor.clone()).await?;
        Ok(descriptor)
    }

    /// Closes every open session in the region, then tears it down and
    /// forgets its descriptor.
    ///
    /// The region is gone even when persisting fails; the first failure is
    /// returned after the teardown completes.
    pub async fn delete_region(&mut self, id: &str) -> TrackingResult<Vec<CompletedVisit>> {
        let id = id.trim();
        let mut region = self
            .regions
            .remove(id)
            .ok_or_else(|| TrackingError::NotFound(format!("region '{}'", id)))?;

        let closed = region.exit_all(self.clock.now());
        let recorded = self.record_all(&closed).await;

        if let Err(e) = self.volumes.destroy_volume(region.id()).await {
            warn!("Failed to destroy volume for region '{}': {}", id, e);
        }
        let removed = self.descriptors.remove(id).await;
        info!(
            "Region '{}' deleted, {} open session(s) closed",
            id,
            closed.len()
        );

        recorded?;
        removed?;
        Ok(closed)
    }

    /// Rebuilds the detection volume with new dimensions. Occupants stay
    /// present with their original entry times.
    pub async fn resize_region(
        &mut self,
        id: &str,
        geometry: RegionGeometry,
    ) -> TrackingResult<RegionDescriptor> {
        let id = id.trim();
        let region = self.region_mut(id)?;
        region.resize(geometry)?;
        let descriptor = region.descriptor().clone();

        if let Err(e) = self.volumes.rebuild_volume(&descriptor).await {
            warn!("Failed to rebuild volume for region '{}': {}", id, e);
        }
        info!("Region '{}' resized to {:?}", id, geometry);

        self.descriptors.save(descriptor.clone()).await?;
        Ok(descriptor)
    }

    /// Records where a region was dropped after being moved.
    pub async fn move_region(
        &mut self,
        id: &str,
        transform: Transform,
    ) -> TrackingResult<RegionDescriptor> {
        let id = id.trim();
        let region = self.region_mut(id)?;
        region.move_to(transform);
        let descriptor = region.descriptor().clone();

        if let Err(e) = self.volumes.rebuild_volume(&descriptor).await {
            warn!("Failed to move volume for region '{}': {}", id, e);
        }
        debug!("Region '{}' moved to {:?}", id, transform.position);

        self.descriptors.set_transform(id, transform).await?;
        Ok(descriptor)
    }

    //=====================================================================================
    // Presence Events
    //=====================================================================================

    /// Handles a trigger-enter. Identities that are not connected users are
    /// ignored and yield `None`.
    pub async fn on_enter(
        &mut self,
        region_id: &str,
        identity: &str,
    ) -> TrackingResult<Option<EnterOutcome>> {
        let is_user = self.users.is_active_user(identity);
        let now = self.clock.now();
        let region = self.region_mut(region_id)?;

        if !is_user {
            debug!("Ignoring non-user collider '{}' in '{}'", identity, region_id);
            return Ok(None);
        }

        let outcome = region.enter(identity, now);
        if outcome == EnterOutcome::Entered {
            info!("'{}' has entered '{}'", identity, region_id);
        }
        Ok(Some(outcome))
    }

    /// Handles a trigger-exit. An exit with no open entry records nothing.
    pub async fn on_exit(
        &mut self,
        region_id: &str,
        identity: &str,
    ) -> TrackingResult<Option<CompletedVisit>> {
        let now = self.clock.now();
        let region = self.region_mut(region_id)?;

        let Some(visit) = region.exit(identity, now) else {
            debug!("Exit of '{}' from '{}' had no open entry", identity, region_id);
            return Ok(None);
        };
        info!("'{}' has left '{}'", identity, region_id);

        self.record_all(std::slice::from_ref(&visit)).await?;
        Ok(Some(visit))
    }

    /// Per-user setup on join. Never creates occupancy.
    pub fn on_user_joined(&mut self, user_id: &str) {
        info!("'{}' has joined the session", user_id);
    }

    /// Closes every open session of a departing user.
    pub async fn on_user_left(&mut self, user_id: &str) -> TrackingResult<Vec<CompletedVisit>> {
        let now = self.clock.now();
        let closed: Vec<CompletedVisit> = self
            .regions
            .values_mut()
            .filter_map(|region| region.exit(user_id, now))
            .collect();

        info!(
            "'{}' has left the session, {} open session(s) closed",
            user_id,
            closed.len()
        );
        self.record_all(&closed).await?;
        Ok(closed)
    }

    /// Closes every open session in every region, for process shutdown.
    pub async fn close_all_sessions(&mut self) -> TrackingResult<Vec<CompletedVisit>> {
        let now = self.clock.now();
        let closed: Vec<CompletedVisit> = self
            .regions
            .values_mut()
            .flat_map(|region| region.exit_all(now))
            .collect();

        if !closed.is_empty() {
            info!("Closed {} open session(s) at shutdown", closed.len());
        }
        self.record_all(&closed).await?;
        Ok(closed)
    }

    //=====================================================================================
    // Queries
    //=====================================================================================

    pub fn regions(&self) -> Vec<RegionDescriptor> {
        self.regions
            .values()
            .map(|region| region.descriptor().clone())
            .collect()
    }

    pub fn region(&self, id: &str) -> Option<&PresenceRegion> {
        self.regions.get(id.trim())
    }

    pub fn occupants(&self, id: &str) -> TrackingResult<Vec<Occupant>> {
        self.regions
            .get(id.trim())
            .map(PresenceRegion::occupants)
            .ok_or_else(|| TrackingError::NotFound(format!("region '{}'", id)))
    }

    pub fn visit_record(&self, user_id: &str, region_id: &str) -> VisitRecord {
        self.visits.record(user_id, region_id.trim())
    }

    pub fn visits_for_user(&self, user_id: &str) -> BTreeMap<RegionId, VisitRecord> {
        self.visits.records_for_user(user_id)
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    // Region ids are stored trimmed, so every lookup trims too.

    fn region_mut(&mut self, id: &str) -> TrackingResult<&mut PresenceRegion> {
        self.regions
            .get_mut(id.trim())
            .ok_or_else(|| TrackingError::NotFound(format!("region '{}'", id)))
    }

    async fn spawn_volume(&self, descriptor: &RegionDescriptor) {
        if let Err(e) = self.volumes.create_volume(descriptor).await {
            warn!("Failed to create volume for region '{}': {}", descriptor.id, e);
        }
    }

    /// Records each visit, continuing past failures so every visit reaches
    /// the in-memory database. Returns the first failure.
    async fn record_all(&mut self, closed: &[CompletedVisit]) -> TrackingResult<()> {
        let mut first_error = None;
        for visit in closed {
            if let Err(e) = self
                .visits
                .record_visit(&visit.user_id, &visit.region_id, visit.elapsed)
                .await
            {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
