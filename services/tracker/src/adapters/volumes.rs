//! services/tracker/src/adapters/volumes.rs
//!
//! The table of trigger volumes the hosting world should have spawned.
//! The host reads it back through `GET /volumes` and mirrors it as colliders.

use async_trait::async_trait;
use presence_core::{PortError, PortResult, RegionDescriptor, RegionId, VolumeHost};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct VolumeTable {
    volumes: RwLock<BTreeMap<RegionId, RegionDescriptor>>,
}

impl VolumeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<RegionDescriptor> {
        self.volumes
            .read()
            .map(|volumes| volumes.values().cloned().collect())
            .unwrap_or_default()
    }

    fn upsert(&self, descriptor: &RegionDescriptor) -> PortResult<()> {
        let mut volumes = self
            .volumes
            .write()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        volumes.insert(descriptor.id.clone(), descriptor.clone());
        Ok(())
    }
}

#[async_trait]
impl VolumeHost for VolumeTable {
    async fn create_volume(&self, descriptor: &RegionDescriptor) -> PortResult<()> {
        debug!("Spawning trigger volume '{}'", descriptor.id);
        self.upsert(descriptor)
    }

    async fn rebuild_volume(&self, descriptor: &RegionDescriptor) -> PortResult<()> {
        debug!("Rebuilding trigger volume '{}'", descriptor.id);
        self.upsert(descriptor)
    }

    async fn destroy_volume(&self, region_id: &RegionId) -> PortResult<()> {
        debug!("Destroying trigger volume '{}'", region_id);
        self.volumes
            .write()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .remove(region_id);
        Ok(())
    }
}
