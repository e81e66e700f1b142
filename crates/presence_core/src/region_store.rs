//! crates/presence_core/src/region_store.rs
//!
//! Persistence of region definitions, keyed by region id.

use crate::domain::{RegionDescriptor, RegionId, Transform};
use crate::error::{TrackingError, TrackingResult};
use crate::persist::{load_document, write_through};
use crate::ports::{DocumentStore, PortError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Exclusive owner of the persisted region descriptors.
pub struct RegionDescriptorStore {
    store: Arc<dyn DocumentStore>,
    key: String,
    descriptors: BTreeMap<RegionId, RegionDescriptor>,
}

impl RegionDescriptorStore {
    pub fn new(store: Arc<dyn DocumentStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            descriptors: BTreeMap::new(),
        }
    }

    /// Loads the saved descriptors, returning them in id order.
    /// A missing document yields no descriptors.
    ///
    /// Entries are keyed by their own `id`, whatever key they were saved
    /// under. Entries with an empty id, a duplicate id, or a non-positive
    /// dimension are dropped with a warning and vanish on the next write.
    pub async fn load(&mut self) -> TrackingResult<Vec<RegionDescriptor>> {
        let saved: BTreeMap<String, RegionDescriptor> =
            match load_document(self.store.as_ref(), &self.key).await? {
                None => BTreeMap::new(),
                Some(document) => serde_json::from_value(document).map_err(|e| {
                    TrackingError::Persistence(PortError::Unexpected(format!(
                        "malformed region document: {}",
                        e
                    )))
                })?,
            };

        let mut descriptors = BTreeMap::new();
        for (saved_key, mut descriptor) in saved {
            descriptor.id = descriptor.id.trim().to_string();
            if descriptor.id.is_empty() {
                warn!("Dropping saved region '{}' with an empty id", saved_key);
                continue;
            }
            if let Err(e) = descriptor.geometry.validate() {
                warn!("Dropping saved region '{}': {}", descriptor.id, e);
                continue;
            }
            if descriptor.id != saved_key {
                warn!(
                    "Saved region '{}' was stored under '{}', re-keying",
                    descriptor.id, saved_key
                );
            }
            if descriptors.contains_key(&descriptor.id) {
                warn!("Dropping duplicate saved region '{}'", descriptor.id);
                continue;
            }
            descriptors.insert(descriptor.id.clone(), descriptor);
        }

        self.descriptors = descriptors;
        info!(
            "Loaded {} region definition(s) from '{}'",
            self.descriptors.len(),
            self.key
        );
        Ok(self.descriptors.values().cloned().collect())
    }

    /// Inserts or replaces a descriptor and writes the document.
    pub async fn save(&mut self, descriptor: RegionDescriptor) -> TrackingResult<()> {
        self.descriptors.insert(descriptor.id.clone(), descriptor);
        self.flush().await
    }

    pub async fn set_transform(&mut self, id: &str, transform: Transform) -> TrackingResult<()> {
        let descriptor = self
            .descriptors
            .get_mut(id)
            .ok_or_else(|| TrackingError::NotFound(format!("region '{}'", id)))?;
        descriptor.transform = transform;
        self.flush().await
    }

    /// Removes a descriptor if present. The document is written either way.
    pub async fn remove(&mut self, id: &str) -> TrackingResult<()> {
        self.descriptors.remove(id);
        self.flush().await
    }

    pub fn get(&self, id: &str) -> Option<&RegionDescriptor> {
        self.descriptors.get(id)
    }

    async fn flush(&self) -> TrackingResult<()> {
        let value = serde_json::to_value(&self.descriptors)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        write_through(self.store.as_ref(), &self.key, &value).await
    }
}
