//! Shared write-through helpers for the document-backed stores.

use crate::error::TrackingResult;
use crate::ports::{DocumentStore, PortError};
use serde_json::Value;
use tracing::{error, warn};

/// Reads the document stored under `key`, treating a missing one as `None`.
pub(crate) async fn load_document(
    store: &dyn DocumentStore,
    key: &str,
) -> TrackingResult<Option<Value>> {
    if !store.exists(key).await? {
        return Ok(None);
    }
    match store.read(key).await {
        Ok(document) => Ok(Some(document)),
        // Removed between the existence check and the read.
        Err(PortError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes `document` under `key`, retrying once immediately before giving up.
pub(crate) async fn write_through(
    store: &dyn DocumentStore,
    key: &str,
    document: &Value,
) -> TrackingResult<()> {
    if let Err(first) = store.write(key, document).await {
        warn!("Write of '{}' failed, retrying once: {}", key, first);
        if let Err(second) = store.write(key, document).await {
            error!("Write of '{}' failed after retry: {}", key, second);
            return Err(second.into());
        }
    }
    Ok(())
}
