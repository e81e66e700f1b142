//! crates/presence_core/src/visits.rs
//!
//! The visit record store: per-user, per-region visit counts and cumulative
//! time spent, persisted write-through as a single JSON document.

use crate::domain::{RegionId, UserId, VisitDatabase, VisitRecord};
use crate::error::{TrackingError, TrackingResult};
use crate::persist::{load_document, write_through};
use crate::ports::{DocumentStore, PortError};
use crate::time::{merge, TimeBreakdown};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

//=========================================================================================
// Persisted Record Shape
//=========================================================================================

/// One (user, region) entry as it appears in the visit document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisitRow {
    number_of_visits: u64,
    days_spent: u64,
    hours_spent: u64,
    minutes_spent: u64,
    seconds_spent: f64,
}

impl VisitRow {
    fn from_domain(record: &VisitRecord) -> Self {
        Self {
            number_of_visits: record.number_of_visits,
            days_spent: record.time_spent.days,
            hours_spent: u64::from(record.time_spent.hours),
            minutes_spent: u64::from(record.time_spent.minutes),
            seconds_spent: record.time_spent.seconds,
        }
    }

    /// Renormalizes on the way in, so hand-edited documents with overflowing
    /// units still load as a valid breakdown.
    fn to_domain(self) -> TrackingResult<VisitRecord> {
        let total = self.days_spent as f64 * crate::time::SECONDS_PER_DAY
            + self.hours_spent as f64 * crate::time::SECONDS_PER_HOUR
            + self.minutes_spent as f64 * crate::time::SECONDS_PER_MINUTE
            + self.seconds_spent;
        Ok(VisitRecord {
            number_of_visits: self.number_of_visits,
            time_spent: TimeBreakdown::from_seconds(total).map_err(|_| {
                TrackingError::Persistence(PortError::Unexpected(format!(
                    "invalid time spent in visit record ({} seconds)",
                    total
                )))
            })?,
        })
    }
}

type VisitDocument = BTreeMap<UserId, BTreeMap<RegionId, VisitRow>>;

//=========================================================================================
// The Store
//=========================================================================================

/// Exclusive owner of the `VisitDatabase`.
pub struct VisitRecordStore {
    store: Arc<dyn DocumentStore>,
    key: String,
    database: VisitDatabase,
}

impl VisitRecordStore {
    /// Creates an empty store backed by the document saved under `key`.
    pub fn new(store: Arc<dyn DocumentStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            database: VisitDatabase::new(),
        }
    }

    /// Replaces the in-memory database with the persisted one.
    ///
    /// A missing document is an empty database, not an error.
    pub async fn load(&mut self) -> TrackingResult<&VisitDatabase> {
        let database = match load_document(self.store.as_ref(), &self.key).await? {
            None => {
                info!("No visit records found under '{}', starting empty", self.key);
                VisitDatabase::new()
            }
            Some(document) => decode(document)?,
        };
        info!(
            "Loaded visit records for {} user(s) from '{}'",
            database.len(),
            self.key
        );
        self.database = database;
        Ok(&self.database)
    }

    /// Counts one more visit for (`user_id`, `region_id`) and adds `elapsed`
    /// to its cumulative time, then writes the whole database.
    ///
    /// On a write failure the in-memory record keeps the visit.
    pub async fn record_visit(
        &mut self,
        user_id: &str,
        region_id: &str,
        elapsed: TimeBreakdown,
    ) -> TrackingResult<VisitRecord> {
        let record = self
            .database
            .entry(user_id.to_string())
            .or_default()
            .entry(region_id.to_string())
            .or_default();
        record.number_of_visits += 1;
        record.time_spent = merge(&record.time_spent, &elapsed);
        let updated = *record;

        debug!(
            "Visit {} of '{}' to '{}' now totals {:?}",
            updated.number_of_visits, user_id, region_id, updated.time_spent
        );

        self.save().await?;
        Ok(updated)
    }

    /// The record for one pair; a zero record when there is no history yet.
    pub fn record(&self, user_id: &str, region_id: &str) -> VisitRecord {
        self.database
            .get(user_id)
            .and_then(|regions| regions.get(region_id))
            .copied()
            .unwrap_or_default()
    }

    /// Every region record for one user; empty when there is no history yet.
    pub fn records_for_user(&self, user_id: &str) -> BTreeMap<RegionId, VisitRecord> {
        self.database.get(user_id).cloned().unwrap_or_default()
    }

    pub fn database(&self) -> &VisitDatabase {
        &self.database
    }

    async fn save(&self) -> TrackingResult<()> {
        let document: VisitDocument = self
            .database
            .iter()
            .map(|(user, regions)| {
                let rows = regions
                    .iter()
                    .map(|(region, record)| (region.clone(), VisitRow::from_domain(record)))
                    .collect();
                (user.clone(), rows)
            })
            .collect();
        let value = serde_json::to_value(&document)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        write_through(self.store.as_ref(), &self.key, &value).await
    }
}

fn decode(document: serde_json::Value) -> TrackingResult<VisitDatabase> {
    let rows: VisitDocument = serde_json::from_value(document).map_err(|e| {
        TrackingError::Persistence(PortError::Unexpected(format!(
            "malformed visit document: {}",
            e
        )))
    })?;

    let mut database = VisitDatabase::new();
    for (user, regions) in rows {
        let mut records = BTreeMap::new();
        for (region, row) in regions {
            records.insert(region, row.to_domain()?);
        }
        database.insert(user, records);
    }
    Ok(database)
}
