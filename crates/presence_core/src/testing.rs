//! crates/presence_core/src/testing.rs
//!
//! In-memory implementations of the collaborator ports, for tests and for
//! embedding the core without any durable storage.

use crate::domain::{RegionDescriptor, RegionId, UserId};
use crate::ports::{Clock, DocumentStore, PortError, PortResult, UserDirectory, VolumeHost};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//=========================================================================================
// MemoryStore
//=========================================================================================

/// A `DocumentStore` kept in a hash map. Counts writes and can be told to fail.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Value>>,
    writes: AtomicUsize,
    failing_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document without counting it as a write.
    pub fn with_document(self, key: &str, document: Value) -> Self {
        lock(&self.documents).insert(key.to_string(), document);
        self
    }

    pub fn document(&self, key: &str) -> Option<Value> {
        lock(&self.documents).get(key).cloned()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the next `count` writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn exists(&self, key: &str) -> PortResult<bool> {
        Ok(lock(&self.documents).contains_key(key))
    }

    async fn read(&self, key: &str) -> PortResult<Value> {
        lock(&self.documents)
            .get(key)
            .cloned()
            .ok_or_else(|| PortError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, document: &Value) -> PortResult<()> {
        let pending = self.failing_writes.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_writes.store(pending - 1, Ordering::SeqCst);
            return Err(PortError::Unexpected(format!("injected failure writing {}", key)));
        }
        lock(&self.documents).insert(key.to_string(), document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//=========================================================================================
// ManualClock
//=========================================================================================

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Advances the clock by a number of seconds, with millisecond resolution.
    pub fn advance(&self, seconds: f64) {
        let mut now = lock(&self.now);
        *now += Duration::milliseconds((seconds * 1000.0).round() as i64);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *lock(&self.now) = instant;
    }
}

impl Default for ManualClock {
    /// Starts at 2024-01-01T00:00:00Z.
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::new(start)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

//=========================================================================================
// StaticDirectory
//=========================================================================================

/// A user directory whose roster is edited directly.
#[derive(Default)]
pub struct StaticDirectory {
    users: RwLock<BTreeSet<UserId>>,
}

impl StaticDirectory {
    pub fn with_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UserId>,
    {
        Self {
            users: RwLock::new(users.into_iter().map(Into::into).collect()),
        }
    }

    pub fn connect(&self, user_id: &str) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user_id.to_string());
        }
    }

    pub fn disconnect(&self, user_id: &str) {
        if let Ok(mut users) = self.users.write() {
            users.remove(user_id);
        }
    }
}

impl UserDirectory for StaticDirectory {
    fn is_active_user(&self, identity: &str) -> bool {
        self.users
            .read()
            .map(|users| users.contains(identity))
            .unwrap_or(false)
    }

    fn connected_users(&self) -> Vec<UserId> {
        self.users
            .read()
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }
}

//=========================================================================================
// RecordingVolumes
//=========================================================================================

/// A volume host that remembers which volumes are live and how often each was rebuilt.
#[derive(Default)]
pub struct RecordingVolumes {
    live: Mutex<BTreeMap<RegionId, RegionDescriptor>>,
    rebuilds: Mutex<BTreeMap<RegionId, usize>>,
}

impl RecordingVolumes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self, region_id: &str) -> Option<RegionDescriptor> {
        lock(&self.live).get(region_id).cloned()
    }

    pub fn live_count(&self) -> usize {
        lock(&self.live).len()
    }

    pub fn rebuild_count(&self, region_id: &str) -> usize {
        lock(&self.rebuilds).get(region_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl VolumeHost for RecordingVolumes {
    async fn create_volume(&self, descriptor: &RegionDescriptor) -> PortResult<()> {
        lock(&self.live).insert(descriptor.id.clone(), descriptor.clone());
        Ok(())
    }

    async fn rebuild_volume(&self, descriptor: &RegionDescriptor) -> PortResult<()> {
        let mut live = lock(&self.live);
        if !live.contains_key(&descriptor.id) {
            return Err(PortError::NotFound(descriptor.id.clone()));
        }
        live.insert(descriptor.id.clone(), descriptor.clone());
        *lock(&self.rebuilds).entry(descriptor.id.clone()).or_insert(0) += 1;
        Ok(())
    }

    async fn destroy_volume(&self, region_id: &RegionId) -> PortResult<()> {
        lock(&self.live).remove(region_id);
        Ok(())
    }
}
