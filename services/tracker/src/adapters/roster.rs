//! services/tracker/src/adapters/roster.rs
//!
//! The set of users currently connected to the hosting session.

use presence_core::{UserDirectory, UserId};
use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Connected-user roster fed by join and leave events.
#[derive(Debug, Default)]
pub struct SessionRoster {
    users: RwLock<BTreeSet<UserId>>,
}

impl SessionRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, user_id: &str) {
        self.write().insert(user_id.to_string());
    }

    pub fn leave(&self, user_id: &str) {
        self.write().remove(user_id);
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeSet<UserId>> {
        self.users.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeSet<UserId>> {
        self.users.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl UserDirectory for SessionRoster {
    fn is_active_user(&self, identity: &str) -> bool {
        self.read().contains(identity)
    }

    fn connected_users(&self) -> Vec<UserId> {
        self.read().iter().cloned().collect()
    }
}
