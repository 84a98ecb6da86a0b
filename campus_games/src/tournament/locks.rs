//! Per-event critical sections.

use super::models::EventId;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// One async mutex per event, created on first use
#[derive(Clone, Default)]
pub struct EventLocks {
    locks: Arc<RwLock<HashMap<EventId, Arc<Mutex<()>>>>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to an event
    ///
    /// The event stays locked until the returned guard is dropped.
    pub async fn acquire(&self, event_id: EventId) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(&event_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(event_id)
                .or_default()
                .clone(),
        };
        lock.lock_owned().await
    }

    /// Number of events that have been locked at least once
    pub async fn tracked_events(&self) -> usize {
        self.locks.read().await.len()
    }
}
