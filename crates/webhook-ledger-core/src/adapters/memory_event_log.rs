//! # In-Memory Event Log
//!
//! Thread-safe in-memory implementation for testing and development.

use crate::event_log::{EventLog, EventLogError};
use crate::{NormalizedEvent, StoredEvent};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};

/// In-memory event log
///
/// Uses RwLock for concurrent access with minimal contention. Clones share
/// the same underlying records. Contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    records: Arc<RwLock<Vec<StoredEvent>>>,
}

impl InMemoryEventLog {
    /// Create new empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    /// Check if no records are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored record in insertion order
    pub fn snapshot(&self) -> Vec<StoredEvent> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> EventLogError {
    EventLogError::Unavailable {
        message: "in-memory event log lock poisoned".to_string(),
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    #[instrument(skip(self, event), fields(request_id = %event.request_id()))]
    async fn insert_one(&self, event: &NormalizedEvent) -> Result<(), EventLogError> {
        let mut records = self.records.write().map_err(poisoned)?;

        if records
            .iter()
            .any(|stored| stored.event.request_id() == event.request_id())
        {
            return Err(EventLogError::DuplicateRequestId {
                request_id: *event.request_id(),
            });
        }

        let stored = StoredEvent::assign(event.clone());
        debug!(store_id = %stored.id, "Event appended to in-memory log");
        records.push(stored);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_recent(&self, limit: usize) -> Result<Vec<StoredEvent>, EventLogError> {
        let records = self.records.read().map_err(poisoned)?;

        let mut recent = records.clone();
        drop(records);

        sort_newest_first(&mut recent);
        recent.truncate(limit);
        Ok(recent)
    }
}

/// Order records by `timestamp` descending, newest insert first on ties
pub(crate) fn sort_newest_first(records: &mut [StoredEvent]) {
    records.sort_by(|a, b| {
        b.event
            .timestamp()
            .cmp(a.event.timestamp())
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
#[path = "memory_event_log_tests.rs"]
mod tests;
