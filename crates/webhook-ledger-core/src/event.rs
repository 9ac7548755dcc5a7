//! # Normalized Events
//!
//! The record persisted for every recognized webhook, and the stored form
//! returned by event logs.

use crate::classifier::ClassifiedEvent;
use crate::{EventAction, RequestId, StoreId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// Provider-agnostic description of one recognized repository event
///
/// Created once at ingestion time and never mutated afterwards. The
/// `from_branch` field is present exactly when the action is not
/// [`EventAction::Push`]; deserialization rejects records that break this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct NormalizedEvent {
    request_id: RequestId,
    timestamp: Timestamp,
    author: String,
    action: EventAction,
    from_branch: Option<String>,
    to_branch: String,
}

impl NormalizedEvent {
    /// Stamp a classified event with a fresh request ID and the current time
    pub fn from_classified(classified: ClassifiedEvent) -> Self {
        Self::with_identity(RequestId::new(), Timestamp::now(), classified)
    }

    /// Build an event with an explicit identity
    ///
    /// Used when replaying or importing records whose request ID and
    /// generation time are already known.
    pub fn with_identity(
        request_id: RequestId,
        timestamp: Timestamp,
        classified: ClassifiedEvent,
    ) -> Self {
        let (author, action, from_branch, to_branch) = classified.into_parts();
        Self {
            request_id,
            timestamp,
            author,
            action,
            from_branch,
            to_branch,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn action(&self) -> EventAction {
        self.action
    }

    pub fn from_branch(&self) -> Option<&str> {
        self.from_branch.as_deref()
    }

    pub fn to_branch(&self) -> &str {
        &self.to_branch
    }
}

/// Wire shape of a [`NormalizedEvent`] before invariant checks
#[derive(Deserialize)]
struct EventRecord {
    request_id: RequestId,
    timestamp: Timestamp,
    author: String,
    action: EventAction,
    #[serde(default)]
    from_branch: Option<String>,
    to_branch: String,
}

impl TryFrom<EventRecord> for NormalizedEvent {
    type Error = ValidationError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        match (record.action, &record.from_branch) {
            (EventAction::Push, Some(_)) => Err(ValidationError::InvalidFormat {
                field: "from_branch".to_string(),
                message: "must be absent for PUSH events".to_string(),
            }),
            (EventAction::PullRequest | EventAction::Merge, None) => {
                Err(ValidationError::Required {
                    field: "from_branch".to_string(),
                })
            }
            _ => Ok(Self {
                request_id: record.request_id,
                timestamp: record.timestamp,
                author: record.author,
                action: record.action,
                from_branch: record.from_branch,
                to_branch: record.to_branch,
            }),
        }
    }
}

/// A [`NormalizedEvent`] together with the identifier its event log assigned
///
/// Serialized flat, with the store identifier under `_id` as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    #[serde(rename = "_id")]
    pub id: StoreId,

    #[serde(flatten)]
    pub event: NormalizedEvent,
}

impl StoredEvent {
    /// Wrap an event with a freshly assigned store identifier
    pub fn assign(event: NormalizedEvent) -> Self {
        Self {
            id: StoreId::new(),
            event,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
