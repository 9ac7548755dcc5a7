//! # Event Log
//!
//! Contract for the append-only store of normalized events.
//!
//! The log is constructed once at process start and shared by handle with
//! every request handler. Implementations must make each insert atomic and
//! must be safe to call concurrently; no cross-request ordering is promised.

use crate::adapters::{FilesystemEventLog, InMemoryEventLog};
use crate::{NormalizedEvent, RequestId, StoredEvent};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Number of records returned by the recent-events query
pub const RECENT_EVENTS_LIMIT: usize = 20;

// ============================================================================
// Contract
// ============================================================================

/// Append-only persistence for normalized events
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one event
    ///
    /// Either the whole record is stored or nothing is. Records are never
    /// updated or deleted afterwards.
    async fn insert_one(&self, event: &NormalizedEvent) -> Result<(), EventLogError>;

    /// Fetch at most `limit` events, newest `timestamp` first
    async fn find_recent(&self, limit: usize) -> Result<Vec<StoredEvent>, EventLogError>;
}

/// Errors raised by event log implementations
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("Event with request_id {request_id} already exists")]
    DuplicateRequestId { request_id: RequestId },

    #[error("Event log unavailable: {message}")]
    Unavailable { message: String },

    #[error("Event log I/O failed: {message}")]
    Io { message: String },

    #[error("Event record serialization failed: {message}")]
    Serialization { message: String },

    #[error("Unsupported event log URI '{uri}': {message}")]
    UnsupportedLocation { uri: String, message: String },
}

// ============================================================================
// Location
// ============================================================================

/// Where an event log lives, parsed from its connection URI
///
/// | URI              | log                                           |
/// |------------------|-----------------------------------------------|
/// | `memory://`      | [`InMemoryEventLog`], lost on restart         |
/// | `file://<path>`  | [`FilesystemEventLog`] rooted at `<path>`     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLogLocation {
    Memory,
    Filesystem { root: PathBuf },
}

impl EventLogLocation {
    /// Parse a connection URI
    ///
    /// # Errors
    ///
    /// Returns [`EventLogError::UnsupportedLocation`] for URIs without a
    /// scheme, with an unknown scheme, or with an empty filesystem path.
    pub fn parse(uri: &str) -> Result<Self, EventLogError> {
        let unsupported = |message: &str| EventLogError::UnsupportedLocation {
            uri: uri.to_string(),
            message: message.to_string(),
        };

        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| unsupported("expected <scheme>://<location>"))?;

        match scheme.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" if rest.is_empty() => Err(unsupported("file URI needs a path")),
            "file" => Ok(Self::Filesystem {
                root: PathBuf::from(rest),
            }),
            other => Err(unsupported(&format!(
                "scheme '{}' is not supported; use memory:// or file://",
                other
            ))),
        }
    }

    /// Open the event log for `database`/`collection` at this location
    ///
    /// # Errors
    ///
    /// Propagates failures creating or reading the backing storage.
    pub async fn connect(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Arc<dyn EventLog>, EventLogError> {
        match self {
            Self::Memory => {
                info!(database, collection, "Using in-memory event log");
                Ok(Arc::new(InMemoryEventLog::new()))
            }
            Self::Filesystem { root } => {
                let log = FilesystemEventLog::open(root.clone(), database, collection).await?;
                info!(
                    path = %log.path().display(),
                    "Using filesystem event log"
                );
                Ok(Arc::new(log))
            }
        }
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
