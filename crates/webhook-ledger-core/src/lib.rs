//! # Webhook Ledger Core
//!
//! Core business logic for the webhook-ledger ingestion service.
//!
//! This crate authenticates source-control webhooks with a shared-secret
//! signature, classifies their payloads into normalized repository events
//! (push, pull request opened, merge) and persists them into an append-only
//! event log that can be queried by recency.
//!
//! ## Architecture
//!
//! - [`signature`] verifies `X-Hub-Signature-256` headers against the raw body
//! - [`classifier`] maps an event-type tag and JSON payload to a [`Classification`]
//! - [`event_log`] defines the [`EventLog`] collaborator contract
//! - [`adapters`] provides in-memory and filesystem event logs
//!
//! HTTP transport lives in `webhook-ledger-api`; nothing in this crate knows
//! about status codes.
//!
//! ## Usage
//!
//! ```rust
//! use webhook_ledger_core::classifier::{classify, Classification};
//! use webhook_ledger_core::{EventAction, NormalizedEvent};
//!
//! let payload = serde_json::json!({
//!     "ref": "refs/heads/main",
//!     "pusher": { "name": "octocat" }
//! });
//!
//! if let Classification::Normalized(classified) = classify("push", &payload) {
//!     let event = NormalizedEvent::from_classified(classified);
//!     assert_eq!(event.action(), EventAction::Push);
//!     assert_eq!(event.to_branch(), "main");
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use ulid::Ulid;
pub use uuid::Uuid;

// ============================================================================
// Identifier Types
// ============================================================================

/// Identifier generated for every ingested webhook request
///
/// Primary dedup and trace key of a stored event. Always a fresh v4 UUID,
/// never taken from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = s.parse::<Uuid>().map_err(|_| ParseError::InvalidFormat {
            expected: "UUID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(uuid))
    }
}

/// Identifier assigned by an event log when a record is stored
///
/// Uses ULID so identifiers sort in insertion order. Rendered as a string
/// on output and never required on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(Ulid);

impl StoreId {
    /// Generate a new store identifier
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoreId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = s.parse::<Ulid>().map_err(|_| ParseError::InvalidFormat {
            expected: "ULID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(ulid))
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp, serialized as an RFC 3339 string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Event Action
// ============================================================================

/// Normalized kind of repository activity
///
/// This is a closed set. Anything the classifier does not map onto one of
/// these variants is ignored and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    Push,
    PullRequest,
    Merge,
}

impl EventAction {
    /// Get the persisted string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "PUSH",
            Self::PullRequest => "PULL_REQUEST",
            Self::Merge => "MERGE",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUSH" => Ok(Self::Push),
            "PULL_REQUEST" => Ok(Self::PullRequest),
            "MERGE" => Ok(Self::Merge),
            _ => Err(ParseError::InvalidFormat {
                expected: "PUSH, PULL_REQUEST or MERGE".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Normalized event records
pub mod event;

/// Webhook signature verification
pub mod signature;

/// Event classification and field extraction
pub mod classifier;

/// Event log collaborator contract
pub mod event_log;

/// Event log implementations
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{FilesystemEventLog, InMemoryEventLog};
pub use classifier::{classify, ClassifiedEvent, Classification};
pub use event::{NormalizedEvent, StoredEvent};
pub use event_log::{EventLog, EventLogError, EventLogLocation, RECENT_EVENTS_LIMIT};
pub use signature::{verify, SignatureError, Verification, WebhookSecret};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
