//! # Event Classification
//!
//! Decides whether a webhook maps onto a recognized repository action and,
//! if so, extracts the normalized fields from its payload.
//!
//! | event type     | condition                          | action         |
//! |----------------|------------------------------------|----------------|
//! | `push`         | -                                  | `PUSH`         |
//! | `pull_request` | `action == "opened"`               | `PULL_REQUEST` |
//! | `pull_request` | `action == "closed"` and merged    | `MERGE`        |
//! | `pull_request` | any other action                   | ignored        |
//! | anything else  | -                                  | ignored        |
//!
//! Unrecognized tags fall through to [`Classification::Ignored`] so that new
//! provider event types never break ingestion. Extraction is all-or-nothing:
//! a missing required field yields [`Classification::Invalid`] and no partial
//! record is produced.

use crate::EventAction;
use serde_json::Value;
use tracing::debug;

/// Provider event-type tag for branch pushes
pub const PUSH_EVENT: &str = "push";

/// Provider event-type tag for pull request activity
pub const PULL_REQUEST_EVENT: &str = "pull_request";

// ============================================================================
// Outcome Types
// ============================================================================

/// Result of classifying one webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The webhook maps to a recognized action
    Normalized(ClassifiedEvent),

    /// Recognized but uninteresting input; not an error
    Ignored { reason: String },

    /// A field required for the recognized action is absent
    Invalid { field: String },
}

/// Normalized fields of a recognized event, before a request ID and
/// timestamp are assigned
///
/// Only the constructors below can build one, so `from_branch` is present
/// exactly when the action is not a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    author: String,
    action: EventAction,
    from_branch: Option<String>,
    to_branch: String,
}

impl ClassifiedEvent {
    /// A push of `author` to `to_branch`
    pub fn push(author: impl Into<String>, to_branch: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            action: EventAction::Push,
            from_branch: None,
            to_branch: to_branch.into(),
        }
    }

    /// A pull request opened by `author` from `from_branch` into `to_branch`
    pub fn pull_request_opened(
        author: impl Into<String>,
        from_branch: impl Into<String>,
        to_branch: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            action: EventAction::PullRequest,
            from_branch: Some(from_branch.into()),
            to_branch: to_branch.into(),
        }
    }

    /// A merged pull request from `from_branch` into `to_branch`
    pub fn merge(
        author: impl Into<String>,
        from_branch: impl Into<String>,
        to_branch: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            action: EventAction::Merge,
            from_branch: Some(from_branch.into()),
            to_branch: to_branch.into(),
        }
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

    pub(crate) fn into_parts(self) -> (String, EventAction, Option<String>, String) {
        (self.author, self.action, self.from_branch, self.to_branch)
    }
}

/// A required payload field was absent or not of the expected type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing key in payload: {field}")]
pub struct MissingField {
    /// Dotted path of the field, e.g. `pull_request.user.login`
    pub field: String,
}

impl MissingField {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
        }
    }
}

impl From<MissingField> for Classification {
    fn from(missing: MissingField) -> Self {
        Self::Invalid {
            field: missing.field,
        }
    }
}

// ============================================================================
// Typed Payloads
// ============================================================================

/// Fields of a `push` payload that the ledger records
#[derive(Debug, Clone, PartialEq, Eq)]
struct PushPayload {
    pusher_name: String,
    git_ref: String,
}

impl PushPayload {
    fn extract(payload: &Value) -> Result<Self, MissingField> {
        Ok(Self {
            pusher_name: required_str(payload, "pusher.name")?.to_string(),
            git_ref: required_str(payload, "ref")?.to_string(),
        })
    }

    fn into_classified(self) -> ClassifiedEvent {
        let to_branch = branch_from_ref(&self.git_ref).to_string();
        ClassifiedEvent::push(self.pusher_name, to_branch)
    }
}

/// Fields of a `pull_request` payload that the ledger records
#[derive(Debug, Clone, PartialEq, Eq)]
struct PullRequestPayload {
    author: String,
    head_ref: String,
    base_ref: String,
}

impl PullRequestPayload {
    fn extract(payload: &Value) -> Result<Self, MissingField> {
        Ok(Self {
            author: required_str(payload, "pull_request.user.login")?.to_string(),
            head_ref: required_str(payload, "pull_request.head.ref")?.to_string(),
            base_ref: required_str(payload, "pull_request.base.ref")?.to_string(),
        })
    }
}

/// Pull request sub-actions the ledger distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullRequestAction {
    Opened,
    Closed,
}

impl PullRequestAction {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "opened" => Some(Self::Opened),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Classify a webhook by its event-type tag and parsed JSON payload
pub fn classify(event_type: &str, payload: &Value) -> Classification {
    let classification = match event_type {
        PUSH_EVENT => match PushPayload::extract(payload) {
            Ok(push) => Classification::Normalized(push.into_classified()),
            Err(missing) => missing.into(),
        },
        PULL_REQUEST_EVENT => classify_pull_request(payload),
        other => Classification::Ignored {
            reason: format!("Ignoring event type: {}", other),
        },
    };

    debug!(event_type = %event_type, outcome = ?classification, "Classified webhook");
    classification
}

fn classify_pull_request(payload: &Value) -> Classification {
    let action = match required_str(payload, "action") {
        Ok(action) => action,
        Err(missing) => return missing.into(),
    };

    let Some(recognized) = PullRequestAction::parse(action) else {
        return ignored_pull_request_action(action);
    };

    if recognized == PullRequestAction::Closed {
        match merged_flag(payload) {
            Ok(true) => {}
            Ok(false) => return ignored_pull_request_action(action),
            Err(missing) => return missing.into(),
        }
    }

    let pr = match PullRequestPayload::extract(payload) {
        Ok(pr) => pr,
        Err(missing) => return missing.into(),
    };

    let classified = match recognized {
        PullRequestAction::Opened => {
            ClassifiedEvent::pull_request_opened(pr.author, pr.head_ref, pr.base_ref)
        }
        PullRequestAction::Closed => ClassifiedEvent::merge(pr.author, pr.head_ref, pr.base_ref),
    };

    Classification::Normalized(classified)
}

fn ignored_pull_request_action(action: &str) -> Classification {
    Classification::Ignored {
        reason: format!("Ignoring pull_request action: {}", action),
    }
}

/// `pull_request.merged` must be present; `null` counts as not merged
fn merged_flag(payload: &Value) -> Result<bool, MissingField> {
    const FIELD: &str = "pull_request.merged";

    match lookup(payload, FIELD) {
        Some(Value::Bool(merged)) => Ok(*merged),
        Some(Value::Null) => Ok(false),
        _ => Err(MissingField::new(FIELD)),
    }
}

// ============================================================================
// Field Extraction
// ============================================================================

/// Final `/`-separated segment of a git ref (`refs/heads/main` -> `main`)
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}

fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |node, key| node.get(key))
}

fn required_str<'a>(payload: &'a Value, path: &str) -> Result<&'a str, MissingField> {
    lookup(payload, path)
        .and_then(Value::as_str)
        .ok_or_else(|| MissingField::new(path))
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
