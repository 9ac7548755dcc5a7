//! Common test utilities for webhook-ledger integration tests
//!
//! This module provides:
//! - A failing event log for outage scenarios
//! - A signing helper matching GitHub's `X-Hub-Signature-256`
//! - Payload fixtures for push and pull_request deliveries

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;
use webhook_ledger_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use webhook_ledger_core::{
    signature::sign, EventLog, EventLogError, NormalizedEvent, StoredEvent, WebhookSecret,
};

pub const TEST_SECRET: &str = "integration-test-secret";

// ============================================================================
// Failing Event Log
// ============================================================================

/// Event log that refuses every call and counts attempts
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct FailingEventLog {
    insert_attempts: Arc<AtomicUsize>,
}

impl FailingEventLog {
    #[allow(dead_code)]
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventLog for FailingEventLog {
    async fn insert_one(&self, _event: &NormalizedEvent) -> Result<(), EventLogError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        Err(EventLogError::Unavailable {
            message: "server selection timed out".to_string(),
        })
    }

    async fn find_recent(&self, _limit: usize) -> Result<Vec<StoredEvent>, EventLogError> {
        Err(EventLogError::Unavailable {
            message: "server selection timed out".to_string(),
        })
    }
}

// ============================================================================
// App Construction
// ============================================================================

#[allow(dead_code)]
pub fn create_test_app_state(event_log: Arc<dyn EventLog>, secret: Option<&str>) -> AppState {
    let mut config = ServiceConfig::default();
    config.webhook.secret = secret.map(WebhookSecret::new);
    AppState::new(
        config,
        event_log,
        ServiceMetrics::new().expect("metrics registry"),
    )
}

#[allow(dead_code)]
pub fn create_test_router(event_log: Arc<dyn EventLog>, secret: Option<&str>) -> Router {
    create_router(create_test_app_state(event_log, secret))
}

// ============================================================================
// Requests
// ============================================================================

/// `sha256=<hex>` signature for `body` under [`TEST_SECRET`]
#[allow(dead_code)]
pub fn sign_body(body: &str) -> String {
    sign(&WebhookSecret::new(TEST_SECRET), body.as_bytes()).expect("HMAC accepts any key")
}

#[allow(dead_code)]
pub fn webhook_request(event_type: &str, body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("Content-Type", "application/json")
        .header("X-GitHub-Event", event_type)
        .header("X-GitHub-Delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958");

    if let Some(signature) = signature {
        builder = builder.header("X-Hub-Signature-256", signature);
    }

    builder.body(Body::from(body.to_string())).expect("valid request")
}

/// Send a correctly signed delivery
#[allow(dead_code)]
pub async fn post_signed(router: Router, event_type: &str, payload: &Value) -> Response {
    let body = payload.to_string();
    let signature = sign_body(&body);
    router
        .oneshot(webhook_request(event_type, &body, Some(&signature)))
        .await
        .expect("router is infallible")
}

#[allow(dead_code)]
pub async fn get_events(router: Router) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri("/events")
        .body(Body::empty())
        .expect("valid request");
    let response = router.oneshot(request).await.expect("router is infallible");
    read_json(response).await
}

#[allow(dead_code)]
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}

// ============================================================================
// Payload Fixtures
// ============================================================================

#[allow(dead_code)]
pub fn push_payload(pusher: &str, git_ref: &str) -> Value {
    json!({
        "ref": git_ref,
        "before": "6113728f27ae82c7b1a177c8d03f9e96e0adf246",
        "after": "0000000000000000000000000000000000000000",
        "repository": { "full_name": "octo-org/hello-world" },
        "pusher": { "name": pusher, "email": "octocat@github.com" },
        "sender": { "login": pusher }
    })
}

#[allow(dead_code)]
pub fn pull_request_payload(action: &str, author: &str, head: &str, base: &str) -> Value {
    json!({
        "action": action,
        "number": 42,
        "pull_request": {
            "number": 42,
            "state": if action == "closed" { "closed" } else { "open" },
            "merged": false,
            "user": { "login": author },
            "head": { "ref": head, "sha": "e5bd3914e2e596debea16f433f57875b5b90bcd6" },
            "base": { "ref": base, "sha": "9049f1265b7d61be4a8904a9a27120d2064dab3b" }
        },
        "repository": { "full_name": "octo-org/hello-world" }
    })
}

#[allow(dead_code)]
pub fn merged_payload(author: &str, head: &str, base: &str) -> Value {
    let mut payload = pull_request_payload("closed", author, head, base);
    payload["pull_request"]["merged"] = json!(true);
    payload
}
