//! Integration tests for `GET /events`

mod common;

use axum::http::StatusCode;
use common::{
    create_test_router, get_events, merged_payload, post_signed, push_payload, FailingEventLog,
    TEST_SECRET,
};
use std::sync::Arc;
use webhook_ledger_core::{
    ClassifiedEvent, EventLog, EventLogLocation, InMemoryEventLog, NormalizedEvent, RequestId,
    Timestamp, RECENT_EVENTS_LIMIT,
};

fn push_at(author: &str, rfc3339: &str) -> NormalizedEvent {
    NormalizedEvent::with_identity(
        RequestId::new(),
        Timestamp::from_rfc3339(rfc3339).unwrap(),
        ClassifiedEvent::push(author, "main"),
    )
}

#[tokio::test]
async fn test_ingested_events_are_listed_newest_first() {
    let log = InMemoryEventLog::new();
    let router = create_test_router(Arc::new(log.clone()), Some(TEST_SECRET));

    post_signed(
        router.clone(),
        "push",
        &push_payload("first", "refs/heads/main"),
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    post_signed(
        router.clone(),
        "pull_request",
        &merged_payload("second", "feature-x", "main"),
    )
    .await;

    let (status, body) = get_events(router).await;
    let rows = body.as_array().unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["author"], "second");
    assert_eq!(rows[0]["action"], "MERGE");
    assert_eq!(rows[0]["from_branch"], "feature-x");
    assert_eq!(rows[1]["author"], "first");
    assert_eq!(rows[1]["action"], "PUSH");
}

#[tokio::test]
async fn test_listing_is_capped_at_twenty() {
    let log = InMemoryEventLog::new();
    for i in 0..(RECENT_EVENTS_LIMIT + 7) {
        let minute = i / 60;
        let second = i % 60;
        log.insert_one(&push_at(
            &format!("dev-{}", i),
            &format!("2024-06-01T12:{:02}:{:02}Z", minute, second),
        ))
        .await
        .unwrap();
    }
    let router = create_test_router(Arc::new(log), None);

    let (status, body) = get_events(router).await;
    let rows = body.as_array().unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.len(), RECENT_EVENTS_LIMIT);
    assert_eq!(rows[0]["author"], "dev-26");
    assert_eq!(rows[RECENT_EVENTS_LIMIT - 1]["author"], "dev-7");

    let timestamps: Vec<&str> = rows
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn test_rows_carry_store_and_request_identifiers() {
    let log = InMemoryEventLog::new();
    log.insert_one(&push_at("octocat", "2024-06-01T12:00:00Z"))
        .await
        .unwrap();
    let router = create_test_router(Arc::new(log), None);

    let (_, body) = get_events(router).await;
    let row = &body[0];

    assert!(row["_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(row["request_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(row["to_branch"], "main");
    assert!(row["from_branch"].is_null());
}

#[tokio::test]
async fn test_store_outage_returns_server_error() {
    let router = create_test_router(Arc::new(FailingEventLog::default()), None);

    let (status, body) = get_events(router).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Error fetching events: "));
}

#[tokio::test]
async fn test_filesystem_log_survives_router_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let uri = format!("file://{}", dir.path().display());
    let location = EventLogLocation::parse(&uri).unwrap();

    {
        let log = location
            .connect("github_webhook_db", "github_events")
            .await
            .unwrap();
        let router = create_test_router(log, Some(TEST_SECRET));
        let response =
            post_signed(router, "push", &push_payload("octocat", "refs/heads/main")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let log = location
        .connect("github_webhook_db", "github_events")
        .await
        .unwrap();
    let (status, body) = get_events(create_test_router(log, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["author"], "octocat");
    assert!(dir
        .path()
        .join("github_webhook_db")
        .join("github_events.jsonl")
        .is_file());
}
