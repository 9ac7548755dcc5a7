use super::*;

#[test]
fn test_instances_do_not_share_registries() {
    let first = ServiceMetrics::new().unwrap();
    let second = ServiceMetrics::new().unwrap();

    first.record_webhook(WebhookOutcome::Success, Duration::from_millis(3));

    assert_eq!(
        first
            .webhook_requests_total
            .with_label_values(&["success"])
            .get(),
        1
    );
    assert_eq!(
        second
            .webhook_requests_total
            .with_label_values(&["success"])
            .get(),
        0
    );
}

#[test]
fn test_encode_exposes_outcome_labels() {
    let metrics = ServiceMetrics::new().unwrap();
    metrics.record_webhook(WebhookOutcome::StoreError, Duration::from_millis(1));
    metrics.record_query(false);

    let text = metrics.encode().unwrap();

    assert!(text.contains("webhook_requests_total{outcome=\"store_error\"} 1"));
    assert!(text.contains("events_queries_total{outcome=\"error\"} 1"));
    assert!(text.contains("webhook_duration_seconds_count 1"));
}
