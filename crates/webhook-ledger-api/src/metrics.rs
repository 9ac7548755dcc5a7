//! Prometheus metrics for webhook ingestion and event queries.
//!
//! Each [`ServiceMetrics`] owns its own [`Registry`], so several routers can
//! coexist in one process (as they do in tests) without name collisions.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::{sync::Arc, time::Duration};

/// Final disposition of one `/webhook` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Normalized event was stored
    Success,
    /// Event type or action outside the tracked set
    Ignored,
    /// Tracked event with a required field missing
    Invalid,
    /// Signature missing or mismatched
    Rejected,
    /// Empty or unparseable body
    Malformed,
    /// Event log refused the insert
    StoreError,
    /// Anything else that produced a 500
    InternalError,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Ignored => "ignored",
            Self::Invalid => "invalid",
            Self::Rejected => "rejected",
            Self::Malformed => "malformed",
            Self::StoreError => "store_error",
            Self::InternalError => "internal_error",
        }
    }
}

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    pub webhook_requests_total: IntCounterVec,
    pub webhook_duration_seconds: Histogram,
    pub events_queries_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let webhook_requests_total = IntCounterVec::new(
            Opts::new(
                "webhook_requests_total",
                "Total webhook requests received, by outcome",
            ),
            &["outcome"],
        )?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        let events_queries_total = IntCounterVec::new(
            Opts::new(
                "events_queries_total",
                "Total recent-events queries served, by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;
        registry.register(Box::new(events_queries_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhook_requests_total,
            webhook_duration_seconds,
            events_queries_total,
        }))
    }

    pub fn record_webhook(&self, outcome: WebhookOutcome, elapsed: Duration) {
        self.webhook_requests_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.webhook_duration_seconds
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_query(&self, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "error" };
        self.events_queries_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
