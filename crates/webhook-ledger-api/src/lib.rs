//! # Webhook Ledger HTTP Service
//!
//! HTTP server that receives GitHub webhooks, verifies and classifies them,
//! and appends the recognized ones to the event log.
//!
//! This service provides:
//! - `POST /webhook` ingestion with `X-Hub-Signature-256` verification
//! - `GET /events` returning the most recent stored events
//! - `GET /` landing page that polls `/events`
//! - `GET /metrics` Prometheus exposition

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use futures::FutureExt;
use serde_json::Value;
use std::{
    any::Any,
    future::{Future, IntoFuture},
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};
use webhook_ledger_core::{
    classify, signature, Classification, EventLog, NormalizedEvent, StoredEvent, WebhookSecret,
    RECENT_EVENTS_LIMIT,
};

pub use config::{
    ConfigError, LoggingConfig, ServerConfig, ServiceConfig, StoreConfig, WebhookConfig,
};
pub use errors::{QueryError, ServiceError, WebhookHandlerError, INTERNAL_ERROR_MESSAGE};
pub use metrics::{ServiceMetrics, WebhookOutcome};
pub use responses::{ResponseStatus, StatusResponse};

/// Header carrying the event-type tag
pub const EVENT_TYPE_HEADER: &str = "x-github-event";

/// Header carrying `sha256=<hex>` over the raw body
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Header used to correlate log lines for one request
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Message returned when a recognized event was stored
pub const WEBHOOK_PROCESSED_MESSAGE: &str = "Webhook received and processed";

const LANDING_PAGE: &str = include_str!("../assets/index.html");

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub event_log: Arc<dyn EventLog>,
    pub webhook_secret: Option<WebhookSecret>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        event_log: Arc<dyn EventLog>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let webhook_secret = config.webhook.secret().cloned();
        Self {
            config,
            event_log,
            webhook_secret,
            metrics,
        }
    }
}

// ============================================================================
// Router and Server
// ============================================================================

/// Build the HTTP router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_body_size;
    let webhook_path = state.config.webhook.endpoint_path.clone();

    Router::new()
        .route("/", get(landing_page))
        .route(&webhook_path, post(handle_webhook))
        .route("/events", get(list_events))
        .route("/metrics", get(metrics_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_body_size))
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Runs until SIGINT or SIGTERM, then gives in-flight requests
/// `server.shutdown_timeout_seconds` to finish.
pub async fn start_server(
    config: ServiceConfig,
    event_log: Arc<dyn EventLog>,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            key: "metrics".to_string(),
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let host = config.server.host.clone();
    let port = config.server.port;
    let address = format!("{}:{}", host, port);
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let app = create_router(AppState::new(config, event_log, metrics));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    let shutdown_signal = async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
        }
    };

    serve_with_shutdown(listener, app, shutdown_signal, shutdown_timeout).await
}

/// Serve `app` until `shutdown` resolves, then drain for at most `drain_timeout`
///
/// New connections stop being accepted as soon as `shutdown` resolves.
/// Requests still running when the timeout expires are abandoned.
pub async fn serve_with_shutdown<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: F,
    drain_timeout: Duration,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let draining = Arc::new(Notify::new());
    let signal_draining = draining.clone();
    let signal = async move {
        shutdown.await;
        signal_draining.notify_one();
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    let drain_deadline = async {
        draining.notified().await;
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Graceful shutdown timed out; abandoning in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// What a successfully handled delivery turned into
enum Ingested {
    Stored,
    Ignored(String),
}

/// Handle GitHub webhook requests
///
/// Steps, each of which can end the request:
/// 1. Verify the signature over the raw body (403)
/// 2. Parse the body as a non-empty JSON object (400)
/// 3. Classify by event type: ignored (200), invalid (400) or normalized
/// 4. Append the normalized event to the log (500 on failure)
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StatusResponse>, WebhookHandlerError> {
    let start = Instant::now();
    let result = match AssertUnwindSafe(ingest(&state, &headers, &body))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => {
            state
                .metrics
                .record_webhook(WebhookOutcome::InternalError, start.elapsed());
            error!(
                event_type = %header_value(&headers, EVENT_TYPE_HEADER).unwrap_or_default(),
                body_len = body.len(),
                payload = %String::from_utf8_lossy(&body),
                "Webhook processing panicked"
            );
            // Rendered as a generic 500 by the catch-panic layer.
            std::panic::resume_unwind(panic);
        }
    };

    match result {
        Ok(Ingested::Stored) => {
            state
                .metrics
                .record_webhook(WebhookOutcome::Success, start.elapsed());
            Ok(Json(StatusResponse::success(WEBHOOK_PROCESSED_MESSAGE)))
        }
        Ok(Ingested::Ignored(reason)) => {
            state
                .metrics
                .record_webhook(WebhookOutcome::Ignored, start.elapsed());
            Ok(Json(StatusResponse::ignored(reason)))
        }
        Err(e) => {
            state.metrics.record_webhook(e.outcome(), start.elapsed());
            Err(e)
        }
    }
}

async fn ingest(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Ingested, WebhookHandlerError> {
    signature::verify(
        state.webhook_secret.as_ref(),
        body,
        header_value(headers, SIGNATURE_HEADER),
    )?;

    // A missing tag classifies as an unknown event type and is ignored.
    let event_type = header_value(headers, EVENT_TYPE_HEADER).unwrap_or_default();
    let payload = parse_payload(body)?;

    info!(event_type = %event_type, "Received GitHub event");

    match classify(event_type, &payload) {
        Classification::Ignored { reason } => {
            info!(event_type = %event_type, reason = %reason, "Webhook ignored");
            Ok(Ingested::Ignored(reason))
        }
        Classification::Invalid { field } => {
            error!(
                event_type = %event_type,
                field = %field,
                payload = %payload,
                "Missing key in payload"
            );
            Err(WebhookHandlerError::MissingField { field })
        }
        Classification::Normalized(classified) => {
            let event = NormalizedEvent::from_classified(classified);

            if let Err(e) = state.event_log.insert_one(&event).await {
                error!(
                    request_id = %event.request_id(),
                    error = %e,
                    payload = %payload,
                    "Failed to store event"
                );
                return Err(e.into());
            }

            info!(
                request_id = %event.request_id(),
                action = %event.action(),
                author = %event.author(),
                from_branch = ?event.from_branch(),
                to_branch = %event.to_branch(),
                "Event stored"
            );
            Ok(Ingested::Stored)
        }
    }
}

/// Read a header as text; a value that is not visible ASCII reads as empty
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).map(|v| v.to_str().unwrap_or_default())
}

/// Parse the body into a JSON object with at least one key
fn parse_payload(body: &[u8]) -> Result<Value, WebhookHandlerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(WebhookHandlerError::EmptyPayload);
    }

    let payload: Value =
        serde_json::from_slice(body).map_err(|e| WebhookHandlerError::MalformedPayload {
            message: e.to_string(),
        })?;

    match &payload {
        Value::Object(map) if map.is_empty() => Err(WebhookHandlerError::EmptyPayload),
        Value::Object(_) => Ok(payload),
        Value::Null => Err(WebhookHandlerError::EmptyPayload),
        _ => Err(WebhookHandlerError::MalformedPayload {
            message: "expected a JSON object".to_string(),
        }),
    }
}

// ============================================================================
// Query and Page Handlers
// ============================================================================

/// Return the most recent events, newest first
#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredEvent>>, QueryError> {
    let mut events = match state.event_log.find_recent(RECENT_EVENTS_LIMIT).await {
        Ok(events) => events,
        Err(e) => {
            state.metrics.record_query(false);
            error!(error = %e, "Error fetching events");
            return Err(e.into());
        }
    };

    // The response contract holds even if a log returns more or unsorted rows.
    events.sort_by(|a, b| b.event.timestamp().cmp(a.event.timestamp()));
    events.truncate(RECENT_EVENTS_LIMIT);

    state.metrics.record_query(true);
    info!(count = events.len(), "Fetched recent events");
    Ok(Json(events))
}

async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error(INTERNAL_ERROR_MESSAGE)),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Render a handler panic as a generic 500
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");

    error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(StatusResponse::error(INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}

/// Request logging middleware with correlation ID propagation
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
