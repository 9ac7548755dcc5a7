//! # Webhook Ledger Service
//!
//! Binary entry point for the webhook-ledger HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Opens the configured event log
//! - Starts the HTTP server from webhook-ledger-api
//!
//! Exit codes: 1 bind failure, 2 server or event log failure, 3 configuration error.

mod settings;
mod telemetry;

use settings::ConfigSources;
use tracing::{error, info, warn};
use webhook_ledger_api::{start_server, LoggingConfig, ServiceError};
use webhook_ledger_core::{EventLogError, EventLogLocation};

#[tokio::main]
async fn main() {
    let sources = ConfigSources::from_process_env();

    let service_config = match sources.load() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_logging(&LoggingConfig::default());
            error!(
                error = %e,
                "Service configuration is invalid; aborting. Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    telemetry::init_logging(&service_config.logging);
    info!("Starting Webhook Ledger Service");

    if let Some(path) = sources.explicit_file() {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    let store = &service_config.store;
    let event_log = match EventLogLocation::parse(&store.uri) {
        Ok(location) => location.connect(&store.database, &store.collection).await,
        Err(e) => Err(e),
    };

    let event_log = match event_log {
        Ok(log) => log,
        Err(e) => {
            error!(uri = %store.uri, error = %e, "Failed to open event log; aborting");
            std::process::exit(event_log_exit_code(&e));
        }
    };

    info!(
        uri = %store.uri,
        database = %store.database,
        collection = %store.collection,
        "Connected to event log"
    );

    if service_config.webhook.secret().is_some() {
        info!("Webhook secret is configured");
    } else {
        warn!("Webhook secret is NOT configured. Webhooks will not be verified.");
    }

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, event_log).await {
        error!("Failed to start server: {}", e);
        std::process::exit(server_exit_code(&e));
    }
}

fn server_exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::BindFailed { .. } => 1,
        ServiceError::ServerFailed { .. } => 2,
        ServiceError::Configuration(_) => 3,
    }
}

fn event_log_exit_code(error: &EventLogError) -> i32 {
    match error {
        EventLogError::UnsupportedLocation { .. } => 3,
        _ => 2,
    }
}
