//! Configuration types for the HTTP service
//!
//! Every section carries serde defaults, so an empty configuration source
//! yields a runnable service that stores events under `./data`.

use serde::{Deserialize, Serialize};
use webhook_ledger_core::WebhookSecret;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Event log location
    pub store: StoreConfig,

    /// Webhook ingestion settings
    pub webhook: WebhookConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check values that deserialize fine but cannot be served
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be non-zero"));
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::invalid(
                "server.max_body_size",
                "must be non-zero",
            ));
        }

        if self.store.uri.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "store.uri".to_string(),
            });
        }

        validate_store_name("store.database", &self.store.database)?;
        validate_store_name("store.collection", &self.store.collection)?;

        if !self.webhook.endpoint_path.starts_with('/') {
            return Err(ConfigError::invalid(
                "webhook.endpoint_path",
                "must start with '/'",
            ));
        }

        Ok(())
    }
}

/// Database and collection names become path segments in file-backed logs
fn validate_store_name(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Missing {
            key: key.to_string(),
        });
    }

    let unsafe_name = value == "."
        || value.contains("..")
        || value.chars().any(|c| matches!(c, '/' | '\\' | '\0'));

    if unsafe_name {
        return Err(ConfigError::invalid(
            key,
            "must not contain path separators or '..'",
        ));
    }

    Ok(())
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Longest time in-flight requests may drain after a shutdown signal
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Event log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection URI (`file://<path>` or `memory://`)
    pub uri: String,

    /// Logical namespace within the store
    pub database: String,

    /// Collection that normalized events are written to and read from
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "file://./data".to_string(),
            database: "github_webhook_db".to_string(),
            collection: "github_events".to_string(),
        }
    }
}

/// Webhook ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Shared secret for `X-Hub-Signature-256` verification
    ///
    /// When unset or empty, signatures are not checked at all.
    pub secret: Option<WebhookSecret>,
}

impl WebhookConfig {
    /// The secret to verify with, if one is effectively configured
    pub fn secret(&self) -> Option<&WebhookSecret> {
        self.secret.as_ref().filter(|secret| !secret.is_empty())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook".to_string(),
            secret: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for '{key}': {message}")]
    Invalid { key: String, message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

impl ConfigError {
    fn invalid(key: &str, message: &str) -> Self {
        Self::Invalid {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
