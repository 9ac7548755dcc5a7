//! Layered configuration loading.
//!
//! Sources, later ones overriding earlier ones:
//!  0. Legacy variables `MONGO_URI`, `GITHUB_WEBHOOK_SECRET`, `DB_NAME`,
//!     `COLLECTION_NAME`
//!  1. `/etc/webhook-ledger/service.yaml`
//!  2. `./config/service.yaml`
//!  3. File named by `WEBHOOK_LEDGER_CONFIG_FILE` (must exist when set)
//!  4. `WEBHOOK_LEDGER__*` variables, e.g. `WEBHOOK_LEDGER__SERVER__PORT=8080`
//!
//! Absent files are fine; a malformed file or a value that cannot be coerced
//! to its field type is a hard error.

use webhook_ledger_api::{ConfigError, ServiceConfig};

pub(crate) const ENV_PREFIX: &str = "WEBHOOK_LEDGER";
pub(crate) const CONFIG_FILE_ENV: &str = "WEBHOOK_LEDGER_CONFIG_FILE";

const SYSTEM_CONFIG_FILE: &str = "/etc/webhook-ledger/service";
const LOCAL_CONFIG_FILE: &str = "config/service";

/// Unprefixed variable names accepted for deployments that predate the
/// prefixed scheme, and the keys they map to
///
/// `MONGO_URI` is carried through so a `mongodb://` deployment is rejected at
/// startup rather than silently falling back to the default location.
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("MONGO_URI", "store.uri"),
    ("GITHUB_WEBHOOK_SECRET", "webhook.secret"),
    ("DB_NAME", "store.database"),
    ("COLLECTION_NAME", "store.collection"),
];

#[derive(Debug, thiserror::Error)]
pub(crate) enum SettingsError {
    #[error("Failed to build configuration: {0}")]
    Build(config::ConfigError),

    #[error("Could not deserialize service configuration: {0}")]
    Deserialize(config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Where configuration is read from
#[derive(Debug, Clone)]
pub(crate) struct ConfigSources {
    files: Vec<(String, bool)>,
    environment: config::Map<String, String>,
}

impl ConfigSources {
    pub(crate) fn from_process_env() -> Self {
        Self::new(std::env::vars().collect())
    }

    pub(crate) fn new(environment: config::Map<String, String>) -> Self {
        let mut files = vec![
            (SYSTEM_CONFIG_FILE.to_string(), false),
            (LOCAL_CONFIG_FILE.to_string(), false),
        ];

        if let Some(path) = environment.get(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
            files.push((path.clone(), true));
        }

        Self { files, environment }
    }

    /// Operator-specified file, if any
    pub(crate) fn explicit_file(&self) -> Option<&str> {
        self.files
            .iter()
            .find(|(_, required)| *required)
            .map(|(path, _)| path.as_str())
    }

    pub(crate) fn load(&self) -> Result<ServiceConfig, SettingsError> {
        let mut builder = config::Config::builder();

        for (variable, key) in LEGACY_ALIASES {
            if let Some(value) = self.environment.get(*variable) {
                builder = builder
                    .set_default(*key, value.as_str())
                    .map_err(SettingsError::Build)?;
            }
        }

        for (path, required) in &self.files {
            builder = builder.add_source(
                config::File::with_name(path)
                    .required(*required)
                    .format(config::FileFormat::Yaml),
            );
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(Some(self.environment.clone())),
            )
            .build()
            .map_err(SettingsError::Build)?;

        let service_config: ServiceConfig =
            config.try_deserialize().map_err(SettingsError::Deserialize)?;
        service_config.validate()?;

        Ok(service_config)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
