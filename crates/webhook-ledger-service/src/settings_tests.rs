use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_empty_environment_yields_defaults() {
    let config = ConfigSources::new(env(&[])).load().unwrap();

    assert_eq!(config.server.port, 5000);
    assert_eq!(config.store.uri, "file://./data");
    assert_eq!(config.store.collection, "github_events");
    assert!(config.webhook.secret().is_none());
}

#[test]
fn test_prefixed_variables_override_defaults() {
    let config = ConfigSources::new(env(&[
        ("WEBHOOK_LEDGER__SERVER__PORT", "8080"),
        ("WEBHOOK_LEDGER__STORE__URI", "memory://"),
        ("WEBHOOK_LEDGER__WEBHOOK__SECRET", "from-env"),
    ]))
    .load()
    .unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.store.uri, "memory://");
    assert_eq!(config.webhook.secret().unwrap().expose_bytes(), b"from-env");
}

#[test]
fn test_legacy_aliases_apply_below_prefixed_variables() {
    let config = ConfigSources::new(env(&[
        ("GITHUB_WEBHOOK_SECRET", "legacy-secret"),
        ("DB_NAME", "legacy_db"),
        ("COLLECTION_NAME", "legacy_events"),
        ("WEBHOOK_LEDGER__STORE__COLLECTION", "events"),
    ]))
    .load()
    .unwrap();

    assert_eq!(
        config.webhook.secret().unwrap().expose_bytes(),
        b"legacy-secret"
    );
    assert_eq!(config.store.database, "legacy_db");
    assert_eq!(config.store.collection, "events");
}

#[test]
fn test_legacy_mongo_uri_is_rejected_at_startup() {
    let config = ConfigSources::new(env(&[("MONGO_URI", "mongodb://db.internal:27017/")]))
        .load()
        .unwrap();

    assert_eq!(config.store.uri, "mongodb://db.internal:27017/");

    let err = webhook_ledger_core::EventLogLocation::parse(&config.store.uri).unwrap_err();
    assert_eq!(crate::event_log_exit_code(&err), 3);
}

#[test]
fn test_prefixed_uri_overrides_mongo_uri() {
    let config = ConfigSources::new(env(&[
        ("MONGO_URI", "mongodb://db.internal:27017/"),
        ("WEBHOOK_LEDGER__STORE__URI", "memory://"),
    ]))
    .load()
    .unwrap();

    assert_eq!(config.store.uri, "memory://");
}

#[test]
fn test_explicit_file_is_loaded_and_env_still_wins() {
    let file = yaml_file(
        "server:\n  port: 7000\nstore:\n  uri: \"memory://\"\n  database: file_db\n",
    );
    let path = file.path().to_str().unwrap();

    let sources = ConfigSources::new(env(&[
        (CONFIG_FILE_ENV, path),
        ("WEBHOOK_LEDGER__SERVER__PORT", "7100"),
    ]));
    let config = sources.load().unwrap();

    assert_eq!(sources.explicit_file(), Some(path));
    assert_eq!(config.server.port, 7100);
    assert_eq!(config.store.uri, "memory://");
    assert_eq!(config.store.database, "file_db");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let sources = ConfigSources::new(env(&[(
        CONFIG_FILE_ENV,
        "/nonexistent/webhook-ledger/service.yaml",
    )]));

    assert!(matches!(sources.load(), Err(SettingsError::Build(_))));
}

#[test]
fn test_uncoercible_value_is_an_error() {
    let sources = ConfigSources::new(env(&[("WEBHOOK_LEDGER__SERVER__PORT", "not-a-port")]));

    assert!(matches!(sources.load(), Err(SettingsError::Deserialize(_))));
}

#[test]
fn test_unsafe_collection_name_fails_validation() {
    let sources = ConfigSources::new(env(&[("WEBHOOK_LEDGER__STORE__COLLECTION", "../etc")]));

    assert!(matches!(sources.load(), Err(SettingsError::Invalid(_))));
}
