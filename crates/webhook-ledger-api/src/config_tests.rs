//! Tests for [`ServiceConfig`] defaults, deserialization and validation.

use super::*;

mod defaults_tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_local_store() {
        let config = ServiceConfig::default();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.store.uri, "file://./data");
        assert_eq!(config.store.database, "github_webhook_db");
        assert_eq!(config.store.collection, "github_events");
        assert_eq!(config.webhook.endpoint_path, "/webhook");
        assert!(config.webhook.secret().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config: ServiceConfig = serde_json::from_value(serde_json::json!({
            "store": { "collection": "audit" },
            "webhook": { "secret": "s3cr3t" }
        }))
        .unwrap();

        assert_eq!(config.store.collection, "audit");
        assert_eq!(config.store.database, "github_webhook_db");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.webhook.secret().unwrap().expose_bytes(), b"s3cr3t");
    }
}

mod secret_tests {
    use super::*;

    #[test]
    fn test_empty_secret_counts_as_unset() {
        let config: WebhookConfig =
            serde_json::from_value(serde_json::json!({ "secret": "" })).unwrap();

        assert!(config.secret.is_some());
        assert!(config.secret().is_none());
    }

    #[test]
    fn test_debug_and_serialize_redact_secret() {
        let config: ServiceConfig = serde_json::from_value(serde_json::json!({
            "webhook": { "secret": "super-sensitive" }
        }))
        .unwrap();

        let debug_str = format!("{:?}", config);
        let json = serde_json::to_string(&config).unwrap();

        assert!(!debug_str.contains("super-sensitive"));
        assert!(!json.contains("super-sensitive"));
    }
}

mod validation_tests {
    use super::*;

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = ServiceConfig::default();
        config.server.port = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key, .. }) if key == "server.port"
        ));
    }

    #[test]
    fn test_empty_store_uri_is_rejected() {
        let mut config = ServiceConfig::default();
        config.store.uri = "  ".to_string();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing { key }) if key == "store.uri"
        ));
    }

    #[test]
    fn test_path_like_store_names_are_rejected() {
        for name in ["../escape", "a/b", "a\\b", ".", ""] {
            let mut config = ServiceConfig::default();
            config.store.collection = name.to_string();

            assert!(
                config.validate().is_err(),
                "collection name {name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_endpoint_path_must_be_absolute() {
        let mut config = ServiceConfig::default();
        config.webhook.endpoint_path = "webhook".to_string();

        assert!(config.validate().is_err());
    }
}
