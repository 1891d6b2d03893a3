//! Integration test for operator configuration
//!
//! Tests that operators can be configured in code or from TOML text without
//! touching the network.

use intercom_s3_connector::{
    ConnectorError, IntercomSettings, IntercomToS3Operator, OperatorConfig, ProcessingSettings,
    RecordFilter, SingleObjectPolicy,
};
use serde_json::json;

#[test]
fn test_programmatic_operator_config() {
    let mut config = OperatorConfig::new(
        "intercom_default",
        "companies",
        "s3_default",
        "analytics-raw",
        "intercom/companies.json",
    );
    config.intercom_method = "scroll".to_string();
    config.fields = Some(vec!["id".to_string(), "name".to_string()]);
    config.replication_key_name = Some("updated_at".to_string());
    config.replication_key_value = json!(1_700_000_000);
    config.processing = ProcessingSettings {
        lenient: true,
        single_object: SingleObjectPolicy::Bypass,
        log_level: "debug".to_string(),
    };

    assert!(config.validate().is_ok());
    assert_eq!(config.destination_key(), "intercom/companies.json");
    assert_eq!(
        config.allowed_fields(),
        Some(&["id".to_string(), "name".to_string()][..])
    );

    let filter = RecordFilter::from_config(&config).unwrap();
    assert_eq!(filter.cursor().unwrap().value(), 1_700_000_000);
    assert_eq!(filter.projection().unwrap().fields(), ["id", "name"]);
}

#[test]
fn test_defaults() {
    let config = OperatorConfig::new("intercom", "users", "s3", "bucket", "users.json");

    assert_eq!(config.intercom_method, "all");
    assert_eq!(config.replication_key_value, json!(0));
    assert!(config.replication_key_name.is_none());
    assert!(config.allowed_fields().is_none());
    assert!(config.query.is_empty());

    let processing = ProcessingSettings::default();
    assert!(!processing.lenient);
    assert_eq!(processing.single_object, SingleObjectPolicy::Uniform);
    assert_eq!(processing.log_level, "info");

    let intercom = IntercomSettings::default();
    assert_eq!(intercom.base_url, "https://api.intercom.io");
    assert_eq!(intercom.timeout_secs, 30);
    assert_eq!(intercom.per_page, 50);
}

#[test]
fn test_s3_key_is_fallback_destination() {
    let mut config = OperatorConfig::new("intercom", "users", "s3", "bucket", "");
    assert!(matches!(
        config.validate(),
        Err(ConnectorError::Configuration(_))
    ));

    config.s3_key = "legacy/users.json".to_string();
    assert!(config.validate().is_ok());
    assert_eq!(config.destination_key(), "legacy/users.json");

    config.output = "intercom/users.json".to_string();
    assert_eq!(config.destination_key(), "intercom/users.json");
}

#[test]
fn test_full_toml_config() {
    let config = OperatorConfig::from_toml_str(
        r#"
        intercom_conn_id = "intercom_default"
        intercom_obj = "users"
        intercom_method = "find_all"
        s3_conn_id = "s3_default"
        s3_bucket = "analytics-raw"
        output = "intercom/users.json"
        fields = ["id", "email", "updated_at"]
        replication_key_name = "updated_at"
        replication_key_value = "1700000000"

        [query]
        tag_id = "42"

        [processing]
        lenient = true
        single_object = "bypass"
        log_level = "warn"

        [intercom]
        base_url = "http://localhost:8080"
        timeout_secs = 5
        per_page = 150
        "#,
    )
    .unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.intercom_method, "find_all");
    assert_eq!(config.query.get("tag_id"), Some(&json!("42")));
    assert_eq!(config.replication_key_value, json!("1700000000"));
    assert!(config.processing.lenient);
    assert_eq!(config.processing.single_object, SingleObjectPolicy::Bypass);
    assert_eq!(config.intercom.base_url, "http://localhost:8080");
    assert_eq!(config.intercom.per_page, 150);

    // Integer strings are valid cursor values
    let filter = RecordFilter::from_config(&config).unwrap();
    assert_eq!(filter.cursor().unwrap().value(), 1_700_000_000);
}

#[test]
fn test_minimal_toml_config() {
    let config = OperatorConfig::from_toml_str(
        r#"
        intercom_conn_id = "intercom_default"
        intercom_obj = "tags"
        s3_conn_id = "s3_default"
        s3_bucket = "analytics-raw"
        s3_key = "intercom/tags.json"
        "#,
    )
    .unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.intercom_method, "all");
    assert_eq!(config.destination_key(), "intercom/tags.json");
    assert_eq!(config.processing.single_object, SingleObjectPolicy::Uniform);
}

#[test]
fn test_invalid_toml_is_configuration_error() {
    let err = OperatorConfig::from_toml_str("intercom_obj = ").unwrap_err();
    assert!(matches!(err, ConnectorError::Configuration(_)));

    // Missing mandatory fields
    let err = OperatorConfig::from_toml_str(r#"intercom_obj = "users""#).unwrap_err();
    assert!(matches!(err, ConnectorError::Configuration(_)));
}

#[test]
fn test_validation_rejects_empty_fields() {
    let mut config = OperatorConfig::new("intercom", "users", "s3", "bucket", "users.json");
    config.s3_bucket.clear();
    assert!(config.validate().is_err());

    let mut config = OperatorConfig::new("intercom", "users", "s3", "bucket", "users.json");
    config.fields = Some(vec!["id".to_string(), String::new()]);
    assert!(config.validate().is_err());

    let mut config = OperatorConfig::new("intercom", "users", "s3", "bucket", "users.json");
    config.intercom.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_operator_rejects_non_integer_cursor_before_network() {
    for bad in [json!("abc"), json!("5.0"), json!(null), json!({"v": 1})] {
        let mut config = OperatorConfig::new("intercom", "users", "s3", "bucket", "users.json");
        config.replication_key_name = Some("updated_at".to_string());
        config.replication_key_value = bad.clone();

        match IntercomToS3Operator::new(config) {
            Err(ConnectorError::TypeCoercion { field, .. }) => {
                assert_eq!(field, "replication_key_value", "value {}", bad)
            }
            Err(other) => panic!("unexpected error for {}: {}", bad, other),
            Ok(_) => panic!("cursor {} should be rejected", bad),
        }
    }
}
