// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Fleetlink configuration system.

use std::io::Write;

use fleetlink_config::diagnostic::ConfigError;
use fleetlink_config::model::FleetlinkConfig;
use fleetlink_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[platform]
base_url = "https://telemetry.example.com/ajax.html"
token = "abc123"
request_timeout_secs = 10
max_retries = 2

[cache]
snapshot_ttl_secs = 600
unit_ttl_secs = 120

[poller]
enabled = false
interval_secs = 15

[messages]
window_hours = 6
limit = 20

[reports]
poll_interval_ms = 250
max_attempts = 8
row_limit = 500

[status]
online_window_secs = 600
recent_window_secs = 120
moving_speed = 3.5

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.platform.base_url, "https://telemetry.example.com/ajax.html");
    assert_eq!(config.platform.token.as_deref(), Some("abc123"));
    assert_eq!(config.platform.request_timeout_secs, 10);
    assert_eq!(config.platform.max_retries, 2);
    assert_eq!(config.cache.snapshot_ttl_secs, 600);
    assert_eq!(config.cache.unit_ttl_secs, 120);
    assert!(!config.poller.enabled);
    assert_eq!(config.poller.interval_secs, 15);
    assert_eq!(config.messages.window_hours, 6);
    assert_eq!(config.messages.limit, 20);
    assert_eq!(config.reports.poll_interval_ms, 250);
    assert_eq!(config.reports.max_attempts, 8);
    assert_eq!(config.reports.row_limit, 500);
    assert_eq!(config.status.online_window_secs, 600);
    assert_eq!(config.status.recent_window_secs, 120);
    assert_eq!(config.status.moving_speed, 3.5);
    assert_eq!(config.log.level, "debug");
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should deserialize");
    let defaults = FleetlinkConfig::default();
    assert_eq!(config.cache.snapshot_ttl_secs, defaults.cache.snapshot_ttl_secs);
    assert_eq!(config.cache.unit_ttl_secs, 60);
    assert_eq!(config.poller.interval_secs, 30);
    assert!(config.poller.enabled);
    assert_eq!(config.reports.max_attempts, 30);
    assert!(config.platform.token.is_none());
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[cache]
unit_tll_secs = 30
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("expected an UnknownKey error");
    assert_eq!(unknown.0, "unit_tll_secs");
    assert_eq!(unknown.1.as_deref(), Some("unit_ttl_secs"));
}

#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telemetry]
url = "x"
"#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[poller]
interval_secs = "often"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("interval_secs"))),
        "got: {errors:?}"
    );
}

#[test]
fn semantic_errors_surface_through_load_and_validate() {
    let toml = r#"
[cache]
snapshot_ttl_secs = 30
unit_ttl_secs = 60
"#;

    let errors = load_and_validate_str(toml).expect_err("unit TTL above snapshot TTL");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("unit_ttl_secs")))
    );
}

#[test]
fn explicit_path_loads_and_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
[platform]
base_url = "http://127.0.0.1:8080/ajax.html"

[reports]
max_attempts = 3
"#
    )
    .expect("write config");

    let config = load_and_validate_path(file.path()).expect("config should load");
    assert_eq!(config.platform.base_url, "http://127.0.0.1:8080/ajax.html");
    assert_eq!(config.reports.max_attempts, 3);
}

#[test]
fn diagnostics_render_with_code() {
    use miette::Diagnostic;

    let err = ConfigError::MissingKey {
        key: "platform.token".to_string(),
    };
    let code = err.code().map(|c| c.to_string());
    assert_eq!(code.as_deref(), Some("fleetlink::config::missing_key"));
}
