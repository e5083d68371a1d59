// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: usable URLs, non-zero intervals
//! and TTL ordering. All failures are collected rather than failing fast.

use crate::diagnostic::ConfigError;
use crate::model::FleetlinkConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &FleetlinkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.platform.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::validation("platform.base_url must not be empty"));
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "platform.base_url `{base_url}` must start with http:// or https://"
        )));
    }

    if config
        .platform
        .token
        .as_deref()
        .is_some_and(|t| t.trim().is_empty())
    {
        errors.push(ConfigError::validation(
            "platform.token must not be empty when set",
        ));
    }

    if config.platform.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "platform.request_timeout_secs must be at least 1",
        ));
    }

    if config.cache.snapshot_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "cache.snapshot_ttl_secs must be at least 1",
        ));
    }
    if config.cache.unit_ttl_secs == 0 {
        errors.push(ConfigError::validation("cache.unit_ttl_secs must be at least 1"));
    }
    if config.cache.unit_ttl_secs >= config.cache.snapshot_ttl_secs {
        errors.push(ConfigError::validation(format!(
            "cache.unit_ttl_secs ({}) must be shorter than cache.snapshot_ttl_secs ({})",
            config.cache.unit_ttl_secs, config.cache.snapshot_ttl_secs
        )));
    }

    if config.poller.interval_secs == 0 {
        errors.push(ConfigError::validation("poller.interval_secs must be at least 1"));
    }

    if config.messages.window_hours == 0 {
        errors.push(ConfigError::validation("messages.window_hours must be at least 1"));
    }
    if config.messages.limit == 0 {
        errors.push(ConfigError::validation("messages.limit must be at least 1"));
    }

    if config.reports.max_attempts == 0 {
        errors.push(ConfigError::validation("reports.max_attempts must be at least 1"));
    }
    if config.reports.row_limit == 0 {
        errors.push(ConfigError::validation("reports.row_limit must be at least 1"));
    }

    let status = &config.status;
    if status.recent_window_secs > status.online_window_secs {
        errors.push(ConfigError::validation(format!(
            "status.recent_window_secs ({}) must not exceed status.online_window_secs ({})",
            status.recent_window_secs, status.online_window_secs
        )));
    }
    if !status.moving_speed.is_finite() || status.moving_speed < 0.0 {
        errors.push(ConfigError::validation(format!(
            "status.moving_speed must be a non-negative number, got {}",
            status.moving_speed
        )));
    }

    if !LOG_LEVELS.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
