// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Fleetlink.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Fleetlink configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FleetlinkConfig {
    /// Telemetry platform connection settings.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Cache time-to-live settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Background poller settings.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Recent-message loading settings.
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Report execution settings.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Unit status derivation thresholds.
    #[serde(default)]
    pub status: StatusConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Telemetry platform connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Base URL of the platform's JSON API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Long-lived access token exchanged for a session at login.
    /// `None` requires the `FLEETLINK_PLATFORM_TOKEN` environment variable.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for transient HTTP failures (429/5xx).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl PlatformConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_base_url() -> String {
    "https://hst-api.wialon.com/wialon/ajax.html".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    1
}

/// Cache TTL configuration.
///
/// The unit TTL must be shorter than the snapshot TTL so that unit details
/// refresh independently of the snapshot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// TTL of the system snapshot (units, users, resources, groups, hardware).
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,

    /// TTL of individual enriched unit entries.
    #[serde(default = "default_unit_ttl_secs")]
    pub unit_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
            unit_ttl_secs: default_unit_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn unit_ttl(&self) -> Duration {
        Duration::from_secs(self.unit_ttl_secs)
    }
}

fn default_snapshot_ttl_secs() -> u64 {
    300
}

fn default_unit_ttl_secs() -> u64 {
    60
}

/// Background poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    /// Whether `initialize` starts the poller.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between poll ticks.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_poll_interval_secs(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Recent-message loading configuration used by unit detail fetches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    /// How far back to look for recent messages, in hours.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    /// Maximum number of messages loaded per unit.
    #[serde(default = "default_message_limit")]
    pub limit: u32,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            limit: default_message_limit(),
        }
    }
}

fn default_window_hours() -> u32 {
    24
}

fn default_message_limit() -> u32 {
    50
}

/// Report execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportsConfig {
    /// Delay between report status checks, in milliseconds.
    #[serde(default = "default_report_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Status checks before a remote report is declared timed out.
    #[serde(default = "default_report_max_attempts")]
    pub max_attempts: u32,

    /// Rows fetched per report table.
    #[serde(default = "default_report_row_limit")]
    pub row_limit: u32,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_report_poll_interval_ms(),
            max_attempts: default_report_max_attempts(),
            row_limit: default_report_row_limit(),
        }
    }
}

impl ReportsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_report_poll_interval_ms() -> u64 {
    1000
}

fn default_report_max_attempts() -> u32 {
    30
}

fn default_report_row_limit() -> u32 {
    1000
}

/// Unit status derivation thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StatusConfig {
    /// A unit is online if seen within this many seconds.
    #[serde(default = "default_online_window_secs")]
    pub online_window_secs: u64,

    /// A slow unit seen within this many seconds is `online` rather than `idle`.
    #[serde(default = "default_recent_window_secs")]
    pub recent_window_secs: u64,

    /// Speeds above this value mean the unit is moving.
    #[serde(default = "default_moving_speed")]
    pub moving_speed: f64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            online_window_secs: default_online_window_secs(),
            recent_window_secs: default_recent_window_secs(),
            moving_speed: default_moving_speed(),
        }
    }
}

fn default_online_window_secs() -> u64 {
    15 * 60
}

fn default_recent_window_secs() -> u64 {
    3 * 60
}

fn default_moving_speed() -> f64 {
    5.0
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
