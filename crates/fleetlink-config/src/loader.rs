// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Lookup order: `./fleetlink.toml` > `~/.config/fleetlink/fleetlink.toml` >
//! `/etc/fleetlink/fleetlink.toml`, with `FLEETLINK_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FleetlinkConfig;

/// Config sections that env var names may address.
const SECTIONS: &[&str] = &[
    "platform", "cache", "poller", "messages", "reports", "status", "log",
];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/fleetlink/fleetlink.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "fleetlink.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("fleetlink/fleetlink.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fleetlink/fleetlink.toml`
/// 3. `~/.config/fleetlink/fleetlink.toml`
/// 4. `./fleetlink.toml`
/// 5. `FLEETLINK_*` environment variables
pub fn load_config() -> Result<FleetlinkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
pub fn load_config_from_str(toml_content: &str) -> Result<FleetlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FleetlinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, still honoring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<FleetlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FleetlinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FleetlinkConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Env provider mapping `FLEETLINK_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `FLEETLINK_CACHE_UNIT_TTL_SECS` maps to `cache.unit_ttl_secs`.
fn env_provider() -> Env {
    Env::prefixed("FLEETLINK_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
