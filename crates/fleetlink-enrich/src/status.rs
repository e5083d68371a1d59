// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unit status derivation.
//!
//! | position age         | speed           | status  |
//! |----------------------|-----------------|---------|
//! | never, or > online   | any             | offline |
//! | <= online            | > moving speed  | moving  |
//! | < recent             | <= moving speed | online  |
//! | otherwise            | <= moving speed | idle    |

use chrono::{DateTime, TimeDelta, Utc};
use fleetlink_config::model::StatusConfig;
use fleetlink_core::UnitStatus;

/// Windows and speed threshold used to derive [`UnitStatus`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusThresholds {
    /// Seen within this window means online.
    pub online_window: TimeDelta,
    /// Slow units seen within this window are `online` instead of `idle`.
    pub recent_window: TimeDelta,
    /// Speeds strictly above this mean moving.
    pub moving_speed: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            online_window: TimeDelta::minutes(15),
            recent_window: TimeDelta::minutes(3),
            moving_speed: 5.0,
        }
    }
}

impl From<&StatusConfig> for StatusThresholds {
    fn from(config: &StatusConfig) -> Self {
        let secs = |s: u64| {
            i64::try_from(s)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX)
        };
        Self {
            online_window: secs(config.online_window_secs),
            recent_window: secs(config.recent_window_secs),
            moving_speed: config.moving_speed,
        }
    }
}

impl StatusThresholds {
    /// Whether a unit last seen at `last_seen` counts as online at `now`.
    pub fn is_online(&self, last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_seen.is_some_and(|seen| age(seen, now) <= self.online_window)
    }
}

/// Age of a timestamp; timestamps from the future count as just now.
fn age(seen: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
    now.signed_duration_since(seen).max(TimeDelta::zero())
}

/// Derives a unit's status from the time of its current position.
/// A missing speed counts as stationary.
pub fn derive_status(
    thresholds: &StatusThresholds,
    position_time: Option<DateTime<Utc>>,
    speed: Option<f64>,
    now: DateTime<Utc>,
) -> UnitStatus {
    let Some(seen) = position_time else {
        return UnitStatus::Offline;
    };
    let age = age(seen, now);
    if age > thresholds.online_window {
        return UnitStatus::Offline;
    }

    let speed = speed.unwrap_or(0.0);
    if speed > thresholds.moving_speed {
        UnitStatus::Moving
    } else if age < thresholds.recent_window {
        UnitStatus::Online
    } else {
        UnitStatus::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_at(minutes_ago: i64, speed: f64) -> UnitStatus {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let seen = now - TimeDelta::minutes(minutes_ago);
        derive_status(&StatusThresholds::default(), Some(seen), Some(speed), now)
    }

    #[test]
    fn twenty_minutes_is_offline() {
        assert_eq!(status_at(20, 0.0), UnitStatus::Offline);
        assert_eq!(status_at(20, 60.0), UnitStatus::Offline);
    }

    #[test]
    fn ten_minutes_stationary_is_idle() {
        assert_eq!(status_at(10, 0.0), UnitStatus::Idle);
    }

    #[test]
    fn one_minute_fast_is_moving() {
        assert_eq!(status_at(1, 40.0), UnitStatus::Moving);
    }

    #[test]
    fn one_minute_stationary_is_online() {
        assert_eq!(status_at(1, 0.0), UnitStatus::Online);
    }

    #[test]
    fn boundaries() {
        // Exactly 15 minutes is still within the online window.
        assert_eq!(status_at(15, 0.0), UnitStatus::Idle);
        assert_eq!(status_at(15, 6.0), UnitStatus::Moving);
        // Exactly 3 minutes is no longer recent.
        assert_eq!(status_at(3, 0.0), UnitStatus::Idle);
        // Exactly the moving speed is not moving.
        assert_eq!(status_at(1, 5.0), UnitStatus::Online);
    }

    #[test]
    fn never_seen_is_offline() {
        let now = Utc::now();
        assert_eq!(
            derive_status(&StatusThresholds::default(), None, Some(50.0), now),
            UnitStatus::Offline
        );
        assert!(!StatusThresholds::default().is_online(None, now));
    }

    #[test]
    fn future_timestamp_counts_as_now() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let seen = now + TimeDelta::minutes(5);
        assert_eq!(
            derive_status(&StatusThresholds::default(), Some(seen), None, now),
            UnitStatus::Online
        );
    }

    #[test]
    fn thresholds_from_config() {
        let config = StatusConfig {
            online_window_secs: 600,
            recent_window_secs: 60,
            moving_speed: 2.5,
        };
        let t = StatusThresholds::from(&config);
        assert_eq!(t.online_window, TimeDelta::minutes(10));
        assert_eq!(t.recent_window, TimeDelta::minutes(1));
        assert_eq!(t.moving_speed, 2.5);
    }
}
