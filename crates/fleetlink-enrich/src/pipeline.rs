// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw unit + sensors + recent messages -> enriched unit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetlink_core::types::{CalibrationPoint, Position};
use fleetlink_core::{EnrichedUnit, RawUnit, Sensor, TelemetryMessage};

use crate::classifier::{NamingConventionClassifier, UnitClassifier};
use crate::status::{StatusThresholds, derive_status};

/// The enrichment pipeline.
///
/// Cheap to clone; the classifier is shared.
#[derive(Clone)]
pub struct Enricher {
    thresholds: StatusThresholds,
    classifier: Arc<dyn UnitClassifier>,
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(
            StatusThresholds::default(),
            Arc::new(NamingConventionClassifier),
        )
    }
}

impl Enricher {
    pub fn new(thresholds: StatusThresholds, classifier: Arc<dyn UnitClassifier>) -> Self {
        Self {
            thresholds,
            classifier,
        }
    }

    pub fn thresholds(&self) -> &StatusThresholds {
        &self.thresholds
    }

    /// Enriches one unit.
    ///
    /// `messages` must be ordered newest first. The unit's own last message
    /// is consulted after them. Fields the inputs cannot support are `None`.
    pub fn enrich(
        &self,
        raw: RawUnit,
        sensors: &[Sensor],
        messages: &[TelemetryMessage],
        now: DateTime<Utc>,
    ) -> EnrichedUnit {
        let history: Vec<&TelemetryMessage> =
            messages.iter().chain(raw.last_message.as_ref()).collect();

        let current_position = raw
            .position
            .clone()
            .or_else(|| history.iter().find_map(|m| m.position.clone()));

        let speed = history
            .iter()
            .find_map(|m| m.position.as_ref().and_then(|p| p.speed))
            .or_else(|| raw.position.as_ref().and_then(|p| p.speed));

        let last_seen = last_seen(raw.position.as_ref(), &history);
        let is_online = self.thresholds.is_online(last_seen, now);
        // Parameter-only messages keep a unit online but never move its status.
        let position_time = current_position.as_ref().map(|p| p.time);
        let status = derive_status(&self.thresholds, position_time, speed, now);

        let fuel_level = fuel_sensor(sensors).and_then(|s| reading(s, &history));
        let engine_hours = engine_hours_sensor(sensors).and_then(|s| reading(s, &history));

        let classification = self.classifier.classify(&raw);
        let access_level = raw.access_level;

        EnrichedUnit {
            raw,
            is_online,
            status,
            current_position,
            fuel_level,
            speed,
            engine_hours,
            classification,
            last_seen,
            access_level,
        }
    }
}

/// Newest of the unit's position time and its message times.
fn last_seen(position: Option<&Position>, history: &[&TelemetryMessage]) -> Option<DateTime<Utc>> {
    position
        .map(|p| p.time)
        .into_iter()
        .chain(history.iter().map(|m| m.time))
        .max()
}

fn matches_any(sensor: &Sensor, needles: &[&str]) -> bool {
    let name = sensor.name.to_lowercase();
    let kind = sensor.kind.to_lowercase();
    needles
        .iter()
        .any(|n| name.contains(n) || kind.contains(n))
}

fn fuel_sensor(sensors: &[Sensor]) -> Option<&Sensor> {
    sensors.iter().find(|s| matches_any(s, &["fuel"]))
}

/// Prefers an explicit hours sensor over a generic engine one.
fn engine_hours_sensor(sensors: &[Sensor]) -> Option<&Sensor> {
    sensors
        .iter()
        .find(|s| matches_any(s, &["hour"]))
        .or_else(|| {
            sensors
                .iter()
                .find(|s| matches_any(s, &["engine"]) && !matches_any(s, &["fuel"]))
        })
}

/// First reading for `sensor` in newest-first `history`, calibrated.
///
/// Messages key readings by sensor id or by the sensor's parameter name.
fn reading(sensor: &Sensor, history: &[&TelemetryMessage]) -> Option<f64> {
    let id_key = sensor.id.to_string();
    history
        .iter()
        .find_map(|m| {
            m.params
                .get(&id_key)
                .or_else(|| sensor.parameter.as_ref().and_then(|p| m.params.get(p)))
                .copied()
                .filter(|v| v.is_finite())
        })
        .map(|raw| calibrate(&sensor.calibration, raw))
}

/// Piecewise-linear calibration: `a * x + b` from the last row whose `x` is
/// at or below the reading. Readings below the table use the first row.
pub fn calibrate(table: &[CalibrationPoint], reading: f64) -> f64 {
    let row = table
        .iter()
        .rev()
        .find(|row| row.x <= reading)
        .or_else(|| table.first());
    match row {
        Some(row) => row.a * reading + row.b,
        None => reading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use fleetlink_core::UnitStatus;
    use fleetlink_core::types::Connectivity;
    use fleetlink_test_utils::fixtures::{calibrated, message, position, raw_unit, sensor};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn mins_ago(m: i64) -> DateTime<Utc> {
        now() - TimeDelta::minutes(m)
    }

    fn fuel() -> Sensor {
        sensor(1, "Fuel tank", "fuel level", "fuel_lvl")
    }

    fn hours() -> Sensor {
        sensor(2, "Engine hours", "engine hours", "eng_h")
    }

    #[test]
    fn unit_without_data_is_offline_with_gaps() {
        let unit = Enricher::default().enrich(raw_unit(1, "KA-spare"), &[], &[], now());
        assert!(!unit.is_online);
        assert_eq!(unit.status, UnitStatus::Offline);
        assert!(unit.current_position.is_none());
        assert!(unit.speed.is_none());
        assert!(unit.fuel_level.is_none());
        assert!(unit.engine_hours.is_none());
        assert!(unit.last_seen.is_none());
    }

    #[test]
    fn moving_unit_from_messages() {
        let messages = [
            message(mins_ago(1), Some(40.0), &[("fuel_lvl", 55.0)]),
            message(mins_ago(2), Some(35.0), &[("fuel_lvl", 56.0)]),
        ];
        let unit = Enricher::default().enrich(
            raw_unit(7, "KA-MH12AB1234 truck"),
            &[fuel()],
            &messages,
            now(),
        );
        assert!(unit.is_online);
        assert_eq!(unit.status, UnitStatus::Moving);
        assert_eq!(unit.speed, Some(40.0));
        assert_eq!(unit.fuel_level, Some(55.0));
        assert_eq!(unit.last_seen, Some(mins_ago(1)));
        assert_eq!(unit.current_position.unwrap().time, mins_ago(1));
        assert_eq!(unit.classification.vehicle_type.as_deref(), Some("truck"));
    }

    #[test]
    fn own_position_wins_over_messages() {
        let mut raw = raw_unit(3, "van");
        raw.position = Some(position(mins_ago(10), Some(0.0)));
        let messages = [message(mins_ago(12), Some(20.0), &[])];
        let unit = Enricher::default().enrich(raw, &[], &messages, now());

        assert_eq!(unit.current_position.unwrap().time, mins_ago(10));
        // Speed comes from messages first.
        assert_eq!(unit.speed, Some(20.0));
        assert_eq!(unit.status, UnitStatus::Moving);
    }

    #[test]
    fn stale_unit_is_offline_even_when_fast() {
        let mut raw = raw_unit(3, "bus");
        raw.position = Some(position(mins_ago(20), Some(60.0)));
        let unit = Enricher::default().enrich(raw, &[], &[], now());
        assert!(!unit.is_online);
        assert_eq!(unit.status, UnitStatus::Offline);
    }

    #[test]
    fn recent_message_without_position_keeps_stale_status() {
        let mut raw = raw_unit(4, "KA-MH12AB1234 truck");
        raw.position = Some(position(mins_ago(20), Some(0.0)));
        let messages = [message(mins_ago(1), None, &[("fuel_lvl", 40.0)])];
        let unit = Enricher::default().enrich(raw, &[fuel()], &messages, now());

        assert!(unit.is_online);
        assert_eq!(unit.status, UnitStatus::Offline);
        assert_eq!(unit.last_seen, Some(mins_ago(1)));
        assert_eq!(unit.fuel_level, Some(40.0));
    }

    #[test]
    fn readings_keyed_by_sensor_id_or_parameter() {
        let messages = [
            message(mins_ago(1), None, &[("other", 1.0)]),
            message(mins_ago(2), None, &[("2", 1234.5)]),
            message(mins_ago(3), None, &[("eng_h", 1000.0), ("fuel_lvl", 12.0)]),
        ];
        let unit = Enricher::default().enrich(
            raw_unit(1, "x"),
            &[fuel(), hours()],
            &messages,
            now(),
        );
        assert_eq!(unit.engine_hours, Some(1234.5));
        assert_eq!(unit.fuel_level, Some(12.0));
    }

    #[test]
    fn last_message_is_consulted_after_history() {
        let mut raw = raw_unit(1, "x");
        raw.last_message = Some(message(mins_ago(30), Some(0.0), &[("fuel_lvl", 80.0)]));
        let unit = Enricher::default().enrich(raw, &[fuel()], &[], now());
        assert_eq!(unit.fuel_level, Some(80.0));
        assert_eq!(unit.last_seen, Some(mins_ago(30)));
        assert!(unit.current_position.is_some());
    }

    #[test]
    fn calibration_applied_to_readings() {
        let sensor = calibrated(fuel(), &[(0.0, 0.5, 0.0), (100.0, 0.25, 25.0)]);
        let messages = [message(mins_ago(1), None, &[("fuel_lvl", 200.0)])];
        let unit = Enricher::default().enrich(raw_unit(1, "x"), &[sensor], &messages, now());
        assert_eq!(unit.fuel_level, Some(75.0));
    }

    #[test]
    fn calibration_rows() {
        let table = [
            CalibrationPoint { x: 10.0, a: 2.0, b: 1.0 },
            CalibrationPoint { x: 50.0, a: 1.0, b: 0.0 },
        ];
        assert_eq!(calibrate(&[], 42.0), 42.0);
        assert_eq!(calibrate(&table, 20.0), 41.0);
        assert_eq!(calibrate(&table, 50.0), 50.0);
        // Below the first row extrapolates from it.
        assert_eq!(calibrate(&table, 5.0), 11.0);
    }

    #[test]
    fn generic_engine_sensor_is_fallback_for_hours() {
        let engine = sensor(5, "Engine", "engine operation", "eng");
        let fuel_rate = sensor(6, "Engine fuel rate", "fuel consumption", "rate");
        assert_eq!(
            engine_hours_sensor(&[fuel_rate.clone(), engine.clone()]).map(|s| s.id),
            Some(5)
        );
        assert_eq!(engine_hours_sensor(&[fuel_rate, engine, hours()]).map(|s| s.id), Some(2));
    }

    #[test]
    fn custom_classifier_is_used() {
        #[derive(Debug)]
        struct Fixed;
        impl UnitClassifier for Fixed {
            fn classify(&self, _unit: &RawUnit) -> fleetlink_core::types::Classification {
                fleetlink_core::types::Classification {
                    connectivity: Connectivity::ExternalSim,
                    ..Default::default()
                }
            }
        }
        let enricher = Enricher::new(StatusThresholds::default(), Arc::new(Fixed));
        let unit = enricher.enrich(raw_unit(1, "KA-truck int sim"), &[], &[], now());
        assert_eq!(unit.classification.connectivity, Connectivity::ExternalSim);
        assert!(unit.classification.vehicle_type.is_none());
    }

    proptest! {
        /// Property: enrichment is a pure function of its inputs.
        #[test]
        fn prop_enrichment_is_deterministic(
            age_secs in 0i64..7200,
            speed in proptest::option::of(0.0f64..150.0),
            fuel_reading in 0.0f64..500.0,
            name in "[A-Z]{2}-[A-Z]{2}[0-9]{2}[A-Z]{2}[0-9]{4} (truck|bus|van|car)( int sim| ext sim)?",
        ) {
            let seen = now() - TimeDelta::seconds(age_secs);
            let mut raw = raw_unit(9, &name);
            raw.position = Some(position(seen, speed));
            let messages = [message(seen, speed, &[("fuel_lvl", fuel_reading)])];
            let enricher = Enricher::default();

            let a = enricher.enrich(raw.clone(), &[fuel()], &messages, now());
            let b = enricher.enrich(raw, &[fuel()], &messages, now());
            prop_assert_eq!(a, b);
        }

        /// Property: with only a position, a unit is online exactly when its
        /// status is not offline.
        #[test]
        fn prop_online_iff_not_offline(
            age_secs in 0i64..7200,
            speed in 0.0f64..150.0,
        ) {
            let mut raw = raw_unit(9, "unit");
            raw.position = Some(position(now() - TimeDelta::seconds(age_secs), Some(speed)));
            let unit = Enricher::default().enrich(raw, &[], &[], now());

            prop_assert_eq!(unit.is_online, unit.status != UnitStatus::Offline);
            prop_assert_eq!(unit.is_online, age_secs <= 15 * 60);
        }

        /// Property: any status other than offline implies the unit is online.
        #[test]
        fn prop_active_status_implies_online(
            position_age in 0i64..7200,
            message_age in 0i64..7200,
            message_speed in proptest::option::of(0.0f64..150.0),
        ) {
            let mut raw = raw_unit(9, "unit");
            raw.position = Some(position(now() - TimeDelta::seconds(position_age), Some(0.0)));
            let messages = [message(now() - TimeDelta::seconds(message_age), message_speed, &[])];
            let unit = Enricher::default().enrich(raw, &[], &messages, now());

            prop_assert!(unit.status == UnitStatus::Offline || unit.is_online);
            prop_assert_eq!(unit.status == UnitStatus::Offline, position_age > 15 * 60);
        }
    }
}
