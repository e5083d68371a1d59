// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for platform wire JSON and domain records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleetlink_core::types::{CalibrationPoint, Position, RawUnit, Sensor, TelemetryMessage};
use fleetlink_core::ItemId;
use serde_json::{Value, json};

// --- Wire JSON ---

/// A `core/search_items` reply wrapping `items`.
pub fn search_reply(items: Vec<Value>) -> Value {
    json!({ "totalItemsCount": items.len(), "items": items })
}

/// A `core/search_item` reply wrapping one item.
pub fn item_reply(item: Value) -> Value {
    json!({ "item": item })
}

/// A wire position at `time` with the given speed.
pub fn position_json(time: DateTime<Utc>, speed: f64) -> Value {
    json!({
        "t": time.timestamp(),
        "y": 12.97,
        "x": 77.59,
        "z": 920.0,
        "s": speed,
        "c": 180.0,
        "sc": 8
    })
}

/// A wire unit whose last position is at `time` with the given speed.
pub fn unit_json(id: ItemId, name: &str, time: DateTime<Utc>, speed: f64) -> Value {
    json!({
        "id": id,
        "nm": name,
        "pos": position_json(time, speed),
        "uacl": 0x1f,
        "hw": 11
    })
}

/// A wire unit that never reported a position.
pub fn silent_unit_json(id: ItemId, name: &str) -> Value {
    json!({ "id": id, "nm": name })
}

/// A wire unit carrying fuel and engine-hour sensors (ids 1 and 2).
pub fn unit_with_sensors_json(id: ItemId, name: &str) -> Value {
    json!({
        "id": id,
        "nm": name,
        "sens": {
            "1": {"id": 1, "n": "Fuel tank", "t": "fuel level", "m": "l", "p": "fuel_lvl"},
            "2": {"id": 2, "n": "Engine hours", "t": "engine hours", "m": "h", "p": "eng_h"}
        }
    })
}

/// A wire message at `time`, with a position when `speed` is given.
pub fn message_json(time: DateTime<Utc>, speed: Option<f64>, params: &[(&str, f64)]) -> Value {
    let params: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| ((*k).to_string(), json!(v)))
        .collect();
    let mut msg = json!({ "t": time.timestamp(), "tp": "ud", "p": params });
    if let Some(speed) = speed {
        msg["pos"] = position_json(time, speed);
    }
    msg
}

/// A wire user.
pub fn user_json(id: ItemId, name: &str) -> Value {
    json!({ "id": id, "nm": name })
}

/// A wire resource with one report template (id 1).
pub fn resource_json(id: ItemId, name: &str) -> Value {
    json!({
        "id": id,
        "nm": name,
        "rep": { "1": {"id": 1, "n": "Trips", "ct": "avl_unit"} }
    })
}

/// A wire unit group.
pub fn group_json(id: ItemId, name: &str, units: &[ItemId]) -> Value {
    json!({ "id": id, "nm": name, "u": units })
}

// --- Domain records ---

pub fn position(time: DateTime<Utc>, speed: Option<f64>) -> Position {
    Position {
        time,
        lat: 12.97,
        lon: 77.59,
        altitude: 920.0,
        satellites: 8,
        speed,
        course: 180.0,
    }
}

/// A raw unit with no position, messages or sensors.
pub fn raw_unit(id: ItemId, name: &str) -> RawUnit {
    RawUnit {
        id,
        name: name.to_string(),
        position: None,
        last_message: None,
        sensors: Vec::new(),
        custom_fields: BTreeMap::new(),
        profile_fields: BTreeMap::new(),
        admin_fields: BTreeMap::new(),
        access_level: 0,
        hardware_type: None,
    }
}

/// A sensor reading `parameter` with an empty calibration table.
pub fn sensor(id: u64, name: &str, kind: &str, parameter: &str) -> Sensor {
    Sensor {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        measure: String::new(),
        parameter: Some(parameter.to_string()),
        calibration: Vec::new(),
    }
}

/// Adds calibration rows `(x, a, b)` to a sensor.
pub fn calibrated(mut sensor: Sensor, rows: &[(f64, f64, f64)]) -> Sensor {
    sensor.calibration = rows
        .iter()
        .map(|&(x, a, b)| CalibrationPoint { x, a, b })
        .collect();
    sensor
}

/// A message at `time`, with a position when `speed` is given.
pub fn message(time: DateTime<Utc>, speed: Option<f64>, params: &[(&str, f64)]) -> TelemetryMessage {
    TelemetryMessage {
        time,
        kind: "ud".to_string(),
        position: speed.map(|s| position(time, Some(s))),
        params: params.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
    }
}
