// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the telemetry platform's JSON payloads.
//!
//! The platform uses terse keys (`nm`, `pos`, `lmsg`, ...). Each wire struct
//! converts into its domain counterpart through `TryFrom`, rejecting payloads
//! that are structurally valid JSON but semantically impossible (timestamps
//! out of range, coordinates off the globe).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleetlink_core::types::{
    CalibrationPoint, HardwareType, Position, RawUnit, ReportChart, ReportRow, ReportTemplate,
    ResourceRecord, Sensor, TelemetryMessage, UnitGroup, UserRecord,
};
use serde::{Deserialize, Serialize};

/// A payload that deserialized but failed domain validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct WireError(pub String);

fn timestamp(secs: i64, what: &str) -> Result<DateTime<Utc>, WireError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| WireError(format!("{what} timestamp {secs} is out of range")))
}

/// Envelope for `core/search_items`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(rename = "totalItemsCount", default)]
    pub total_items_count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Envelope for `core/search_item`.
#[derive(Debug, Deserialize)]
pub struct ItemResponse<T> {
    pub item: Option<T>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WirePosition {
    pub t: i64,
    pub y: f64,
    pub x: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub s: Option<f64>,
    #[serde(default)]
    pub c: f64,
    #[serde(default)]
    pub sc: u32,
}

impl TryFrom<WirePosition> for Position {
    type Error = WireError;

    fn try_from(pos: WirePosition) -> Result<Self, Self::Error> {
        if !(-90.0..=90.0).contains(&pos.y) || !(-180.0..=180.0).contains(&pos.x) {
            return Err(WireError(format!(
                "position ({}, {}) is outside valid coordinates",
                pos.y, pos.x
            )));
        }
        Ok(Position {
            time: timestamp(pos.t, "position")?,
            lat: pos.y,
            lon: pos.x,
            altitude: pos.z,
            satellites: pos.sc,
            speed: pos.s.filter(|s| s.is_finite() && *s >= 0.0),
            course: pos.c,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireMessage {
    pub t: i64,
    #[serde(default)]
    pub tp: String,
    #[serde(default)]
    pub pos: Option<WirePosition>,
    #[serde(default)]
    pub p: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<WireMessage> for TelemetryMessage {
    type Error = WireError;

    fn try_from(msg: WireMessage) -> Result<Self, Self::Error> {
        // Text parameters carry no sensor reading.
        let params = msg
            .p
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k, n)))
            .collect();
        Ok(TelemetryMessage {
            time: timestamp(msg.t, "message")?,
            kind: msg.tp,
            position: msg.pos.map(Position::try_from).transpose()?,
            params,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireCalibration {
    pub x: f64,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireSensor {
    pub id: u64,
    #[serde(default)]
    pub n: String,
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub m: String,
    #[serde(default)]
    pub p: String,
    #[serde(default)]
    pub tbl: Vec<WireCalibration>,
}

impl From<WireSensor> for Sensor {
    fn from(s: WireSensor) -> Self {
        let mut calibration: Vec<CalibrationPoint> = s
            .tbl
            .into_iter()
            .filter(|row| row.x.is_finite() && row.a.is_finite() && row.b.is_finite())
            .map(|row| CalibrationPoint {
                x: row.x,
                a: row.a,
                b: row.b,
            })
            .collect();
        calibration.sort_by(|l, r| l.x.total_cmp(&r.x));
        let parameter = Some(s.p).filter(|p| !p.trim().is_empty());
        Sensor {
            id: s.id,
            name: s.n,
            kind: s.t,
            measure: s.m,
            parameter,
            calibration,
        }
    }
}

/// A custom, profile or admin field: `{id, n, v}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireField {
    #[serde(default)]
    pub id: u64,
    pub n: String,
    #[serde(default)]
    pub v: String,
}

fn field_map(fields: BTreeMap<String, WireField>) -> BTreeMap<String, String> {
    fields.into_values().map(|f| (f.n, f.v)).collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireUnit {
    pub id: u64,
    #[serde(default)]
    pub nm: String,
    #[serde(default)]
    pub pos: Option<WirePosition>,
    #[serde(default)]
    pub lmsg: Option<WireMessage>,
    #[serde(default)]
    pub sens: BTreeMap<String, WireSensor>,
    #[serde(default)]
    pub flds: BTreeMap<String, WireField>,
    #[serde(default)]
    pub pflds: BTreeMap<String, WireField>,
    #[serde(default)]
    pub aflds: BTreeMap<String, WireField>,
    #[serde(default)]
    pub uacl: u64,
    #[serde(default)]
    pub hw: Option<u64>,
}

impl WireUnit {
    /// Sensors ordered by id.
    pub fn sensors(&self) -> Vec<Sensor> {
        let mut sensors: Vec<Sensor> = self.sens.values().cloned().map(Sensor::from).collect();
        sensors.sort_by_key(|s| s.id);
        sensors
    }
}

impl TryFrom<WireUnit> for RawUnit {
    type Error = WireError;

    fn try_from(unit: WireUnit) -> Result<Self, Self::Error> {
        if unit.id == 0 {
            return Err(WireError("unit id must be non-zero".into()));
        }
        let id = unit.id;
        let sensors = unit.sensors();
        let context = move |e: WireError| WireError(format!("unit {id}: {e}"));
        Ok(RawUnit {
            id,
            position: unit.pos.map(Position::try_from).transpose().map_err(context)?,
            last_message: unit
                .lmsg
                .map(TelemetryMessage::try_from)
                .transpose()
                .map_err(context)?,
            sensors,
            custom_fields: field_map(unit.flds),
            profile_fields: field_map(unit.pflds),
            admin_fields: field_map(unit.aflds),
            access_level: unit.uacl,
            hardware_type: unit.hw.filter(|hw| *hw != 0),
            name: unit.nm,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireUser {
    pub id: u64,
    #[serde(default)]
    pub nm: String,
}

impl From<WireUser> for UserRecord {
    fn from(u: WireUser) -> Self {
        UserRecord { id: u.id, name: u.nm }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireTemplate {
    pub id: u64,
    #[serde(default)]
    pub n: String,
    #[serde(default)]
    pub ct: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireResource {
    pub id: u64,
    #[serde(default)]
    pub nm: String,
    #[serde(default)]
    pub rep: BTreeMap<String, WireTemplate>,
}

impl From<WireResource> for ResourceRecord {
    fn from(r: WireResource) -> Self {
        let mut report_templates: Vec<ReportTemplate> = r
            .rep
            .into_values()
            .map(|t| ReportTemplate {
                id: t.id,
                name: t.n,
                kind: t.ct,
            })
            .collect();
        report_templates.sort_by_key(|t| t.id);
        ResourceRecord {
            id: r.id,
            name: r.nm,
            report_templates,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireGroup {
    pub id: u64,
    #[serde(default)]
    pub nm: String,
    #[serde(default)]
    pub u: Vec<u64>,
}

impl From<WireGroup> for UnitGroup {
    fn from(g: WireGroup) -> Self {
        UnitGroup {
            id: g.id,
            name: g.nm,
            unit_ids: g.u,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireHardware {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

impl From<WireHardware> for HardwareType {
    fn from(h: WireHardware) -> Self {
        HardwareType {
            id: h.id,
            name: h.name,
        }
    }
}

/// Reply of `token/login`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub eid: String,
    pub user: WireUser,
    #[serde(default)]
    pub features: BTreeMap<String, serde_json::Value>,
}

/// Reply of `messages/load_interval`.
#[derive(Debug, Deserialize)]
pub struct LoadIntervalResponse {
    pub count: u64,
}

/// Reply of `report/get_report_status`. The platform sends the status as a
/// decimal string; numbers are accepted too.
#[derive(Debug, Deserialize)]
pub struct ReportStatusResponse {
    pub status: serde_json::Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl ReportStatusResponse {
    pub fn code(&self) -> Option<u32> {
        match &self.status {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireReportTable {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub header: Vec<String>,
    /// Row count; rows themselves come from `report/select_result_rows`.
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub total: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireAttachment {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl From<WireAttachment> for ReportChart {
    fn from(a: WireAttachment) -> Self {
        ReportChart {
            name: a.name,
            kind: a.kind,
        }
    }
}

/// Layout of an applied report result: `{tables, attachments}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WireReportResult {
    #[serde(default)]
    pub tables: Vec<WireReportTable>,
    #[serde(default)]
    pub attachments: Vec<WireAttachment>,
}

/// Reply of `report/exec_report`. Synchronous executions embed the result.
#[derive(Debug, Deserialize)]
pub struct ExecReportResponse {
    #[serde(rename = "reportResult", default)]
    pub report_result: Option<WireReportResult>,
}

/// One row from `report/select_result_rows`: `{c: [cells]}`.
#[derive(Debug, Deserialize)]
pub struct WireRow {
    #[serde(default)]
    pub c: Vec<serde_json::Value>,
}

impl From<WireRow> for ReportRow {
    fn from(r: WireRow) -> Self {
        ReportRow { cells: r.c }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_with_everything_converts() {
        let wire: WireUnit = serde_json::from_value(json!({
            "id": 42,
            "nm": "AB-KA01-truck",
            "pos": {"t": 1_700_000_000, "y": 12.9, "x": 77.6, "z": 900.0, "s": 35.0, "c": 90.0, "sc": 9},
            "lmsg": {"t": 1_700_000_010, "tp": "ud", "p": {"fuel": 41.5, "io_caps": "text"}},
            "sens": {
                "2": {"id": 2, "n": "Engine hours", "t": "engine hours", "m": "h", "p": "engine_hours"},
                "1": {"id": 1, "n": "Fuel", "t": "fuel level", "m": "l", "p": "fuel",
                      "tbl": [{"x": 10.0, "a": 2.0, "b": 0.0}, {"x": 0.0, "a": 1.0, "b": 0.0}]}
            },
            "flds": {"1": {"id": 1, "n": "depot", "v": "north"}},
            "uacl": 0x3f,
            "hw": 7
        }))
        .unwrap();

        let unit = RawUnit::try_from(wire).unwrap();
        assert_eq!(unit.id, 42);
        assert_eq!(unit.name, "AB-KA01-truck");
        let pos = unit.position.unwrap();
        assert_eq!(pos.satellites, 9);
        assert_eq!(pos.speed, Some(35.0));
        assert_eq!(unit.sensors.len(), 2);
        assert_eq!(unit.sensors[0].id, 1);
        assert_eq!(unit.sensors[0].calibration[0].x, 0.0);
        assert_eq!(unit.sensors[1].parameter.as_deref(), Some("engine_hours"));
        let lmsg = unit.last_message.unwrap();
        assert_eq!(lmsg.params.get("fuel"), Some(&41.5));
        assert!(!lmsg.params.contains_key("io_caps"));
        assert_eq!(unit.custom_fields.get("depot").map(String::as_str), Some("north"));
        assert_eq!(unit.access_level, 0x3f);
        assert_eq!(unit.hardware_type, Some(7));
    }

    #[test]
    fn bare_unit_converts_with_gaps() {
        let wire: WireUnit = serde_json::from_value(json!({"id": 5, "nm": "spare"})).unwrap();
        let unit = RawUnit::try_from(wire).unwrap();
        assert!(unit.position.is_none());
        assert!(unit.last_message.is_none());
        assert!(unit.sensors.is_empty());
        assert!(unit.hardware_type.is_none());
    }

    #[test]
    fn impossible_coordinates_are_rejected() {
        let wire: WireUnit = serde_json::from_value(json!({
            "id": 9, "nm": "lost",
            "pos": {"t": 1_700_000_000, "y": 123.0, "x": 10.0}
        }))
        .unwrap();
        let err = RawUnit::try_from(wire).unwrap_err();
        assert!(err.0.contains("unit 9"), "got: {err}");
    }

    #[test]
    fn blank_sensor_parameter_is_none() {
        let sensor = Sensor::from(WireSensor {
            id: 3,
            n: "Ignition".into(),
            t: "engine operation".into(),
            m: "On/Off".into(),
            p: "  ".into(),
            tbl: Vec::new(),
        });
        assert!(sensor.parameter.is_none());
    }

    #[test]
    fn report_status_accepts_string_or_number() {
        let s: ReportStatusResponse = serde_json::from_value(json!({"status": "4"})).unwrap();
        assert_eq!(s.code(), Some(4));
        let n: ReportStatusResponse = serde_json::from_value(json!({"status": 2})).unwrap();
        assert_eq!(n.code(), Some(2));
        let bad: ReportStatusResponse = serde_json::from_value(json!({"status": null})).unwrap();
        assert_eq!(bad.code(), None);
    }
}
