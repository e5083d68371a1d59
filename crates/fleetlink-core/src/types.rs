// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model shared by every Fleetlink crate.
//!
//! Raw platform records ([`RawUnit`], [`Sensor`], [`TelemetryMessage`]) are
//! validated snapshots produced by the client crate. Derived records
//! ([`EnrichedUnit`], [`FleetStatusSnapshot`]) are produced by the enrichment
//! pipeline and the data manager and are never mutated in place.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform-wide item identifier.
pub type ItemId = u64;

// --- Raw platform records ---

/// A position fix as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Time of the fix.
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// Altitude in meters.
    pub altitude: f64,
    pub satellites: u32,
    /// Speed in the unit's configured speed measure. `None` if not reported.
    pub speed: Option<f64>,
    /// Course in degrees.
    pub course: f64,
}

/// One row of a sensor calibration table.
///
/// Readings at or above `x` (and below the next row's `x`) convert to
/// `a * reading + b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub x: f64,
    pub a: f64,
    pub b: f64,
}

/// A sensor descriptor attached to a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: u64,
    pub name: String,
    /// Sensor type tag (e.g. "fuel level", "engine hours").
    pub kind: String,
    /// Measurement unit label (e.g. "l", "h").
    pub measure: String,
    /// Name of the message parameter this sensor reads, if configured.
    pub parameter: Option<String>,
    /// Ordered calibration table. Empty means readings are used as-is.
    pub calibration: Vec<CalibrationPoint>,
}

/// A telemetry message from a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub time: DateTime<Utc>,
    /// Message type tag (e.g. "ud" for a data message).
    pub kind: String,
    pub position: Option<Position>,
    /// Parameter readings keyed by sensor id or parameter name.
    pub params: BTreeMap<String, f64>,
}

/// A tracked vehicle as delivered by the platform, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUnit {
    pub id: ItemId,
    pub name: String,
    pub position: Option<Position>,
    pub last_message: Option<TelemetryMessage>,
    pub sensors: Vec<Sensor>,
    pub custom_fields: BTreeMap<String, String>,
    pub profile_fields: BTreeMap<String, String>,
    pub admin_fields: BTreeMap<String, String>,
    /// Access-control bitmask granted to the current user.
    pub access_level: u64,
    /// Hardware (device) type id, if known.
    pub hardware_type: Option<ItemId>,
}

// --- Derived unit records ---

/// Derived movement/connectivity status of a unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnitStatus {
    Online,
    Offline,
    Idle,
    Moving,
}

/// How a unit's tracker connects to the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Connectivity {
    /// Tracker uses a SIM provisioned by the fleet operator.
    InternalSim,
    /// Tracker uses a customer-supplied SIM.
    ExternalSim,
    #[default]
    Unknown,
}

/// Best-effort classification derived from naming conventions.
///
/// Every field is a heuristic guess; `None` means the name carried no signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub fleet_id: Option<String>,
    pub registration: Option<String>,
    pub vehicle_type: Option<String>,
    pub connectivity: Connectivity,
    pub is_demo: bool,
}

/// A unit together with every field the dashboard derives from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedUnit {
    pub raw: RawUnit,
    pub is_online: bool,
    pub status: UnitStatus,
    pub current_position: Option<Position>,
    pub fuel_level: Option<f64>,
    pub speed: Option<f64>,
    pub engine_hours: Option<f64>,
    pub classification: Classification,
    /// Newest of the position time and newest message time.
    pub last_seen: Option<DateTime<Utc>>,
    pub access_level: u64,
}

impl EnrichedUnit {
    pub fn id(&self) -> ItemId {
        self.raw.id
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }
}

/// Aggregate fleet counts recomputed from the unit cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStatusSnapshot {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub moving: usize,
    pub idle: usize,
    /// Unit count per vehicle category.
    pub categories: BTreeMap<String, usize>,
    pub last_update: DateTime<Utc>,
}

impl FleetStatusSnapshot {
    /// Category used for units whose vehicle type could not be classified.
    pub const UNCLASSIFIED: &'static str = "unclassified";

    /// Computes fleet counts over the given units.
    pub fn from_units<'a, I>(units: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a EnrichedUnit>,
    {
        let mut snapshot = FleetStatusSnapshot {
            total: 0,
            online: 0,
            offline: 0,
            moving: 0,
            idle: 0,
            categories: BTreeMap::new(),
            last_update: now,
        };

        for unit in units {
            snapshot.total += 1;
            if unit.is_online {
                snapshot.online += 1;
            } else {
                snapshot.offline += 1;
            }
            match unit.status {
                UnitStatus::Moving => snapshot.moving += 1,
                UnitStatus::Idle => snapshot.idle += 1,
                UnitStatus::Online | UnitStatus::Offline => {}
            }
            let category = unit
                .classification
                .vehicle_type
                .clone()
                .unwrap_or_else(|| Self::UNCLASSIFIED.to_string());
            *snapshot.categories.entry(category).or_insert(0) += 1;
        }

        snapshot
    }
}

// --- Directory records carried by the system snapshot ---

/// A platform user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: ItemId,
    pub name: String,
}

/// A report template stored on a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub id: u64,
    pub name: String,
    /// Object type the template runs against (e.g. "avl_unit").
    pub kind: String,
}

/// A platform resource (container for report templates, geofences, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ItemId,
    pub name: String,
    pub report_templates: Vec<ReportTemplate>,
}

/// A named group of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitGroup {
    pub id: ItemId,
    pub name: String,
    pub unit_ids: Vec<ItemId>,
}

/// A tracker hardware type known to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareType {
    pub id: ItemId,
    pub name: String,
}

/// The coarse-grained cache root: everything fetched by `initialize`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub units: Vec<Arc<EnrichedUnit>>,
    pub users: Vec<UserRecord>,
    pub resources: Vec<ResourceRecord>,
    pub groups: Vec<UnitGroup>,
    pub hardware: Vec<HardwareType>,
    pub fetched_at: DateTime<Utc>,
}

// --- Session ---

/// Result of opening a session with the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub user: UserRecord,
    /// Feature flags granted to the account.
    pub features: BTreeMap<String, serde_json::Value>,
}

// --- Batch ---

/// A single remote call inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub service: String,
    pub params: serde_json::Value,
}

impl Command {
    pub fn new(service: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            service: service.into(),
            params,
        }
    }
}

// --- Reports ---

/// Time interval a report is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInterval {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Platform interval flags (0 = absolute range).
    pub flags: u32,
}

/// A report execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportJob {
    pub template_id: u64,
    pub resource_id: ItemId,
    pub object_id: Option<ItemId>,
    pub interval: ReportInterval,
    /// Whether the platform executes the job asynchronously.
    pub remote: bool,
}

/// One row of a report table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub cells: Vec<serde_json::Value>,
}

/// A table produced by a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub name: String,
    pub label: String,
    pub header: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub total: Vec<String>,
}

/// A chart produced by a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportChart {
    pub name: String,
    pub kind: String,
}

/// Assembled output of a report job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub tables: Vec<ReportTable>,
    pub charts: Vec<ReportChart>,
}
