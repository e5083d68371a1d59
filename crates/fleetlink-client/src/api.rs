// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed platform calls over any [`RemoteClient`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetlink_core::types::{
    Command, HardwareType, RawUnit, ReportChart, ReportJob, ReportRow, ResourceRecord, Sensor,
    TelemetryMessage, UnitGroup, UserRecord,
};
use fleetlink_core::{FleetError, ItemId, RemoteClient};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::flags::{self, data, items, report_status};
use crate::wire::{
    ExecReportResponse, ItemResponse, LoadIntervalResponse, ReportStatusResponse, SearchResponse,
    WireGroup, WireHardware, WireMessage, WireReportResult, WireReportTable, WireResource, WireRow,
    WireUnit, WireUser,
};

pub const SEARCH_ITEMS: &str = "core/search_items";
pub const SEARCH_ITEM: &str = "core/search_item";
pub const GET_HW_TYPES: &str = "core/get_hw_types";
pub const BATCH: &str = "core/batch";
pub const LOAD_INTERVAL: &str = "messages/load_interval";
pub const GET_MESSAGES: &str = "messages/get_messages";
pub const UNLOAD_MESSAGES: &str = "messages/unload";
pub const EXEC_REPORT: &str = "report/exec_report";
pub const REPORT_STATUS: &str = "report/get_report_status";
pub const APPLY_REPORT_RESULT: &str = "report/apply_report_result";
pub const SELECT_RESULT_ROWS: &str = "report/select_result_rows";
pub const CLEANUP_RESULT: &str = "report/cleanup_result";

/// Server-side state of a remote report job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    /// Queued or running; carries the raw status code.
    Pending(u32),
    Completed,
    /// Canceled or invalid; carries the server message when one was sent.
    Failed(Option<String>),
}

/// Tables and charts of the active report result, before rows are fetched.
#[derive(Debug, Clone, Default)]
pub struct ReportLayout {
    pub tables: Vec<WireReportTable>,
    pub charts: Vec<ReportChart>,
}

impl From<WireReportResult> for ReportLayout {
    fn from(r: WireReportResult) -> Self {
        ReportLayout {
            tables: r.tables,
            charts: r.attachments.into_iter().map(ReportChart::from).collect(),
        }
    }
}

fn invalid(service: &str, message: impl std::fmt::Display) -> FleetError {
    FleetError::InvalidResponse {
        service: service.to_string(),
        message: message.to_string(),
    }
}

fn decode<T: DeserializeOwned>(service: &str, value: Value) -> Result<T, FleetError> {
    serde_json::from_value(value).map_err(|e| invalid(service, e))
}

/// Builds a `core/search_items` command listing every item of a type.
pub fn search_command(items_type: &str, flags: u64) -> Command {
    Command::new(
        SEARCH_ITEMS,
        json!({
            "spec": {
                "itemsType": items_type,
                "propName": "sys_name",
                "propValueMask": "*",
                "sortType": "sys_name"
            },
            "force": 1,
            "flags": flags,
            "from": 0,
            "to": 0
        }),
    )
}

/// Builds the `core/get_hw_types` command.
pub fn hardware_command() -> Command {
    Command::new(
        GET_HW_TYPES,
        json!({ "filterType": "", "filterValue": [], "includeType": false }),
    )
}

/// Decodes a unit search reply, dropping units that fail validation.
pub fn parse_units(value: Value) -> Result<Vec<RawUnit>, FleetError> {
    let reply: SearchResponse<WireUnit> = decode(SEARCH_ITEMS, value)?;
    let units = reply
        .items
        .into_iter()
        .filter_map(|wire| match RawUnit::try_from(wire) {
            Ok(unit) => Some(unit),
            Err(e) => {
                warn!(error = %e, "dropping invalid unit from search reply");
                None
            }
        })
        .collect();
    Ok(units)
}

pub fn parse_users(value: Value) -> Result<Vec<UserRecord>, FleetError> {
    let reply: SearchResponse<WireUser> = decode(SEARCH_ITEMS, value)?;
    Ok(reply.items.into_iter().map(UserRecord::from).collect())
}

pub fn parse_resources(value: Value) -> Result<Vec<ResourceRecord>, FleetError> {
    let reply: SearchResponse<WireResource> = decode(SEARCH_ITEMS, value)?;
    Ok(reply.items.into_iter().map(ResourceRecord::from).collect())
}

pub fn parse_groups(value: Value) -> Result<Vec<UnitGroup>, FleetError> {
    let reply: SearchResponse<WireGroup> = decode(SEARCH_ITEMS, value)?;
    Ok(reply.items.into_iter().map(UnitGroup::from).collect())
}

pub fn parse_hardware(value: Value) -> Result<Vec<HardwareType>, FleetError> {
    let reply: Vec<WireHardware> = decode(GET_HW_TYPES, value)?;
    Ok(reply.into_iter().map(HardwareType::from).collect())
}

/// Typed wrappers around the platform services Fleetlink uses.
#[derive(Clone)]
pub struct PlatformApi {
    remote: Arc<dyn RemoteClient>,
}

impl std::fmt::Debug for PlatformApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformApi")
            .field("remote", &self.remote.name())
            .finish()
    }
}

impl PlatformApi {
    pub fn new(remote: Arc<dyn RemoteClient>) -> Self {
        Self { remote }
    }

    /// The underlying remote client.
    pub fn remote(&self) -> &Arc<dyn RemoteClient> {
        &self.remote
    }

    async fn run(&self, command: Command) -> Result<Value, FleetError> {
        debug!(service = %command.service, remote = self.remote.name(), "platform call");
        self.remote.call(&command.service, command.params).await
    }

    // --- Search ---

    pub async fn units(&self) -> Result<Vec<RawUnit>, FleetError> {
        parse_units(
            self.run(search_command(items::UNIT, data::UNIT_SNAPSHOT))
                .await?,
        )
    }

    pub async fn users(&self) -> Result<Vec<UserRecord>, FleetError> {
        parse_users(self.run(search_command(items::USER, data::BASE)).await?)
    }

    pub async fn resources(&self) -> Result<Vec<ResourceRecord>, FleetError> {
        parse_resources(
            self.run(search_command(
                items::RESOURCE,
                data::BASE | data::REPORT_TEMPLATES,
            ))
            .await?,
        )
    }

    async fn search_item(&self, id: ItemId, flags: u64) -> Result<WireUnit, FleetError> {
        let reply = self
            .run(Command::new(SEARCH_ITEM, json!({ "id": id, "flags": flags })))
            .await?;
        let reply: ItemResponse<WireUnit> = decode(SEARCH_ITEM, reply)?;
        reply.item.ok_or(FleetError::NotFound { kind: "unit", id })
    }

    /// One unit with its snapshot properties.
    pub async fn unit(&self, id: ItemId) -> Result<RawUnit, FleetError> {
        let wire = self.search_item(id, data::UNIT_SNAPSHOT).await?;
        RawUnit::try_from(wire).map_err(|e| invalid(SEARCH_ITEM, e))
    }

    /// Sensor descriptors of one unit, ordered by id.
    pub async fn unit_sensors(&self, id: ItemId) -> Result<Vec<Sensor>, FleetError> {
        let wire = self.search_item(id, data::BASE | data::SENSORS).await?;
        Ok(wire.sensors())
    }

    // --- Batch ---

    /// Sends commands as one `core/batch` round trip and returns the raw
    /// per-command replies in order.
    pub async fn batch(&self, commands: &[Command], flags: u32) -> Result<Vec<Value>, FleetError> {
        let params: Vec<Value> = commands
            .iter()
            .map(|c| json!({ "svc": c.service, "params": c.params }))
            .collect();
        let reply = self
            .run(Command::new(BATCH, json!({ "params": params, "flags": flags })))
            .await?;
        match reply {
            Value::Array(replies) => Ok(replies),
            other => Err(invalid(BATCH, format!("expected an array, got {other}"))),
        }
    }

    // --- Messages ---

    /// Loads a unit's messages for `[from, to]` into the session and returns
    /// how many were loaded.
    pub async fn load_interval(
        &self,
        unit_id: ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, FleetError> {
        let reply = self
            .run(Command::new(
                LOAD_INTERVAL,
                json!({
                    "itemId": unit_id,
                    "timeFrom": from.timestamp(),
                    "timeTo": to.timestamp(),
                    "flags": flags::MESSAGES_ALL,
                    "flagsMask": flags::MESSAGES_ALL_MASK,
                    "loadCount": 0
                }),
            ))
            .await?;
        let reply: LoadIntervalResponse = decode(LOAD_INTERVAL, reply)?;
        Ok(reply.count)
    }

    /// Returns loaded messages `index_from..=index_to`, oldest first.
    pub async fn get_messages(
        &self,
        index_from: u64,
        index_to: u64,
    ) -> Result<Vec<TelemetryMessage>, FleetError> {
        let reply = self
            .run(Command::new(
                GET_MESSAGES,
                json!({ "indexFrom": index_from, "indexTo": index_to }),
            ))
            .await?;
        let wire: Vec<WireMessage> = decode(GET_MESSAGES, reply)?;
        wire.into_iter()
            .map(|m| TelemetryMessage::try_from(m).map_err(|e| invalid(GET_MESSAGES, e)))
            .collect()
    }

    /// Releases the session's loaded message buffer.
    pub async fn unload_messages(&self) -> Result<(), FleetError> {
        self.run(Command::new(UNLOAD_MESSAGES, json!({}))).await?;
        Ok(())
    }

    // --- Reports ---

    /// Submits a report job. Synchronous runs return their layout directly.
    pub async fn exec_report(&self, job: &ReportJob) -> Result<Option<ReportLayout>, FleetError> {
        let reply = self
            .run(Command::new(
                EXEC_REPORT,
                json!({
                    "reportResourceId": job.resource_id,
                    "reportTemplateId": job.template_id,
                    "reportObjectId": job.object_id.unwrap_or(0),
                    "reportObjectSecId": 0,
                    "interval": {
                        "from": job.interval.from.timestamp(),
                        "to": job.interval.to.timestamp(),
                        "flags": job.interval.flags
                    },
                    "remoteExec": u8::from(job.remote)
                }),
            ))
            .await?;
        if job.remote {
            return Ok(None);
        }
        let reply: ExecReportResponse = decode(EXEC_REPORT, reply)?;
        Ok(reply.report_result.map(ReportLayout::from))
    }

    pub async fn report_status(&self) -> Result<ReportStatus, FleetError> {
        let reply = self.run(Command::new(REPORT_STATUS, json!({}))).await?;
        let reply: ReportStatusResponse = decode(REPORT_STATUS, reply)?;
        match reply.code() {
            Some(report_status::QUEUED | report_status::RUNNING) => {
                Ok(ReportStatus::Pending(reply.code().unwrap_or_default()))
            }
            Some(report_status::COMPLETED) => Ok(ReportStatus::Completed),
            Some(report_status::CANCELED) => Ok(ReportStatus::Failed(
                reply.message.or_else(|| Some("report was canceled".into())),
            )),
            Some(report_status::INVALID) => Ok(ReportStatus::Failed(reply.message)),
            _ => Err(invalid(
                REPORT_STATUS,
                format!("unknown report status {}", reply.status),
            )),
        }
    }

    /// Makes the finished remote result active and returns its layout.
    pub async fn apply_report_result(&self) -> Result<ReportLayout, FleetError> {
        let reply = self.run(Command::new(APPLY_REPORT_RESULT, json!({}))).await?;
        let layout: WireReportResult = decode(APPLY_REPORT_RESULT, reply)?;
        Ok(layout.into())
    }

    /// Fetches the first `row_count` rows of a result table.
    pub async fn select_result_rows(
        &self,
        table_index: usize,
        row_count: u64,
    ) -> Result<Vec<ReportRow>, FleetError> {
        if row_count == 0 {
            return Ok(Vec::new());
        }
        let reply = self
            .run(Command::new(
                SELECT_RESULT_ROWS,
                json!({
                    "tableIndex": table_index,
                    "config": {
                        "type": "range",
                        "data": { "from": 0, "to": row_count - 1, "level": 0 }
                    }
                }),
            ))
            .await?;
        let rows: Vec<WireRow> = decode(SELECT_RESULT_ROWS, reply)?;
        Ok(rows.into_iter().map(ReportRow::from).collect())
    }

    /// Releases the session's report result.
    pub async fn cleanup_report(&self) -> Result<(), FleetError> {
        self.run(Command::new(CLEANUP_RESULT, json!({}))).await?;
        Ok(())
    }
}
