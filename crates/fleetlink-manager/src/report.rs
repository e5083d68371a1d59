// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report orchestration.
//!
//! A report run is: release any previous result, submit the job, poll a
//! remote job until it reaches a terminal state, fetch table rows, and
//! release the server-side result. The release at the end happens on every
//! path, including failures and timeouts. The platform holds one report
//! result per session, so whole runs are serialized.

use std::sync::Arc;
use std::time::Duration;

use fleetlink_client::{PlatformApi, ReportLayout, ReportStatus};
use fleetlink_config::model::ReportsConfig;
use fleetlink_core::FleetError;
use fleetlink_core::types::{ReportJob, ReportResult, ReportTable};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ReportOrchestrator {
    api: PlatformApi,
    poll_interval: Duration,
    max_attempts: u32,
    row_limit: u64,
    active: Arc<Mutex<()>>,
}

impl ReportOrchestrator {
    pub fn new(api: PlatformApi, config: &ReportsConfig) -> Self {
        Self {
            api,
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts,
            row_limit: u64::from(config.row_limit),
            active: Arc::new(Mutex::new(())),
        }
    }

    /// Runs `job` to completion and returns its tables and charts.
    pub async fn execute(&self, job: &ReportJob) -> Result<ReportResult, FleetError> {
        let _active = self.active.lock().await;
        if let Err(e) = self.api.cleanup_report().await {
            debug!(error = %e, "no previous report result released");
        }

        info!(
            template_id = job.template_id,
            resource_id = job.resource_id,
            object_id = ?job.object_id,
            remote = job.remote,
            "executing report"
        );
        let result = self.run(job).await;

        if let Err(e) = self.api.cleanup_report().await {
            warn!(error = %e, "failed to release report result");
        }

        #[cfg(feature = "prometheus")]
        fleetlink_prometheus::record_report(match &result {
            Ok(_) => "completed",
            Err(FleetError::ReportFailed { .. }) => "failed",
            Err(FleetError::ReportTimeout { .. }) => "timeout",
            Err(_) => "error",
        });

        match &result {
            Ok(report) => info!(
                tables = report.tables.len(),
                charts = report.charts.len(),
                "report completed"
            ),
            Err(e) => warn!(error = %e, "report failed"),
        }
        result
    }

    async fn run(&self, job: &ReportJob) -> Result<ReportResult, FleetError> {
        let layout = match self.api.exec_report(job).await? {
            Some(layout) => layout,
            None => {
                if job.remote {
                    self.wait_for_completion().await?;
                }
                self.api.apply_report_result().await?
            }
        };
        self.assemble(layout).await
    }

    /// Polls the job status every `poll_interval`, at most `max_attempts` times.
    async fn wait_for_completion(&self) -> Result<(), FleetError> {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.poll_interval).await;
            match self.api.report_status().await? {
                ReportStatus::Completed => {
                    debug!(attempt, "report job completed");
                    return Ok(());
                }
                ReportStatus::Failed(message) => {
                    return Err(FleetError::ReportFailed {
                        message: message.unwrap_or_else(|| "report job failed".to_string()),
                    });
                }
                ReportStatus::Pending(code) => debug!(attempt, code, "report job pending"),
            }
        }

        Err(FleetError::ReportTimeout {
            attempts: self.max_attempts,
            waited: self.poll_interval * self.max_attempts,
        })
    }

    async fn assemble(&self, layout: ReportLayout) -> Result<ReportResult, FleetError> {
        let mut tables = Vec::with_capacity(layout.tables.len());
        for (index, table) in layout.tables.into_iter().enumerate() {
            let rows = self
                .api
                .select_result_rows(index, table.rows.min(self.row_limit))
                .await?;
            tables.push(ReportTable {
                name: table.name,
                label: table.label,
                header: table.header,
                rows,
                total: table.total,
            });
        }
        Ok(ReportResult {
            tables,
            charts: layout.charts,
        })
    }
}
