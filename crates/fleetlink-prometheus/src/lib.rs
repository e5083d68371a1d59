// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for Fleetlink.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. The data manager
//! records through the helpers in [`recording`]; the binary renders the
//! collected metrics as Prometheus text.

pub mod recording;

use fleetlink_core::FleetError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub use recording::{
    record_batch_commands, record_cache_lookup, record_poll_tick, record_refresh_latency,
    record_remote_fetch, record_report, set_memory_heap, set_memory_resident, set_units_tracked,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl std::fmt::Debug for PrometheusAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusAdapter").finish_non_exhaustive()
    }
}

impl PrometheusAdapter {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, FleetError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            FleetError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
