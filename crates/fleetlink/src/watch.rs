// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fleetlink watch`: keep the data manager running and stream its events.
//!
//! Fleet status and unit list updates are written to stdout as one JSON
//! object per line until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use fleetlink_core::FleetError;
use fleetlink_manager::{DataManager, FleetEvent, Topic};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::shutdown;

const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(15);

/// Runs the watch loop until a shutdown signal arrives.
pub async fn run_watch(manager: Arc<DataManager>, print_metrics: bool) -> Result<(), FleetError> {
    #[cfg(feature = "prometheus")]
    let prometheus = fleetlink_prometheus::PrometheusAdapter::new()?;
    #[cfg(not(feature = "prometheus"))]
    let _ = print_metrics;

    let cancel = shutdown::install_signal_handler();

    for topic in [Topic::FleetStatus, Topic::Units] {
        manager.subscribe(topic, |event| {
            println!("{}", event_line(event)?);
            Ok(())
        });
    }

    if let Err(e) = manager.initialize().await {
        cancel.cancel();
        manager.cleanup().await;
        return Err(e);
    }
    info!(polling = manager.is_polling(), "watching fleet");

    #[cfg(not(target_env = "msvc"))]
    {
        let mem_cancel = cancel.clone();
        tokio::spawn(async move {
            memory_monitor(mem_cancel).await;
        });
    }

    cancel.cancelled().await;
    manager.cleanup().await;

    #[cfg(feature = "prometheus")]
    if print_metrics {
        print!("{}", prometheus.render());
    }

    info!("watch stopped");
    Ok(())
}

/// Encodes one event as a single JSON line tagged with its topic.
fn event_line(event: &FleetEvent) -> Result<String, FleetError> {
    let data = match event {
        FleetEvent::FleetStatus(status) => serde_json::to_value(status.as_ref()),
        FleetEvent::Units(units) => serde_json::to_value(units.as_ref()),
        FleetEvent::UnitDetails(unit) => serde_json::to_value(unit.as_ref()),
    }
    .map_err(|e| FleetError::Internal(format!("failed to encode event: {e}")))?;

    let line: Value = json!({
        "topic": event.topic().to_string(),
        "data": data,
    });
    Ok(line.to_string())
}

/// Samples jemalloc heap statistics into the memory gauges.
#[cfg(not(target_env = "msvc"))]
async fn memory_monitor(cancel: CancellationToken) {
    let mut interval = tokio::time::interval(MEMORY_SAMPLE_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Stats are cached until the epoch advances.
                let _ = tikv_jemalloc_ctl::epoch::advance();
                let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
                let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);

                #[cfg(feature = "prometheus")]
                {
                    fleetlink_prometheus::set_memory_heap(allocated as f64);
                    fleetlink_prometheus::set_memory_resident(resident as f64);
                }

                debug!(allocated, resident, "memory sample");
            }
            _ = cancel.cancelled() => {
                debug!("memory monitor shutting down");
                break;
            }
        }
    }
}
