// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Fleetlink metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "fleetlink_remote_fetches_total",
        "Platform fetches issued by the data manager"
    );
    describe_counter!(
        "fleetlink_cache_lookups_total",
        "Cache lookups by cache and result"
    );
    describe_counter!("fleetlink_poll_ticks_total", "Poller ticks by outcome");
    describe_counter!(
        "fleetlink_batch_commands_total",
        "Batched commands by per-command result"
    );
    describe_counter!("fleetlink_reports_total", "Report executions by outcome");
    describe_gauge!("fleetlink_units_tracked", "Units in the current snapshot");
    describe_gauge!("fleetlink_memory_heap_bytes", "Allocated heap bytes");
    describe_gauge!("fleetlink_memory_resident_bytes", "Resident allocator bytes");
    describe_histogram!(
        "fleetlink_snapshot_refresh_seconds",
        "Duration of a full snapshot refresh"
    );
}

fn result_label(ok: bool) -> &'static str {
    if ok { "ok" } else { "error" }
}

/// Record one platform fetch made on behalf of `operation`.
pub fn record_remote_fetch(operation: &'static str, ok: bool) {
    metrics::counter!(
        "fleetlink_remote_fetches_total",
        "operation" => operation,
        "result" => result_label(ok)
    )
    .increment(1);
}

/// Record a cache lookup.
pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("fleetlink_cache_lookups_total", "cache" => cache, "result" => result)
        .increment(1);
}

/// Record a poller tick outcome (`ok`, `error`, `panic`).
pub fn record_poll_tick(outcome: &'static str) {
    metrics::counter!("fleetlink_poll_ticks_total", "outcome" => outcome).increment(1);
}

/// Record the per-command results of one batch.
pub fn record_batch_commands(succeeded: u64, failed: u64, unattempted: u64) {
    metrics::counter!("fleetlink_batch_commands_total", "result" => "success").increment(succeeded);
    metrics::counter!("fleetlink_batch_commands_total", "result" => "failed").increment(failed);
    metrics::counter!("fleetlink_batch_commands_total", "result" => "unattempted")
        .increment(unattempted);
}

/// Record a report outcome (`completed`, `failed`, `timeout`, `error`).
pub fn record_report(outcome: &'static str) {
    metrics::counter!("fleetlink_reports_total", "outcome" => outcome).increment(1);
}

pub fn set_units_tracked(count: f64) {
    metrics::gauge!("fleetlink_units_tracked").set(count);
}

pub fn set_memory_heap(bytes: f64) {
    metrics::gauge!("fleetlink_memory_heap_bytes").set(bytes);
}

pub fn set_memory_resident(bytes: f64) {
    metrics::gauge!("fleetlink_memory_resident_bytes").set(bytes);
}

/// Record how long a snapshot refresh took.
pub fn record_refresh_latency(seconds: f64) {
    metrics::histogram!("fleetlink_snapshot_refresh_seconds").record(seconds);
}
