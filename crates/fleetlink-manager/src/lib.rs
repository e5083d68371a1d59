// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry data manager for Fleetlink.
//!
//! [`DataManager`] is the facade. The building blocks it composes are public
//! for callers that need them directly:
//! - [`BatchExecutor`]: many commands, one round trip, per-command results
//! - [`Poller`]: start/stop timer around a [`PollTask`]
//! - [`MessageLoader`]: recent messages with guaranteed buffer release
//! - [`ReportOrchestrator`]: submit, poll, assemble, release

pub mod batch;
pub mod manager;
pub mod messages;
pub mod poller;
pub mod report;

pub use batch::{BatchExecutor, BatchOutcome, CommandResult};
pub use fleetlink_bus::{FleetEvent, SubscriptionId, Topic};
pub use manager::DataManager;
pub use messages::MessageLoader;
pub use poller::{PollTask, Poller};
pub use report::ReportOrchestrator;
