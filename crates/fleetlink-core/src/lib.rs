// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fleetlink telemetry data manager.
//!
//! This crate provides the error type, the domain model, the injectable
//! clock, and the [`RemoteClient`] trait every platform transport implements.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::FleetError;
pub use traits::RemoteClient;
pub use types::{
    EnrichedUnit, FleetStatusSnapshot, ItemId, RawUnit, Sensor, TelemetryMessage, UnitStatus,
};
