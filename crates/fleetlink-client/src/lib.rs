// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry platform adapter for Fleetlink.
//!
//! [`HttpRemote`] implements [`fleetlink_core::RemoteClient`] over the
//! platform's form-encoded JSON API. [`PlatformApi`] wraps any remote client
//! with typed calls that validate raw JSON into domain records at the
//! boundary.

pub mod api;
pub mod client;
pub mod flags;
pub mod wire;

pub use api::{PlatformApi, ReportLayout, ReportStatus};
pub use client::{HttpRemote, error_code};
