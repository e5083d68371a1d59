// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enrichment pipeline for Fleetlink.
//!
//! Turns a raw unit, its sensors and its recent messages into an
//! [`EnrichedUnit`](fleetlink_core::EnrichedUnit). Everything here is a pure
//! function of its inputs and an explicit `now`; no I/O, no clock reads.

pub mod classifier;
pub mod pipeline;
pub mod status;

pub use classifier::{NamingConventionClassifier, UnitClassifier};
pub use pipeline::Enricher;
pub use status::{StatusThresholds, derive_status};
