// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topics and the events published on them.

use std::sync::Arc;

use fleetlink_core::{EnrichedUnit, FleetStatusSnapshot};
use strum::{Display, EnumString};

/// Update channels a subscriber can listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
    /// The full unit list, after every snapshot refresh.
    Units,
    /// Recomputed fleet counts, after every poll tick.
    FleetStatus,
    /// One unit, after every detail fetch.
    UnitDetails,
}

/// A read-only projection handed to subscribers.
#[derive(Debug, Clone)]
pub enum FleetEvent {
    Units(Arc<[Arc<EnrichedUnit>]>),
    FleetStatus(Arc<FleetStatusSnapshot>),
    UnitDetails(Arc<EnrichedUnit>),
}

impl FleetEvent {
    /// The topic this event belongs on.
    pub fn topic(&self) -> Topic {
        match self {
            FleetEvent::Units(_) => Topic::Units,
            FleetEvent::FleetStatus(_) => Topic::FleetStatus,
            FleetEvent::UnitDetails(_) => Topic::UnitDetails,
        }
    }
}
