// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic unit classification from display names.
//!
//! Workshop operators name units like `KA-MH12AB1234-Truck int sim`: a short
//! fleet prefix, the registration plate, then free text hinting at the
//! vehicle type, the SIM arrangement and whether the unit is a demo. The
//! bundled classifier reads those hints; every result is a best guess.

use fleetlink_core::types::{Classification, Connectivity};
use fleetlink_core::RawUnit;

/// Derives a [`Classification`] for a unit.
pub trait UnitClassifier: Send + Sync + 'static {
    fn classify(&self, unit: &RawUnit) -> Classification;
}

/// Vehicle type keywords (contains, case-insensitive), most specific first.
const VEHICLE_TYPES: &[(&str, &str)] = &[
    ("tanker", "tanker"),
    ("trailer", "trailer"),
    ("tipper", "truck"),
    ("truck", "truck"),
    ("lorry", "truck"),
    ("excavator", "excavator"),
    ("jcb", "excavator"),
    ("bus", "bus"),
    ("van", "van"),
    ("pickup", "pickup"),
    ("car", "car"),
    ("bike", "bike"),
    ("scooter", "bike"),
];

const INTERNAL_SIM: &[&str] = &["int sim", "internal sim", "int-sim"];
const EXTERNAL_SIM: &[&str] = &["ext sim", "external sim", "ext-sim"];
const DEMO_MARKERS: &[&str] = &["demo", "trial"];

/// Classifier for the `FLEET-REGISTRATION-notes` naming convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingConventionClassifier;

impl NamingConventionClassifier {
    pub fn new() -> Self {
        Self
    }

    /// A 2-3 character alphanumeric prefix followed by a dash.
    fn fleet_id(name: &str) -> Option<String> {
        let (prefix, rest) = name.split_once('-')?;
        let prefix = prefix.trim();
        let valid = (2..=3).contains(&prefix.len())
            && prefix.chars().all(|c| c.is_ascii_alphanumeric())
            && !rest.is_empty();
        valid.then(|| prefix.to_ascii_uppercase())
    }

    /// The first plate-like token: 4+ alphanumerics mixing letters and digits.
    fn registration(name: &str) -> Option<String> {
        name.split(|c: char| c == '-' || c.is_whitespace() || c == '_' || c == '/')
            .map(str::trim)
            .find(|token| {
                token.len() >= 4
                    && token.chars().all(|c| c.is_ascii_alphanumeric())
                    && token.chars().any(|c| c.is_ascii_digit())
                    && token.chars().any(|c| c.is_ascii_alphabetic())
            })
            .map(str::to_ascii_uppercase)
    }

    fn vehicle_type(lower: &str) -> Option<String> {
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        VEHICLE_TYPES
            .iter()
            .find(|(keyword, _)| words.iter().any(|w| w.starts_with(keyword)))
            .map(|(_, kind)| (*kind).to_string())
    }

    fn connectivity(lower: &str) -> Connectivity {
        if INTERNAL_SIM.iter().any(|p| lower.contains(p)) {
            Connectivity::InternalSim
        } else if EXTERNAL_SIM.iter().any(|p| lower.contains(p)) {
            Connectivity::ExternalSim
        } else {
            Connectivity::Unknown
        }
    }
}

impl UnitClassifier for NamingConventionClassifier {
    fn classify(&self, unit: &RawUnit) -> Classification {
        let name = unit.name.trim();
        if name.is_empty() {
            return Classification::default();
        }
        let lower = name.to_lowercase();

        // Plate search skips the fleet prefix so `AB12-...` is not a plate.
        let fleet_id = Self::fleet_id(name);
        let after_prefix = match fleet_id {
            Some(_) => name.split_once('-').map_or(name, |(_, rest)| rest),
            None => name,
        };

        Classification {
            fleet_id,
            registration: Self::registration(after_prefix),
            vehicle_type: Self::vehicle_type(&lower),
            connectivity: Self::connectivity(&lower),
            is_demo: DEMO_MARKERS.iter().any(|m| lower.contains(m)),
        }
    }
}
