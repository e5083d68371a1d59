// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seams between Fleetlink crates.

pub mod remote;

pub use remote::RemoteClient;
