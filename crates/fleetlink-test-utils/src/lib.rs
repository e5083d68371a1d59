// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Fleetlink.
//!
//! - [`MockRemote`] - remote client with scripted replies per service
//! - [`ManualClock`] - clock that only moves when told to
//! - [`fixtures`] - wire JSON and domain record builders

pub mod clock;
pub mod fixtures;
pub mod mock_remote;

pub use clock::ManualClock;
pub use mock_remote::{MockRemote, MockReply};
