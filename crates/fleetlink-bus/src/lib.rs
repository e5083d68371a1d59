// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscriber registry for Fleetlink.
//!
//! Subscribers register a callback on a [`Topic`]; [`SubscriberRegistry::publish`]
//! invokes every callback for that topic synchronously, in subscription
//! order. A callback that errors or panics is logged and skipped; the
//! remaining callbacks and the publisher are unaffected.

pub mod events;
pub mod registry;

pub use events::{FleetEvent, Topic};
pub use registry::{SubscriberRegistry, SubscriptionId};
