// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic-keyed callback registry with per-callback fault isolation.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use fleetlink_core::FleetError;
use tracing::{debug, warn};

use crate::events::{FleetEvent, Topic};

/// Identifier returned by [`SubscriberRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A subscriber callback. Returning an error only affects this subscriber.
pub type Callback = Arc<dyn Fn(&FleetEvent) -> Result<(), FleetError> + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    callback: Callback,
}

/// Registry of subscriptions keyed by topic.
#[derive(Default)]
pub struct SubscriberRegistry {
    topics: DashMap<Topic, Vec<Subscription>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscriptions", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` on `topic` and returns its id.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&FleetEvent) -> Result<(), FleetError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.topics.entry(topic).or_default().push(Subscription {
            id,
            callback: Arc::new(callback),
        });
        debug!(%topic, %id, "subscriber added");
        id
    }

    /// Removes a subscription. Returns whether it existed; unknown ids are a no-op.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) -> bool {
        let Some(mut subs) = self.topics.get_mut(&topic) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != id);
        let removed = subs.len() != before;
        if removed {
            debug!(%topic, %id, "subscriber removed");
        }
        removed
    }

    /// Delivers `event` to every subscriber of `topic` and returns how many
    /// callbacks completed successfully.
    ///
    /// Callbacks run on the caller's thread, outside any registry lock, so a
    /// callback may subscribe or unsubscribe without deadlocking.
    pub fn publish(&self, topic: Topic, event: &FleetEvent) -> usize {
        let callbacks: Vec<(SubscriptionId, Callback)> = match self.topics.get(&topic) {
            Some(subs) => subs
                .iter()
                .map(|s| (s.id, Arc::clone(&s.callback)))
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!(%topic, %id, error = %e, "subscriber failed"),
                Err(panic) => {
                    warn!(%topic, %id, panic = panic_message(&*panic), "subscriber panicked")
                }
            }
        }
        delivered
    }

    /// Publishes on the event's own topic.
    pub fn emit(&self, event: &FleetEvent) -> usize {
        self.publish(event.topic(), event)
    }

    /// Number of subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics.get(&topic).map_or(0, |subs| subs.len())
    }

    /// Total number of subscriptions.
    pub fn len(&self) -> usize {
        self.topics.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        self.topics.clear();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use chrono::Utc;
    use fleetlink_core::FleetStatusSnapshot;
    use tracing_test::traced_test;

    fn status_event() -> FleetEvent {
        FleetEvent::FleetStatus(Arc::new(FleetStatusSnapshot::from_units(
            std::iter::empty(),
            Utc::now(),
        )))
    }

    fn counter(registry: &SubscriberRegistry, topic: Topic) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        registry.subscribe(topic, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        count
    }

    #[test]
    #[traced_test]
    fn failing_subscriber_is_isolated() {
        let registry = SubscriberRegistry::new();
        let first = counter(&registry, Topic::FleetStatus);
        let second_calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&second_calls);
        registry.subscribe(Topic::FleetStatus, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Err(FleetError::Internal("render failed".into()))
        });
        let third = counter(&registry, Topic::FleetStatus);

        let delivered = registry.publish(Topic::FleetStatus, &status_event());

        assert_eq!(delivered, 2);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 1);
        assert!(logs_contain("subscriber failed"));
    }

    #[test]
    #[traced_test]
    fn panicking_subscriber_is_isolated() {
        let registry = SubscriberRegistry::new();
        let first = counter(&registry, Topic::Units);
        registry.subscribe(Topic::Units, |_| panic!("boom"));
        let third = counter(&registry, Topic::Units);

        let units: Arc<[Arc<fleetlink_core::EnrichedUnit>]> = Arc::from(Vec::new());
        let delivered = registry.publish(Topic::Units, &FleetEvent::Units(units));

        assert_eq!(delivered, 2);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 1);
        assert!(logs_contain("subscriber panicked"));
        assert!(logs_contain("boom"));
    }

    #[test]
    fn topics_are_independent() {
        let registry = SubscriberRegistry::new();
        let status = counter(&registry, Topic::FleetStatus);
        let details = counter(&registry, Topic::UnitDetails);

        registry.emit(&status_event());

        assert_eq!(status.load(Ordering::SeqCst), 1);
        assert_eq!(details.load(Ordering::SeqCst), 0);
        assert_eq!(registry.publish(Topic::Units, &status_event()), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = registry.subscribe(Topic::FleetStatus, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(registry.unsubscribe(Topic::FleetStatus, id));
        assert!(!registry.unsubscribe(Topic::FleetStatus, id));
        assert!(!registry.unsubscribe(Topic::Units, id));
        assert!(!registry.unsubscribe(Topic::Units, SubscriptionId(999)));

        registry.publish(Topic::FleetStatus, &status_event());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ids_are_unique() {
        let registry = SubscriberRegistry::new();
        let a = registry.subscribe(Topic::Units, |_| Ok(()));
        let b = registry.subscribe(Topic::Units, |_| Ok(()));
        let c = registry.subscribe(Topic::FleetStatus, |_| Ok(()));
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = Arc::new(SubscriberRegistry::new());
        let slot = Arc::new(std::sync::Mutex::new(None::<SubscriptionId>));
        let (r, s) = (Arc::clone(&registry), Arc::clone(&slot));
        let id = registry.subscribe(Topic::FleetStatus, move |_| {
            if let Some(id) = *s.lock().unwrap() {
                r.unsubscribe(Topic::FleetStatus, id);
            }
            Ok(())
        });
        *slot.lock().unwrap() = Some(id);

        assert_eq!(registry.publish(Topic::FleetStatus, &status_event()), 1);
        assert_eq!(registry.subscriber_count(Topic::FleetStatus), 0);
    }

    #[test]
    fn clear_drops_everything() {
        let registry = SubscriberRegistry::new();
        let count = counter(&registry, Topic::FleetStatus);
        registry.clear();
        assert!(registry.is_empty());
        registry.publish(Topic::FleetStatus, &status_event());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
