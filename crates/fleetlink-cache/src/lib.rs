// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL-keyed cache store.
//!
//! Entries are `(value, inserted_at, ttl)` records keyed by string. An entry
//! is fresh iff `now - inserted_at < ttl`; stale entries read as absent but
//! stay in the map until [`CacheStore::purge_stale`] sweeps them or a write
//! replaces them.
//!
//! Values are stored behind `Arc` and writes replace the whole entry, so
//! readers never observe a partially updated value.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use fleetlink_core::Clock;
use tracing::debug;

/// A cached value with its insertion time and time-to-live.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: Arc<T>,
    pub inserted_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still fresh at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        // TTLs beyond chrono's range never expire.
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.inserted_at) < ttl
    }
}

/// Concurrent TTL cache.
#[derive(Debug)]
pub struct CacheStore<T> {
    entries: DashMap<String, Arc<CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Send + Sync + 'static> CacheStore<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Arc<T>>, ttl: Duration) {
        let entry = CacheEntry {
            value: value.into(),
            inserted_at: self.clock.now(),
            ttl,
        };
        self.entries.insert(key.into(), Arc::new(entry));
    }

    /// Returns the value if present and fresh.
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entry(key).map(|e| Arc::clone(&e.value))
    }

    /// Returns the whole entry if present and fresh.
    pub fn entry(&self, key: &str) -> Option<Arc<CacheEntry<T>>> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        entry.is_fresh(now).then(|| Arc::clone(entry.value()))
    }

    /// Whether a fresh entry exists for `key`.
    pub fn is_fresh(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Removes stale entries and returns how many were dropped.
    pub fn purge_stale(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "purged stale cache entries");
        }
        purged
    }

    /// Fresh values whose key starts with `prefix`, in no particular order.
    pub fn fresh_values(&self, prefix: &str) -> Vec<Arc<T>> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && e.value().is_fresh(now))
            .map(|e| Arc::clone(&e.value().value))
            .collect()
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlink_test_utils::ManualClock;

    const TTL: Duration = Duration::from_secs(60);

    fn store() -> (Arc<ManualClock>, CacheStore<String>) {
        let clock = Arc::new(ManualClock::default());
        let store = CacheStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn fresh_until_ttl_elapses() {
        let (clock, store) = store();
        store.put("unit:1", "alpha".to_string(), TTL);

        clock.advance(Duration::from_secs(59));
        assert_eq!(store.get("unit:1").as_deref(), Some(&"alpha".to_string()));

        clock.advance(Duration::from_secs(1));
        assert!(store.get("unit:1").is_none());
    }

    #[test]
    fn stale_entries_are_not_deleted_by_get() {
        let (clock, store) = store();
        store.put("unit:1", "alpha".to_string(), TTL);
        clock.advance(TTL * 2);

        assert!(store.get("unit:1").is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_stale(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn put_replaces_and_restamps() {
        let (clock, store) = store();
        store.put("k", "old".to_string(), TTL);
        clock.advance(Duration::from_secs(50));
        store.put("k", "new".to_string(), TTL);
        clock.advance(Duration::from_secs(50));

        assert_eq!(store.get("k").as_deref(), Some(&"new".to_string()));
    }

    #[test]
    fn zero_ttl_is_never_fresh() {
        let (_clock, store) = store();
        store.put("k", "v".to_string(), Duration::ZERO);
        assert!(!store.is_fresh("k"));
    }

    #[test]
    fn huge_ttl_never_expires() {
        let (clock, store) = store();
        store.put("k", "v".to_string(), Duration::MAX);
        clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
        assert!(store.is_fresh("k"));
    }

    #[test]
    fn invalidation() {
        let (_clock, store) = store();
        store.put("unit:1", "a".to_string(), TTL);
        store.put("unit:2", "b".to_string(), TTL);
        store.put("snapshot", "s".to_string(), TTL);

        store.invalidate("unit:1");
        assert!(store.get("unit:1").is_none());
        store.invalidate("missing");

        store.invalidate_prefix("unit:");
        assert!(store.get("unit:2").is_none());
        assert!(store.get("snapshot").is_some());

        store.invalidate_all();
        assert!(store.is_empty());
    }

    #[test]
    fn fresh_values_skip_stale_and_foreign_keys() {
        let (clock, store) = store();
        store.put("unit:1", "old".to_string(), Duration::from_secs(10));
        store.put("unit:2", "live".to_string(), TTL);
        store.put("other", "x".to_string(), TTL);
        clock.advance(Duration::from_secs(30));

        let values = store.fresh_values("unit:");
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].as_str(), "live");
    }
}
