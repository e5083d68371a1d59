// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`DataManager`] facade.
//!
//! Owns the snapshot and unit caches, the subscriber registry and the poller,
//! and composes the platform API, enrichment, batching and reporting behind
//! a handful of operations. Consumers only ever see `Arc` projections.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetlink_bus::{FleetEvent, SubscriberRegistry, SubscriptionId, Topic};
use fleetlink_cache::CacheStore;
use fleetlink_client::api::{self, BATCH, hardware_command, search_command};
use fleetlink_client::flags::{data, items};
use fleetlink_client::PlatformApi;
use fleetlink_config::FleetlinkConfig;
use fleetlink_core::types::{
    Command, HardwareType, ReportJob, ReportResult, SystemSnapshot, UnitGroup,
};
use fleetlink_core::{
    Clock, EnrichedUnit, FleetError, FleetStatusSnapshot, ItemId, RemoteClient, SystemClock,
};
use fleetlink_enrich::{Enricher, NamingConventionClassifier, StatusThresholds, UnitClassifier};
use tracing::{debug, info, warn};

use crate::batch::{BatchExecutor, BatchOutcome};
use crate::messages::MessageLoader;
use crate::poller::{PollTask, Poller};
use crate::report::ReportOrchestrator;

const SNAPSHOT_KEY: &str = "snapshot";
const UNIT_PREFIX: &str = "unit:";

fn unit_key(id: ItemId) -> String {
    format!("{UNIT_PREFIX}{id}")
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    snapshot_ttl: Duration,
    unit_ttl: Duration,
    poll_interval: Duration,
    poller_enabled: bool,
}

/// State shared between the facade and the poll task.
struct Inner {
    api: PlatformApi,
    clock: Arc<dyn Clock>,
    enricher: Enricher,
    snapshots: CacheStore<SystemSnapshot>,
    units: CacheStore<EnrichedUnit>,
    registry: SubscriberRegistry,
    batch: BatchExecutor,
    messages: MessageLoader,
    reports: ReportOrchestrator,
    settings: Settings,
}

/// Telemetry data manager.
///
/// Construct one per platform connection; it is the single source of truth
/// for unit state. Dropping it stops the poller.
pub struct DataManager {
    inner: Arc<Inner>,
    poller: Poller,
}

impl std::fmt::Debug for DataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataManager")
            .field("remote", &self.inner.api.remote().name())
            .field("settings", &self.inner.settings)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl DataManager {
    /// A manager on the system clock with the naming-convention classifier.
    pub fn new(remote: Arc<dyn RemoteClient>, config: &FleetlinkConfig) -> Self {
        Self::with_parts(
            remote,
            config,
            Arc::new(SystemClock),
            Arc::new(NamingConventionClassifier),
        )
    }

    pub fn with_parts(
        remote: Arc<dyn RemoteClient>,
        config: &FleetlinkConfig,
        clock: Arc<dyn Clock>,
        classifier: Arc<dyn UnitClassifier>,
    ) -> Self {
        let api = PlatformApi::new(remote);
        let inner = Arc::new(Inner {
            enricher: Enricher::new(StatusThresholds::from(&config.status), classifier),
            snapshots: CacheStore::new(Arc::clone(&clock)),
            units: CacheStore::new(Arc::clone(&clock)),
            clock,
            registry: SubscriberRegistry::new(),
            batch: BatchExecutor::new(api.clone()),
            messages: MessageLoader::new(api.clone(), &config.messages),
            reports: ReportOrchestrator::new(api.clone(), &config.reports),
            api,
            settings: Settings {
                snapshot_ttl: config.cache.snapshot_ttl(),
                unit_ttl: config.cache.unit_ttl(),
                poll_interval: config.poller.interval(),
                poller_enabled: config.poller.enabled,
            },
        });
        let poller = Poller::new(Arc::clone(&inner) as Arc<dyn PollTask>);
        Self { inner, poller }
    }

    /// Opens a session if needed, loads the system snapshot unless a fresh
    /// one is cached, and starts the poller when enabled.
    pub async fn initialize(&self) -> Result<(), FleetError> {
        self.inner.ensure_session().await?;

        if self.inner.snapshots.is_fresh(SNAPSHOT_KEY) {
            debug!("snapshot still fresh, skipping load");
            #[cfg(feature = "prometheus")]
            fleetlink_prometheus::record_cache_lookup("snapshot", true);
        } else {
            #[cfg(feature = "prometheus")]
            fleetlink_prometheus::record_cache_lookup("snapshot", false);
            self.inner.refresh_snapshot().await?;
        }

        if self.inner.settings.poller_enabled {
            self.poller.start(self.inner.settings.poll_interval);
        }
        Ok(())
    }

    /// One enriched unit, from the unit cache or freshly fetched.
    ///
    /// The unit itself is required; sensors and recent messages are
    /// best-effort and only narrow what enrichment can derive.
    pub async fn get_unit_details(&self, id: ItemId) -> Result<Arc<EnrichedUnit>, FleetError> {
        let key = unit_key(id);
        if let Some(unit) = self.inner.units.get(&key) {
            debug!(unit_id = id, "unit served from cache");
            #[cfg(feature = "prometheus")]
            fleetlink_prometheus::record_cache_lookup("unit", true);
            return Ok(unit);
        }
        #[cfg(feature = "prometheus")]
        fleetlink_prometheus::record_cache_lookup("unit", false);

        self.inner.ensure_session().await?;
        let inner = &self.inner;
        let now = inner.clock.now();
        let (unit, sensors, messages) = tokio::join!(
            inner.api.unit(id),
            inner.api.unit_sensors(id),
            inner.messages.recent(id, now),
        );

        #[cfg(feature = "prometheus")]
        fleetlink_prometheus::record_remote_fetch("unit_details", unit.is_ok());
        let raw = unit?;
        let sensors = match sensors {
            Ok(sensors) => sensors,
            Err(e) => {
                warn!(unit_id = id, error = %e, "sensor fetch failed, using snapshot sensors");
                raw.sensors.clone()
            }
        };
        let messages = messages.unwrap_or_else(|e| {
            warn!(unit_id = id, error = %e, "message fetch failed");
            Vec::new()
        });

        let unit = Arc::new(inner.enricher.enrich(raw, &sensors, &messages, now));
        inner
            .units
            .put(key, Arc::clone(&unit), inner.settings.unit_ttl);
        inner
            .registry
            .publish(Topic::UnitDetails, &FleetEvent::UnitDetails(Arc::clone(&unit)));
        debug!(unit_id = id, status = %unit.status, "unit details refreshed");
        Ok(unit)
    }

    /// Fleet counts recomputed from the current unit view.
    pub fn get_fleet_status(&self) -> FleetStatusSnapshot {
        self.inner.fleet_status()
    }

    /// Runs a report job to completion.
    pub async fn execute_report(&self, job: &ReportJob) -> Result<ReportResult, FleetError> {
        self.inner.ensure_session().await?;
        self.inner.reports.execute(job).await
    }

    /// Runs `commands` in one round trip with per-command results.
    pub async fn execute_batch(
        &self,
        commands: &[Command],
        stop_on_first_error: bool,
    ) -> Result<Vec<BatchOutcome>, FleetError> {
        self.inner.ensure_session().await?;
        self.inner.batch.execute(commands, stop_on_first_error).await
    }

    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&FleetEvent) -> Result<(), FleetError> + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(topic, callback)
    }

    /// Removes a subscription; unknown ids are ignored.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) -> bool {
        self.inner.registry.unsubscribe(topic, id)
    }

    /// Current units: the snapshot overlaid with fresher per-unit entries.
    pub fn units(&self) -> Vec<Arc<EnrichedUnit>> {
        self.inner.current_units()
    }

    /// The cached system snapshot, if fresh.
    pub fn snapshot(&self) -> Option<Arc<SystemSnapshot>> {
        self.inner.snapshots.get(SNAPSHOT_KEY)
    }

    /// Drops the cached details of one unit so the next lookup refetches.
    pub fn invalidate_unit(&self, id: ItemId) {
        self.inner.units.invalidate(&unit_key(id));
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Runs one poll tick immediately.
    pub async fn poll_now(&self) -> Result<(), FleetError> {
        self.poller.tick_now().await
    }

    /// Stops the poller, clears caches and subscriptions, and releases the
    /// session. Safe to call more than once.
    pub async fn cleanup(&self) {
        self.poller.stop();
        self.inner.registry.clear();
        self.inner.snapshots.invalidate_all();
        self.inner.units.invalidate_all();

        let remote = self.inner.api.remote();
        if remote.has_session() {
            match remote.logout().await {
                Ok(()) => info!("session released"),
                Err(e) => warn!(error = %e, "logout failed"),
            }
        }
        debug!("data manager cleaned up");
    }
}

impl Inner {
    async fn ensure_session(&self) -> Result<(), FleetError> {
        let remote = self.api.remote();
        if remote.has_session() {
            return Ok(());
        }
        let session = remote.login().await?;
        info!(user = %session.user.name, remote = remote.name(), "session opened");
        Ok(())
    }

    /// Fetches units, users, resources, and groups plus hardware (one
    /// batch) concurrently, then enriches and stores the snapshot.
    async fn refresh_snapshot(&self) -> Result<Arc<SystemSnapshot>, FleetError> {
        #[cfg(feature = "prometheus")]
        let started = std::time::Instant::now();

        let directory = [
            search_command(items::UNIT_GROUP, data::BASE),
            hardware_command(),
        ];
        let (units, users, resources, directory) = tokio::join!(
            self.api.units(),
            self.api.users(),
            self.api.resources(),
            self.batch.execute(&directory, false),
        );

        #[cfg(feature = "prometheus")]
        fleetlink_prometheus::record_remote_fetch(
            "snapshot",
            units.is_ok() && users.is_ok() && resources.is_ok() && directory.is_ok(),
        );
        let (raw_units, users, resources) = (units?, users?, resources?);
        let (groups, hardware) = split_directory(directory?)?;

        let now = self.clock.now();
        let units: Vec<Arc<EnrichedUnit>> = raw_units
            .into_iter()
            .map(|raw| {
                let sensors = raw.sensors.clone();
                Arc::new(self.enricher.enrich(raw, &sensors, &[], now))
            })
            .collect();

        let snapshot = Arc::new(SystemSnapshot {
            units,
            users,
            resources,
            groups,
            hardware,
            fetched_at: now,
        });
        self.snapshots
            .put(SNAPSHOT_KEY, Arc::clone(&snapshot), self.settings.snapshot_ttl);

        info!(
            units = snapshot.units.len(),
            users = snapshot.users.len(),
            resources = snapshot.resources.len(),
            groups = snapshot.groups.len(),
            "snapshot refreshed"
        );
        #[cfg(feature = "prometheus")]
        {
            fleetlink_prometheus::set_units_tracked(snapshot.units.len() as f64);
            fleetlink_prometheus::record_refresh_latency(started.elapsed().as_secs_f64());
        }

        let units: Arc<[Arc<EnrichedUnit>]> = self.current_units().into();
        self.registry.publish(Topic::Units, &FleetEvent::Units(units));
        Ok(snapshot)
    }

    fn current_units(&self) -> Vec<Arc<EnrichedUnit>> {
        let mut by_id: BTreeMap<ItemId, Arc<EnrichedUnit>> = self
            .snapshots
            .get(SNAPSHOT_KEY)
            .map(|s| s.units.iter().map(|u| (u.id(), Arc::clone(u))).collect())
            .unwrap_or_default();
        for unit in self.units.fresh_values(UNIT_PREFIX) {
            by_id.insert(unit.id(), unit);
        }
        by_id.into_values().collect()
    }

    fn fleet_status(&self) -> FleetStatusSnapshot {
        let units = self.current_units();
        FleetStatusSnapshot::from_units(units.iter().map(Arc::as_ref), self.clock.now())
    }
}

#[async_trait]
impl PollTask for Inner {
    /// Refreshes a stale snapshot, publishes fleet status, and purges stale
    /// unit entries. Status is published even when the refresh failed.
    async fn tick(&self) -> Result<(), FleetError> {
        let refreshed = if self.snapshots.is_fresh(SNAPSHOT_KEY) {
            Ok(())
        } else {
            debug!("snapshot stale, refreshing");
            self.refresh_snapshot().await.map(|_| ())
        };

        let status = Arc::new(self.fleet_status());
        self.registry
            .publish(Topic::FleetStatus, &FleetEvent::FleetStatus(status));
        self.units.purge_stale();
        refreshed
    }
}

/// Decodes the groups and hardware replies of the directory batch.
fn split_directory(
    outcomes: Vec<BatchOutcome>,
) -> Result<(Vec<UnitGroup>, Vec<HardwareType>), FleetError> {
    let missing = || FleetError::InvalidResponse {
        service: BATCH.to_string(),
        message: "directory reply is incomplete".to_string(),
    };
    let mut replies = outcomes.into_iter().map(BatchOutcome::into_result);
    let groups = api::parse_groups(replies.next().ok_or_else(missing)??)?;
    let hardware = api::parse_hardware(replies.next().ok_or_else(missing)??)?;
    Ok((groups, hardware))
}
