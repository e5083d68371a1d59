// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repeating timer that drives one [`PollTask`].
//!
//! The poller owns at most one background task. Each tick runs the task's
//! `tick` to completion; errors and panics are logged and the timer keeps
//! running. Stopping cancels the timer; a tick already in flight finishes
//! and its result is dropped.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetlink_core::FleetError;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The unit of periodic work.
#[async_trait]
pub trait PollTask: Send + Sync + 'static {
    async fn tick(&self) -> Result<(), FleetError>;
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Start/stop handle around a repeating [`PollTask`].
pub struct Poller {
    task: Arc<dyn PollTask>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Poller {
    pub fn new(task: Arc<dyn PollTask>) -> Self {
        Self {
            task,
            running: Mutex::new(None),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts ticking every `interval`, first tick one interval from now.
    ///
    /// Returns `false` without changes if the poller is already running or
    /// `interval` is zero. Must be called from within a tokio runtime.
    pub fn start(&self, interval: Duration) -> bool {
        if interval.is_zero() {
            warn!("poller interval must be non-zero, not starting");
            return false;
        }

        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("poller already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::clone(&self.task), interval, cancel.clone()));
        *slot = Some(Running { cancel, handle });
        info!(interval_secs = interval.as_secs_f64(), "poller started");
        true
    }

    /// Stops the timer. Returns whether it was running; calling it again is a no-op.
    pub fn stop(&self) -> bool {
        match self.slot().take() {
            Some(running) => {
                running.cancel.cancel();
                info!("poller stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished() && !r.cancel.is_cancelled())
    }

    /// Runs one tick on the caller's task, outside the timer.
    pub async fn tick_now(&self) -> Result<(), FleetError> {
        self.task.tick().await
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(running) = self.slot().take() {
            running.cancel.cancel();
        }
    }
}

async fn run(task: Arc<dyn PollTask>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("poll loop exiting");
                break;
            }
            _ = ticker.tick() => {
                let outcome = AssertUnwindSafe(task.tick()).catch_unwind().await;
                match outcome {
                    Ok(Ok(())) => {
                        debug!("poll tick completed");
                        #[cfg(feature = "prometheus")]
                        fleetlink_prometheus::record_poll_tick("ok");
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "poll tick failed");
                        #[cfg(feature = "prometheus")]
                        fleetlink_prometheus::record_poll_tick("error");
                    }
                    Err(panic) => {
                        warn!(panic = panic_message(&*panic), "poll tick panicked");
                        #[cfg(feature = "prometheus")]
                        fleetlink_prometheus::record_poll_tick("panic");
                    }
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
