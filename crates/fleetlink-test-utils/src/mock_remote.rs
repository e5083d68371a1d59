// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock remote client for deterministic testing.
//!
//! `MockRemote` implements `RemoteClient` with replies scripted per service.
//! Each service has a FIFO queue; when it runs dry the service's sticky reply
//! (if any) is returned, otherwise the call fails with an internal error
//! naming the unscripted service.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fleetlink_core::types::{SessionInfo, UserRecord};
use fleetlink_core::{FleetError, RemoteClient};
use serde_json::Value;

/// A scripted reply. Errors are described rather than stored because
/// `FleetError` is not `Clone`.
#[derive(Debug, Clone)]
pub enum MockReply {
    Ok(Value),
    /// Platform rejection with this code; service and params come from the call.
    ApiError(i64),
    Transport(String),
    InvalidResponse(String),
}

impl MockReply {
    fn resolve(self, service: &str, params: Value) -> Result<Value, FleetError> {
        match self {
            MockReply::Ok(value) => Ok(value),
            MockReply::ApiError(code) => Err(FleetError::Api {
                code,
                service: service.to_string(),
                params,
            }),
            MockReply::Transport(message) => Err(FleetError::Transport {
                message,
                source: None,
            }),
            MockReply::InvalidResponse(message) => Err(FleetError::InvalidResponse {
                service: service.to_string(),
                message,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<MockReply>>,
    sticky: HashMap<String, MockReply>,
    delays: HashMap<String, Duration>,
    calls: Vec<(String, Value)>,
}

/// A remote client that replays scripted replies.
#[derive(Debug, Default)]
pub struct MockRemote {
    script: Mutex<Script>,
    session: AtomicBool,
    logins: AtomicUsize,
    logouts: AtomicUsize,
    fail_logout: AtomicBool,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that starts with an open session.
    pub fn with_session() -> Self {
        let mock = Self::default();
        mock.session.store(true, Ordering::SeqCst);
        mock
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues one reply for `service`.
    pub fn push(&self, service: &str, reply: MockReply) -> &Self {
        self.script()
            .queued
            .entry(service.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Queues one successful reply for `service`.
    pub fn push_ok(&self, service: &str, value: Value) -> &Self {
        self.push(service, MockReply::Ok(value))
    }

    /// Queues one platform error for `service`.
    pub fn push_api_error(&self, service: &str, code: i64) -> &Self {
        self.push(service, MockReply::ApiError(code))
    }

    /// Sets the reply returned whenever `service`'s queue is empty.
    pub fn always(&self, service: &str, reply: MockReply) -> &Self {
        self.script().sticky.insert(service.to_string(), reply);
        self
    }

    /// Sets a successful sticky reply for `service`.
    pub fn always_ok(&self, service: &str, value: Value) -> &Self {
        self.always(service, MockReply::Ok(value))
    }

    /// Delays every reply to `service` (tokio time, so paused clocks apply).
    pub fn delay(&self, service: &str, delay: Duration) -> &Self {
        self.script().delays.insert(service.to_string(), delay);
        self
    }

    /// Makes `logout` fail with a transport error.
    pub fn fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.script().calls.clone()
    }

    /// Services called so far, in order.
    pub fn services(&self) -> Vec<String> {
        self.script().calls.iter().map(|(s, _)| s.clone()).collect()
    }

    /// How many times `service` was called.
    pub fn call_count(&self, service: &str) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|(s, _)| s == service)
            .count()
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClient for MockRemote {
    fn name(&self) -> &str {
        "mock"
    }

    async fn call(&self, service: &str, params: Value) -> Result<Value, FleetError> {
        if !self.has_session() {
            return Err(FleetError::NoSession);
        }

        let (reply, delay) = {
            let mut script = self.script();
            script.calls.push((service.to_string(), params.clone()));
            let queued = script.queued.get_mut(service).and_then(VecDeque::pop_front);
            let reply = queued.or_else(|| script.sticky.get(service).cloned());
            (reply, script.delays.get(service).copied())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(reply) => reply.resolve(service, params),
            None => Err(FleetError::Internal(format!(
                "no scripted reply for `{service}`"
            ))),
        }
    }

    async fn login(&self) -> Result<SessionInfo, FleetError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.session.store(true, Ordering::SeqCst);
        Ok(SessionInfo {
            session_id: "mock-session".to_string(),
            user: UserRecord {
                id: 1,
                name: "mock-user".to_string(),
            },
            features: Default::default(),
        })
    }

    async fn logout(&self) -> Result<(), FleetError> {
        if !self.session.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.logouts.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(FleetError::Transport {
                message: "logout failed".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    fn has_session(&self) -> bool {
        self.session.load(Ordering::SeqCst)
    }
}
