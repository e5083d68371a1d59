// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The remote client contract: one labeled call in, one parsed reply out.

use async_trait::async_trait;

use crate::error::FleetError;
use crate::types::SessionInfo;

/// A connection to the telemetry platform.
///
/// Implementations own the session token. Every call names a platform
/// `service` and passes a JSON `params` object; session-bearing calls attach
/// the current session id. A platform-level rejection is returned as
/// [`FleetError::Api`] with the original service and params.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    /// Returns a short name for logs (e.g. "http", "mock").
    fn name(&self) -> &str;

    /// Issues one remote call and returns the parsed JSON reply.
    async fn call(
        &self,
        service: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, FleetError>;

    /// Opens a session using the credentials the client was built with.
    async fn login(&self) -> Result<SessionInfo, FleetError>;

    /// Closes the current session. A no-op when no session is open.
    async fn logout(&self) -> Result<(), FleetError>;

    /// Whether a session is currently open.
    fn has_session(&self) -> bool;
}
