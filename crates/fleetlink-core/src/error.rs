// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Fleetlink telemetry data manager.

use std::time::Duration;

use thiserror::Error;

/// Platform error code meaning "no messages for the selected interval".
pub const CODE_NO_MESSAGES: i64 = 1001;

/// The primary error type used across all Fleetlink crates.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Configuration errors (invalid TOML, missing token, bad URL).
    #[error("configuration error: {0}")]
    Config(String),

    /// The platform rejected a call with an explicit error code.
    ///
    /// The `(code, service, params)` triple is kept intact for diagnostics.
    #[error("platform error {code} from `{service}`{}", describe_suffix(.code))]
    Api {
        code: i64,
        service: String,
        params: serde_json::Value,
    },

    /// The call never reached the platform (network, TLS, non-2xx HTTP).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The platform answered with a payload that failed validation.
    #[error("invalid response from `{service}`: {message}")]
    InvalidResponse { service: String, message: String },

    /// A session-bearing call was attempted without an open session.
    #[error("no open session with the telemetry platform")]
    NoSession,

    /// A report job did not reach a terminal state within its polling budget.
    #[error("report did not finish after {attempts} status checks ({waited:?})")]
    ReportTimeout { attempts: u32, waited: Duration },

    /// The platform reported that a report job failed.
    #[error("report failed: {message}")]
    ReportFailed { message: String },

    /// A requested item does not exist on the platform.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Internal or unexpected errors (panicked task, poisoned state).
    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Builds a transport error from any error source.
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FleetError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the platform error code, if this is an API error.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            FleetError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for failures that may succeed when retried unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            FleetError::Transport { .. } => true,
            // 5: error performing request, 1003: only one request at a time.
            FleetError::Api { code, .. } => matches!(code, 5 | 1003),
            _ => false,
        }
    }
}

/// Human-readable description of a platform error code.
pub fn describe_error_code(code: i64) -> Option<&'static str> {
    let text = match code {
        1 => "invalid session",
        2 => "invalid service name",
        3 => "invalid result",
        4 => "invalid input",
        5 => "error performing request",
        6 => "unknown error",
        7 => "access denied",
        8 => "invalid user name or password",
        9 => "authorization server is unavailable",
        CODE_NO_MESSAGES => "no messages for selected interval",
        1002 => "item with such unique property already exists",
        1003 => "only one request is allowed at the moment",
        _ => return None,
    };
    Some(text)
}

fn describe_suffix(code: &i64) -> String {
    describe_error_code(*code)
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}
