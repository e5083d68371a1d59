// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch executor: N independent commands in one `core/batch` round trip.

use fleetlink_client::flags::BATCH_STOP_ON_ERROR;
use fleetlink_client::{PlatformApi, error_code};
use fleetlink_core::FleetError;
use fleetlink_core::types::Command;
use serde_json::Value;
use tracing::debug;

/// Result of one command inside a batch.
#[derive(Debug)]
pub enum CommandResult {
    Success(Value),
    Failed(FleetError),
    /// Not run because an earlier command failed with stop-on-error set.
    Unattempted,
}

/// A command's result together with its position in the submitted batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub result: CommandResult,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, CommandResult::Success(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.result {
            CommandResult::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Converts into a plain `Result`. Unattempted commands become an
    /// internal error naming their index.
    pub fn into_result(self) -> Result<Value, FleetError> {
        match self.result {
            CommandResult::Success(v) => Ok(v),
            CommandResult::Failed(e) => Err(e),
            CommandResult::Unattempted => Err(FleetError::Internal(format!(
                "batch command {} was not attempted",
                self.index
            ))),
        }
    }
}

/// Groups commands into single round trips and demultiplexes the replies.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    api: PlatformApi,
}

impl BatchExecutor {
    pub fn new(api: PlatformApi) -> Self {
        Self { api }
    }

    /// Runs `commands` in one physical call.
    ///
    /// Returns one outcome per command, in submission order. A failure of
    /// the round trip itself is returned as `Err`; failures of individual
    /// commands are per-outcome.
    pub async fn execute(
        &self,
        commands: &[Command],
        stop_on_first_error: bool,
    ) -> Result<Vec<BatchOutcome>, FleetError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let flags = if stop_on_first_error {
            BATCH_STOP_ON_ERROR
        } else {
            0
        };
        let replies = self.api.batch(commands, flags).await?;
        if replies.len() > commands.len() {
            return Err(FleetError::InvalidResponse {
                service: fleetlink_client::api::BATCH.to_string(),
                message: format!(
                    "{} replies for {} commands",
                    replies.len(),
                    commands.len()
                ),
            });
        }

        let outcomes = demultiplex(commands, replies, stop_on_first_error);
        debug!(
            commands = commands.len(),
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            "batch completed"
        );

        #[cfg(feature = "prometheus")]
        {
            let (mut succeeded, mut failed, mut unattempted) = (0, 0, 0);
            for outcome in &outcomes {
                match outcome.result {
                    CommandResult::Success(_) => succeeded += 1,
                    CommandResult::Failed(_) => failed += 1,
                    CommandResult::Unattempted => unattempted += 1,
                }
            }
            fleetlink_prometheus::record_batch_commands(succeeded, failed, unattempted);
        }

        Ok(outcomes)
    }
}

/// Pairs replies with commands. Missing trailing replies, and every command
/// after the first failure when `stop_on_first_error` is set, are unattempted.
fn demultiplex(
    commands: &[Command],
    replies: Vec<Value>,
    stop_on_first_error: bool,
) -> Vec<BatchOutcome> {
    let mut replies = replies.into_iter();
    let mut halted = false;

    commands
        .iter()
        .enumerate()
        .map(|(index, command)| {
            let result = match (halted, replies.next()) {
                (true, _) | (false, None) => CommandResult::Unattempted,
                (false, Some(reply)) => match error_code(&reply) {
                    Some(code) => {
                        halted = stop_on_first_error;
                        CommandResult::Failed(FleetError::Api {
                            code,
                            service: command.service.clone(),
                            params: command.params.clone(),
                        })
                    }
                    None => CommandResult::Success(reply),
                },
            };
            BatchOutcome { index, result }
        })
        .collect()
}
