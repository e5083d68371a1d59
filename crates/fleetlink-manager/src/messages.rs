// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recent-message loading: `load_interval`, `get_messages`, then `unload`.
//!
//! The platform keeps one loaded message buffer per session, so the three
//! steps run under a lock shared by every clone of the loader.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use fleetlink_client::PlatformApi;
use fleetlink_config::model::MessagesConfig;
use fleetlink_core::error::CODE_NO_MESSAGES;
use fleetlink_core::{FleetError, ItemId, TelemetryMessage};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Loads the most recent messages of one unit.
#[derive(Debug, Clone)]
pub struct MessageLoader {
    api: PlatformApi,
    window: TimeDelta,
    limit: u64,
    buffer: Arc<Mutex<()>>,
}

impl MessageLoader {
    pub fn new(api: PlatformApi, config: &MessagesConfig) -> Self {
        Self {
            api,
            window: TimeDelta::try_hours(i64::from(config.window_hours)).unwrap_or(TimeDelta::MAX),
            limit: u64::from(config.limit),
            buffer: Arc::new(Mutex::new(())),
        }
    }

    /// Returns up to `limit` messages from the last `window`, newest first.
    ///
    /// The session's message buffer is always released afterwards, even when
    /// loading failed. "No messages for interval" yields an empty list.
    pub async fn recent(
        &self,
        unit_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<Vec<TelemetryMessage>, FleetError> {
        let from = now.checked_sub_signed(self.window).unwrap_or(DateTime::UNIX_EPOCH);
        let _buffer = self.buffer.lock().await;
        let loaded = self.load(unit_id, from, now).await;

        if let Err(e) = self.api.unload_messages().await {
            warn!(unit_id, error = %e, "failed to unload messages");
        }

        match loaded {
            Err(e) if e.api_code() == Some(CODE_NO_MESSAGES) => {
                debug!(unit_id, "no messages in window");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn load(
        &self,
        unit_id: ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetryMessage>, FleetError> {
        let count = self.api.load_interval(unit_id, from, to).await?;
        if count == 0 || self.limit == 0 {
            return Ok(Vec::new());
        }

        let first = count.saturating_sub(self.limit);
        let mut messages = self.api.get_messages(first, count - 1).await?;
        messages.reverse();
        debug!(unit_id, loaded = count, returned = messages.len(), "messages loaded");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use fleetlink_client::api::{GET_MESSAGES, LOAD_INTERVAL, UNLOAD_MESSAGES};
    use fleetlink_test_utils::clock::epoch;
    use fleetlink_test_utils::fixtures::message_json;
    use fleetlink_test_utils::{MockReply, MockRemote};
    use serde_json::json;

    fn loader(remote: &Arc<MockRemote>, limit: u32) -> MessageLoader {
        let config = MessagesConfig {
            window_hours: 24,
            limit,
        };
        MessageLoader::new(PlatformApi::new(remote.clone()), &config)
    }

    #[tokio::test]
    async fn returns_newest_first_and_unloads() {
        let now = epoch();
        let remote = Arc::new(MockRemote::with_session());
        remote
            .push_ok(LOAD_INTERVAL, json!({"count": 10}))
            .push_ok(
                GET_MESSAGES,
                json!([
                    message_json(now - Duration::minutes(2), Some(10.0), &[]),
                    message_json(now - Duration::minutes(1), Some(20.0), &[]),
                ]),
            )
            .push_ok(UNLOAD_MESSAGES, json!({}));

        let messages = loader(&remote, 2).recent(7, now).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert!(messages[0].time > messages[1].time);
        assert_eq!(
            remote.services(),
            vec![LOAD_INTERVAL, GET_MESSAGES, UNLOAD_MESSAGES]
        );

        let calls = remote.calls();
        assert_eq!(calls[0].1["itemId"], 7);
        assert_eq!(calls[0].1["timeFrom"], (now - Duration::hours(24)).timestamp());
        assert_eq!(calls[0].1["timeTo"], now.timestamp());
        assert_eq!(calls[1].1["indexFrom"], 8);
        assert_eq!(calls[1].1["indexTo"], 9);
    }

    #[tokio::test]
    async fn no_messages_code_is_empty() {
        let remote = Arc::new(MockRemote::with_session());
        remote
            .push_api_error(LOAD_INTERVAL, CODE_NO_MESSAGES)
            .push_ok(UNLOAD_MESSAGES, json!({}));

        let messages = loader(&remote, 50).recent(7, epoch()).await.unwrap();

        assert!(messages.is_empty());
        assert_eq!(remote.call_count(GET_MESSAGES), 0);
        assert_eq!(remote.call_count(UNLOAD_MESSAGES), 1);
    }

    #[tokio::test]
    async fn unload_runs_even_when_get_fails() {
        let remote = Arc::new(MockRemote::with_session());
        remote
            .push_ok(LOAD_INTERVAL, json!({"count": 3}))
            .push(GET_MESSAGES, MockReply::Transport("reset".into()))
            .push_ok(UNLOAD_MESSAGES, json!({}));

        let err = loader(&remote, 50).recent(7, epoch()).await.unwrap_err();

        assert!(matches!(err, FleetError::Transport { .. }));
        assert_eq!(
            remote.services(),
            vec![LOAD_INTERVAL, GET_MESSAGES, UNLOAD_MESSAGES]
        );
    }

    #[tokio::test]
    async fn unload_failure_does_not_mask_messages() {
        let now = epoch();
        let remote = Arc::new(MockRemote::with_session());
        remote
            .push_ok(LOAD_INTERVAL, json!({"count": 1}))
            .push_ok(GET_MESSAGES, json!([message_json(now, None, &[("1", 40.0)])]))
            .push_api_error(UNLOAD_MESSAGES, 5);

        let messages = loader(&remote, 50).recent(7, now).await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].params["1"], 40.0);
        assert_eq!(remote.calls()[1].1["indexFrom"], 0);
    }

    #[tokio::test]
    async fn empty_interval_skips_get() {
        let remote = Arc::new(MockRemote::with_session());
        remote
            .push_ok(LOAD_INTERVAL, json!({"count": 0}))
            .push_ok(UNLOAD_MESSAGES, json!({}));

        let messages = loader(&remote, 50).recent(7, epoch()).await.unwrap();

        assert!(messages.is_empty());
        assert_eq!(remote.services(), vec![LOAD_INTERVAL, UNLOAD_MESSAGES]);
    }
}
