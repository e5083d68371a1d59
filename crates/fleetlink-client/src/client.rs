// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport for the telemetry platform.
//!
//! Every call is a form-encoded POST carrying `svc`, `params` (JSON) and,
//! once a session is open, `sid`. Replies are JSON; an object of the form
//! `{"error": <code>}` is a platform-level rejection.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use fleetlink_config::model::PlatformConfig;
use fleetlink_core::types::SessionInfo;
use fleetlink_core::{FleetError, RemoteClient};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::wire::LoginResponse;

const LOGIN_SERVICE: &str = "token/login";
const LOGOUT_SERVICE: &str = "core/logout";

/// Remote client speaking the platform's HTTP API.
///
/// The session id lives in an [`ArcSwapOption`] so concurrent calls read it
/// without locking.
#[derive(Debug)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: u32,
    retry_delay: Duration,
    session: ArcSwapOption<String>,
}

impl HttpRemote {
    /// Creates a client from the `[platform]` config section.
    ///
    /// Fails with [`FleetError::Config`] when no access token is configured.
    pub fn new(config: &PlatformConfig) -> Result<Self, FleetError> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                FleetError::Config(
                    "platform.token is not set (use FLEETLINK_PLATFORM_TOKEN)".to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FleetError::transport(format!("failed to build HTTP client: {e}"), e))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(1),
            session: ArcSwapOption::empty(),
        })
    }

    /// Overrides the delay between transient-error retries.
    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn session_id(&self) -> Option<Arc<String>> {
        self.session.load_full()
    }

    /// Posts one service call, retrying transient HTTP failures.
    async fn post(
        &self,
        service: &str,
        params: Value,
        sid: Option<&str>,
    ) -> Result<Value, FleetError> {
        let params_json = params.to_string();
        let mut form: Vec<(&str, &str)> = vec![("svc", service), ("params", params_json.as_str())];
        if let Some(sid) = sid {
            form.push(("sid", sid));
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(service, attempt, "retrying platform call after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .form(&form)
                .send()
                .await
                .map_err(|e| FleetError::transport(format!("HTTP request failed: {e}"), e))?;

            let status = response.status();
            debug!(service, status = %status, attempt, "platform response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    FleetError::transport(format!("failed to read response body: {e}"), e)
                })?;
                return parse_reply(service, params, &body);
            }

            let body = response.text().await.unwrap_or_default();
            let error = FleetError::Transport {
                message: format!("platform returned {status}: {body}"),
                source: None,
            };

            if is_transient_status(status) && attempt < self.max_retries {
                warn!(service, status = %status, "transient HTTP error, will retry");
                last_error = Some(error);
                continue;
            }

            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| FleetError::Transport {
            message: format!("`{service}` failed after retries"),
            source: None,
        }))
    }
}

/// Turns a 2xx body into the reply value or a structured API error.
fn parse_reply(service: &str, params: Value, body: &str) -> Result<Value, FleetError> {
    let value: Value = serde_json::from_str(body).map_err(|e| FleetError::InvalidResponse {
        service: service.to_string(),
        message: format!("reply is not JSON: {e}"),
    })?;

    if let Some(code) = error_code(&value) {
        return Err(FleetError::Api {
            code,
            service: service.to_string(),
            params,
        });
    }

    Ok(value)
}

/// Extracts `code` from a bare `{"error": code, ...}` reply.
///
/// Objects with an `error` key and `items`/`item` payloads are not error
/// replies, so only small objects qualify.
pub fn error_code(value: &Value) -> Option<i64> {
    let obj = value.as_object()?;
    let code = obj.get("error")?.as_i64()?;
    (obj.len() <= 2 && code != 0).then_some(code)
}

/// HTTP statuses worth one more attempt.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[async_trait]
impl RemoteClient for HttpRemote {
    fn name(&self) -> &str {
        "http"
    }

    async fn call(&self, service: &str, params: Value) -> Result<Value, FleetError> {
        let sid = self.session_id().ok_or(FleetError::NoSession)?;
        self.post(service, params, Some(sid.as_str())).await
    }

    async fn login(&self) -> Result<SessionInfo, FleetError> {
        let params = json!({ "token": self.token, "fl": 1 });
        let reply = self.post(LOGIN_SERVICE, params, None).await?;
        let login: LoginResponse =
            serde_json::from_value(reply).map_err(|e| FleetError::InvalidResponse {
                service: LOGIN_SERVICE.to_string(),
                message: e.to_string(),
            })?;

        self.session.store(Some(Arc::new(login.eid.clone())));
        info!(user = %login.user.nm, "platform session opened");

        Ok(SessionInfo {
            session_id: login.eid,
            user: login.user.into(),
            features: login.features,
        })
    }

    async fn logout(&self) -> Result<(), FleetError> {
        let Some(sid) = self.session.swap(None) else {
            return Ok(());
        };
        self.post(LOGOUT_SERVICE, json!({}), Some(sid.as_str()))
            .await?;
        info!("platform session closed");
        Ok(())
    }

    fn has_session(&self) -> bool {
        self.session.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_PATH: &str = "/wialon/ajax.html";

    fn test_client(server: &MockServer) -> HttpRemote {
        let config = PlatformConfig {
            base_url: format!("{}{API_PATH}", server.uri()),
            token: Some("test-token".into()),
            ..PlatformConfig::default()
        };
        HttpRemote::new(&config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=token%2Flogin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "eid": "sid-123",
                "user": {"id": 9, "nm": "workshop"},
                "features": {"unlim": 1}
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn missing_token_is_config_error() {
        let err = HttpRemote::new(&PlatformConfig::default()).unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }

    #[test]
    fn error_code_detection() {
        assert_eq!(error_code(&json!({"error": 7})), Some(7));
        assert_eq!(error_code(&json!({"error": 4, "reason": "bad"})), Some(4));
        assert_eq!(error_code(&json!({"error": 0})), None);
        assert_eq!(error_code(&json!({"items": [], "error": 1, "x": 2})), None);
        assert_eq!(error_code(&json!([1, 2])), None);
    }

    #[tokio::test]
    async fn call_without_session_fails() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let err = client.call("core/search_items", json!({})).await.unwrap_err();
        assert!(matches!(err, FleetError::NoSession));
    }

    #[tokio::test]
    async fn login_stores_session_and_calls_attach_it() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=core%2Fsearch_item"))
            .and(body_string_contains("sid=sid-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"item": null})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let session = client.login().await.unwrap();
        assert_eq!(session.session_id, "sid-123");
        assert_eq!(session.user.name, "workshop");
        assert!(client.has_session());

        let reply = client
            .call("core/search_item", json!({"id": 1, "flags": 1}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"item": null}));
    }

    #[tokio::test]
    async fn platform_error_keeps_service_and_params() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=messages%2Fload_interval"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 1001})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.login().await.unwrap();
        let params = json!({"itemId": 42});
        let err = client
            .call("messages/load_interval", params.clone())
            .await
            .unwrap_err();
        match err {
            FleetError::Api {
                code,
                service,
                params: p,
            } => {
                assert_eq!(code, 1001);
                assert_eq!(service, "messages/load_interval");
                assert_eq!(p, params);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_once_on_503() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=core%2Fget_hw_types"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=core%2Fget_hw_types"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.login().await.unwrap();
        let reply = client.call("core/get_hw_types", json!({})).await.unwrap();
        assert_eq!(reply, json!([]));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_transport_error() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=core%2Fbatch"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.login().await.unwrap();
        let err = client.call("core/batch", json!({})).await.unwrap_err();
        assert!(matches!(err, FleetError::Transport { .. }));
        assert!(err.to_string().contains("bad gateway"), "got: {err}");
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_response() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=core%2Fsearch_items"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.login().await.unwrap();
        let err = client.call("core/search_items", json!({})).await.unwrap_err();
        assert!(matches!(err, FleetError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(body_string_contains("svc=core%2Flogout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.login().await.unwrap();
        client.logout().await.unwrap();
        assert!(!client.has_session());
        client.logout().await.unwrap();
    }
}
