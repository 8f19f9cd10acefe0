// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Rasa HTTP API.
//!
//! [`RasaClient`] never returns an error for an upstream problem. Non-success
//! statuses, timeouts, and connection failures all come back as a
//! [`DialogResponse`] so the orchestrator has a single shape to inspect.

use std::time::Duration;

use masdif_core::{DialogResponse, MasdifError};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

/// Low-level Rasa HTTP API client.
#[derive(Debug, Clone)]
pub struct RasaClient {
    client: reqwest::Client,
    base_url: Url,
    base_path: String,
    token: Option<String>,
}

impl RasaClient {
    /// Builds a client for the Rasa server at `url`, with every endpoint
    /// prefixed by `base_path`.
    pub fn new(
        url: &str,
        base_path: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MasdifError> {
        let base_url = Url::parse(url)
            .map_err(|e| MasdifError::Config(format!("invalid dialog.url `{url}`: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Token {token}")).map_err(|e| {
                    MasdifError::Config(format!("invalid dialog token header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MasdifError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            base_path: base_path.to_string(),
            token,
        })
    }

    /// Joins the base path and an endpoint path, collapsing repeated slashes.
    pub fn build_path(&self, path: &str) -> String {
        join_path(&self.base_path, path)
    }

    fn url_for(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&self.build_path(path));
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        url
    }

    /// Health endpoint: `GET {base}/`.
    pub async fn health(&self) -> DialogResponse {
        self.request(Method::GET, "/", None).await
    }

    pub async fn get_tracker(&self, conversation_id: &str) -> DialogResponse {
        let path = format!("/conversations/{conversation_id}/tracker");
        self.request(Method::GET, &path, None).await
    }

    /// Posts a user message to the REST channel and returns the bot's reply elements.
    pub async fn rest_message(&self, sender: &str, message: &str, metadata: Value) -> DialogResponse {
        let body = serde_json::json!({
            "sender": sender,
            "message": message,
            "metadata": metadata,
        });
        self.request(Method::POST, "/webhooks/rest/webhook", Some(body))
            .await
    }

    /// Appends an event to the tracker. `text` is omitted for `restart`.
    pub async fn add_event(
        &self,
        conversation_id: &str,
        event: &str,
        text: Option<&str>,
        metadata: Value,
    ) -> DialogResponse {
        let mut body = serde_json::json!({
            "sender": conversation_id,
            "event": event,
            "metadata": metadata,
        });
        if let Some(text) = text {
            body["text"] = Value::from(text);
        }
        let path = format!("/conversations/{conversation_id}/tracker/events");
        self.request(Method::POST, &path, Some(body)).await
    }

    pub async fn replace_events(&self, conversation_id: &str, events: &[Value]) -> DialogResponse {
        let path = format!("/conversations/{conversation_id}/tracker/events");
        self.request(Method::PUT, &path, Some(Value::Array(events.to_vec())))
            .await
    }

    pub async fn trigger_intent(
        &self,
        conversation_id: &str,
        name: &str,
        entities: &Value,
    ) -> DialogResponse {
        let body = serde_json::json!({ "name": name, "entities": entities });
        let path = format!("/conversations/{conversation_id}/trigger_intent");
        self.request(Method::POST, &path, Some(body)).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> DialogResponse {
        let url = self.url_for(path);
        let mut req = self.client.request(method.clone(), url);
        if let Some(body) = &body {
            req = req.json(body);
        }

        let response = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                let status = transport_status(&e);
                warn!(%method, path, error = %e, status = status.as_u16(), "dialog engine unreachable");
                return status_only(status);
            }
        };

        let status = response.status();
        debug!(%method, path, status = %status, "dialog engine responded");

        let body = match response.bytes().await {
            Ok(bytes) => decode_body(&bytes),
            Err(e) => {
                let status = transport_status(&e);
                warn!(%method, path, error = %e, "failed to read dialog engine response");
                return status_only(status);
            }
        };

        DialogResponse {
            status: status.as_u16(),
            reason: reason_phrase(status),
            body,
        }
    }
}

/// `"/base/" + "/x"` becomes `"/base/x"`.
pub fn join_path(base_path: &str, path: &str) -> String {
    let joined = format!("/{base_path}/{path}");
    let mut out = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

fn transport_status(e: &reqwest::Error) -> StatusCode {
    if e.is_timeout() {
        StatusCode::GATEWAY_TIMEOUT
    } else if e.is_connect() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::BAD_GATEWAY
    }
}

fn status_only(status: StatusCode) -> DialogResponse {
    DialogResponse {
        status: status.as_u16(),
        reason: reason_phrase(status),
        body: Value::Null,
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

/// Empty bodies decode to `Null`; non-JSON bodies are kept as a string.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str, base_path: &str) -> RasaClient {
        RasaClient::new(
            base_url,
            base_path,
            Some("secret".into()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn join_path_collapses_slashes() {
        assert_eq!(join_path("", "/"), "/");
        assert_eq!(join_path("/rasa/", "/webhooks/rest/webhook"), "/rasa/webhooks/rest/webhook");
        assert_eq!(join_path("api//v1", "status"), "/api/v1/status");
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        let err = RasaClient::new("not a url", "", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, MasdifError::Config(_)));
    }

    #[tokio::test]
    async fn rest_message_sends_token_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rasa/webhooks/rest/webhook"))
            .and(query_param("token", "secret"))
            .and(header("authorization", "Token secret"))
            .and(body_json(json!({
                "sender": "c1",
                "message": "hello",
                "metadata": {"language": "is-IS"}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"recipient_id": "c1", "text": "hi"}])),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), "/rasa");
        let resp = client
            .rest_message("c1", "hello", json!({"language": "is-IS"}))
            .await;
        assert!(resp.is_success());
        assert_eq!(resp.body[0]["text"], "hi");
    }

    #[tokio::test]
    async fn restart_event_omits_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations/c1/tracker/events"))
            .and(body_json(json!({
                "sender": "c1",
                "event": "restart",
                "metadata": {"asr_generated": false}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), "");
        let resp = client
            .add_event("c1", "restart", None, json!({"asr_generated": false}))
            .await;
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn replace_events_uses_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/conversations/c1/tracker/events"))
            .and(body_json(json!([])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), "");
        let resp = client.replace_events("c1", &[]).await;
        assert_eq!(resp.body["events"], json!([]));
    }

    #[tokio::test]
    async fn non_success_status_keeps_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations/c1/tracker"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), "");
        let resp = client.get_tracker("c1").await;
        assert_eq!(resp.status, 503);
        assert_eq!(resp.reason, "Service Unavailable");
        assert_eq!(resp.body, Value::Null);
    }

    #[tokio::test]
    async fn timeout_becomes_gateway_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client =
            RasaClient::new(&server.uri(), "", None, Duration::from_millis(200)).unwrap();
        let resp = client.health().await;
        assert_eq!(resp.status, 504);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let client =
            RasaClient::new("http://127.0.0.1:9", "", None, Duration::from_secs(1)).unwrap();
        let resp = client.health().await;
        assert!(!resp.is_success());
        assert!(resp.status >= 500);
    }

    #[tokio::test]
    async fn non_json_body_is_kept_as_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello from Rasa: 3.6.2"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), "");
        let resp = client.health().await;
        assert_eq!(resp.body, json!("Hello from Rasa: 3.6.2"));
    }
}
