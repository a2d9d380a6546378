// Copyright 2025 Agentgate Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Tool-call client.
//!
//! Sends the prompt as a single user message and reports whatever came back
//! in an envelope; only connection failures and timeouts are errors.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use super::{apply_headers, with_deadline, ClientError, Invocation, ProtocolClient};

pub const REQUEST_TYPE: &str = "input_messages";

/// Request body for a prompt.
pub fn build_request(prompt: &Value, metadata: &Value) -> Value {
    json!({
        "input": [{"role": "user", "content": prompt}],
        "metadata": metadata,
    })
}

/// Response body as reported in the envelope.
pub fn parse_payload(body: &[u8]) -> Value {
    if body.is_empty() {
        return json!({"raw_text": "", "note": "Empty response body"});
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| json!({"raw_text": String::from_utf8_lossy(body)}))
}

#[derive(Debug, Clone, Default)]
pub struct ToolCallClient {
    http: reqwest::Client,
}

impl ToolCallClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn send(&self, invocation: &Invocation) -> Result<Value, ClientError> {
        let request_body = build_request(&invocation.input, &invocation.metadata);

        let request = apply_headers(self.http.post(&invocation.endpoint), &invocation.headers);
        let response = request.json(&request_body).send().await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(json!({
            "request_type": REQUEST_TYPE,
            "request_body": request_body,
            "status_code": status_code,
            "content_type": content_type,
            "payload": parse_payload(&body),
        }))
    }
}

#[async_trait]
impl ProtocolClient for ToolCallClient {
    async fn invoke(&self, invocation: &Invocation) -> Result<Value, ClientError> {
        with_deadline(invocation.timeout, self.send(invocation)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::spawn;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn invocation(endpoint: String) -> Invocation {
        Invocation {
            endpoint,
            goal: None,
            input: json!("List top 3 distribution centers."),
            metadata: json!({}),
            headers: BTreeMap::new(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_parse_payload_variants() {
        assert_eq!(parse_payload(br#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(parse_payload(b"hi"), json!({"raw_text": "hi"}));
        assert_eq!(
            parse_payload(b""),
            json!({"raw_text": "", "note": "Empty response body"})
        );
    }

    #[tokio::test]
    async fn test_envelope_for_json_response() {
        let app = Router::new().route(
            "/invocations",
            post(|Json(body): Json<Value>| async move { Json(json!({"received": body})) }),
        );
        let addr = spawn(app).await;

        let envelope = ToolCallClient::default()
            .invoke(&invocation(format!("http://{}/invocations", addr)))
            .await
            .unwrap();

        assert_eq!(envelope["request_type"], "input_messages");
        assert_eq!(envelope["status_code"], 200);
        assert_eq!(envelope["content_type"], "application/json");
        assert_eq!(
            envelope["request_body"]["input"][0],
            json!({"role": "user", "content": "List top 3 distribution centers."})
        );
        assert_eq!(
            envelope["payload"]["received"]["input"][0]["role"],
            "user"
        );
    }

    #[tokio::test]
    async fn test_error_status_is_still_an_envelope() {
        let app = Router::new().route(
            "/invocations",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let addr = spawn(app).await;

        let envelope = ToolCallClient::default()
            .invoke(&invocation(format!("http://{}/invocations", addr)))
            .await
            .unwrap();
        assert_eq!(envelope["status_code"], 500);
        assert_eq!(envelope["payload"], json!({"raw_text": "boom"}));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = ToolCallClient::default()
            .invoke(&invocation(format!("http://{}/invocations", addr)))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
