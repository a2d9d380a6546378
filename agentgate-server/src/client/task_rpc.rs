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

//! Task-RPC (A2A task) client.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tracing::debug;

use super::{apply_headers, with_deadline, ClientError, Invocation, ProtocolClient};

/// POSTs `{goal, input, metadata}` to the agent's invocation URL.
#[derive(Debug, Clone, Default)]
pub struct TaskRpcClient {
    http: reqwest::Client,
}

impl TaskRpcClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn send(&self, invocation: &Invocation) -> Result<Value, ClientError> {
        let body = json!({
            "goal": invocation.goal,
            "input": invocation.input,
            "metadata": invocation.metadata,
        });

        let request = apply_headers(self.http.post(&invocation.endpoint), &invocation.headers);
        let response = request.json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!(
                "{} returned HTTP {}",
                invocation.endpoint, status
            )));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        let text = response.text().await?;
        debug!(endpoint = %invocation.endpoint, bytes = text.len(), "Task response received");

        if is_json {
            serde_json::from_str(&text)
                .map_err(|e| ClientError::Protocol(format!("invalid JSON response: {}", e)))
        } else {
            Ok(json!({ "text": text }))
        }
    }
}

#[async_trait]
impl ProtocolClient for TaskRpcClient {
    async fn invoke(&self, invocation: &Invocation) -> Result<Value, ClientError> {
        with_deadline(invocation.timeout, self.send(invocation)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::spawn;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn invocation(endpoint: String, timeout: Duration) -> Invocation {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer key-123".to_string());
        Invocation {
            endpoint,
            goal: Some("summarize".to_string()),
            input: json!({"text": "hello"}),
            metadata: json!({"trace": "t-1"}),
            headers,
            timeout,
        }
    }

    #[tokio::test]
    async fn test_json_response_is_parsed() {
        let app = Router::new().route(
            "/a2a",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({"echo": body, "auth": auth}))
            }),
        );
        let addr = spawn(app).await;

        let client = TaskRpcClient::default();
        let result = client
            .invoke(&invocation(format!("http://{}/a2a", addr), Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result["echo"]["goal"], "summarize");
        assert_eq!(result["echo"]["input"], json!({"text": "hello"}));
        assert_eq!(result["echo"]["metadata"], json!({"trace": "t-1"}));
        assert_eq!(result["auth"], "Bearer key-123");
    }

    #[tokio::test]
    async fn test_text_response_is_wrapped() {
        let app = Router::new().route("/a2a", post(|| async { "plain answer" }));
        let addr = spawn(app).await;

        let result = TaskRpcClient::default()
            .invoke(&invocation(format!("http://{}/a2a", addr), Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(result, json!({"text": "plain answer"}));
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let app = Router::new().route("/a2a", post(|| async { StatusCode::BAD_GATEWAY }));
        let addr = spawn(app).await;

        let err = TaskRpcClient::default()
            .invoke(&invocation(format!("http://{}/a2a", addr), Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn test_slow_agent_times_out() {
        let app = Router::new().route(
            "/a2a",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = spawn(app).await;

        let err = TaskRpcClient::default()
            .invoke(&invocation(
                format!("http://{}/a2a", addr),
                Duration::from_millis(100),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
    }
}
