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

//! Remote MCP tool catalog
//!
//! Discovers the tools of remote MCP servers and calls them by name. Each
//! discovered tool is a plain record pointing back at its server.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::protocol::*;

/// A tool offered by a remote MCP server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTool {
    pub name: String,
    /// Function-style spec: `{type: "function", function: {name, description, parameters}}`.
    pub spec: Value,
    pub server_url: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate tool name '{name}' from {server_url}")]
    DuplicateTool { name: String, server_url: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{server_url} returned JSON-RPC error {}: {}", .error.code, .error.message)]
    Rpc {
        server_url: String,
        error: JsonRpcError,
    },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        CatalogError::Transport(e.to_string())
    }
}

/// Build the function-style spec for a discovered tool. A schema without
/// `properties` gets an empty one.
pub fn build_tool_spec(tool: &Tool) -> Value {
    let mut parameters = match &tool.input_schema {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    parameters
        .entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    parameters
        .entry("properties")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));

    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": Value::Object(parameters),
        }
    })
}

/// Content types a streamable-HTTP MCP server may answer with.
const ACCEPT_STREAMABLE: &str = "application/json, text/event-stream";
const SESSION_HEADER: &str = "mcp-session-id";

/// JSON-RPC client for MCP over streamable HTTP.
///
/// Replies may be plain JSON or an event stream carrying the response in a
/// `data:` frame. A session id handed out by `initialize` is echoed on every
/// later request to that server.
pub struct McpRpcClient {
    http: reqwest::Client,
    timeout: Duration,
    next_id: AtomicI64,
    sessions: DashMap<String, String>,
}

impl McpRpcClient {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            http,
            timeout,
            next_id: AtomicI64::new(1),
            sessions: DashMap::new(),
        }
    }

    fn post(&self, server_url: &str, body: &impl Serialize) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .post(server_url)
            .timeout(self.timeout)
            .header(ACCEPT, ACCEPT_STREAMABLE)
            .json(body);
        let session = self
            .sessions
            .get(server_url)
            .map(|entry| entry.value().clone());
        match session {
            Some(session) => builder.header(SESSION_HEADER, session),
            None => builder,
        }
    }

    pub async fn request(
        &self,
        server_url: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, CatalogError> {
        let id = JsonRpcId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let request = JsonRpcRequest::new(id.clone(), method, Some(params));
        debug!(server_url, method, "MCP request");

        let response = self
            .post(server_url, &request)
            .send()
            .await?
            .error_for_status()?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.sessions
                .insert(server_url.to_string(), session.to_string());
        }
        let streamed = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let body = response.text().await?;

        let response: JsonRpcResponse = if streamed {
            parse_event_stream(&body, &id).ok_or_else(|| {
                CatalogError::Protocol(format!("{} streamed no response to {}", server_url, method))
            })?
        } else {
            serde_json::from_str(&body).map_err(|e| CatalogError::Protocol(e.to_string()))?
        };

        if let Some(error) = response.error {
            return Err(CatalogError::Rpc {
                server_url: server_url.to_string(),
                error,
            });
        }
        response
            .result
            .ok_or_else(|| CatalogError::Protocol(format!("{} sent no result", server_url)))
    }

    /// Fire a notification. Servers answer 202 with no body; a refusal is
    /// logged and otherwise ignored.
    async fn notify(&self, server_url: &str, method: &str) {
        let body = json!({"jsonrpc": JSONRPC_VERSION, "method": method});
        match self.post(server_url, &body).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(server_url, method, status = %response.status(), "MCP notification refused")
            }
            Err(e) => warn!(server_url, method, "MCP notification failed: {}", e),
        }
    }

    async fn initialize(&self, server_url: &str) -> Result<(), CatalogError> {
        self.sessions.remove(server_url);
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
        });
        self.request(server_url, "initialize", params).await?;
        self.notify(server_url, "notifications/initialized").await;
        Ok(())
    }
}

/// Find the response to `id` among the `data:` frames of an event stream.
/// Multi-line data of one event is joined with newlines.
fn parse_event_stream(body: &str, id: &JsonRpcId) -> Option<JsonRpcResponse> {
    body.replace("\r\n", "\n")
        .split("\n\n")
        .filter_map(|event| {
            let data: Vec<&str> = event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|data| data.strip_prefix(' ').unwrap_or(data))
                .collect();
            if data.is_empty() {
                return None;
            }
            serde_json::from_str::<JsonRpcResponse>(&data.join("\n")).ok()
        })
        .find(|response| {
            &response.id == id && (response.result.is_some() || response.error.is_some())
        })
}

/// Tools discovered across a set of MCP servers.
pub struct RemoteToolCatalog {
    client: McpRpcClient,
    tools: Vec<RemoteTool>,
}

impl RemoteToolCatalog {
    /// Query every server's `tools/list`. Tool names must be unique across
    /// servers.
    pub async fn discover(
        client: McpRpcClient,
        server_urls: &[String],
    ) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        let mut tools = Vec::new();

        for server_url in server_urls {
            client.initialize(server_url).await?;
            let result = client.request(server_url, "tools/list", json!({})).await?;
            let listed: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| CatalogError::Protocol(e.to_string()))?;

            for tool in listed.tools {
                if !names.insert(tool.name.clone()) {
                    return Err(CatalogError::DuplicateTool {
                        name: tool.name,
                        server_url: server_url.clone(),
                    });
                }
                tools.push(RemoteTool {
                    spec: build_tool_spec(&tool),
                    name: tool.name,
                    server_url: server_url.clone(),
                });
            }
        }

        info!(
            "Discovered {} MCP tools across {} servers",
            tools.len(),
            server_urls.len()
        );
        Ok(Self { client, tools })
    }

    pub fn tools(&self) -> &[RemoteTool] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&RemoteTool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Function specs of every tool, in discovery order.
    pub fn specs(&self) -> Vec<Value> {
        self.tools.iter().map(|tool| tool.spec.clone()).collect()
    }

    /// Call `name` on its server and return the concatenated text content.
    pub async fn call(&self, name: &str, args: Value) -> Result<String, CatalogError> {
        let tool = self
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTool(name.to_string()))?;

        let result = self
            .client
            .request(
                &tool.server_url,
                "tools/call",
                json!({"name": name, "arguments": args}),
            )
            .await?;
        let result: CallToolResult =
            serde_json::from_value(result).map_err(|e| CatalogError::Protocol(e.to_string()))?;
        Ok(result.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::spawn;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::{routing::post, Json, Router};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn fake_server(tool_names: &'static [&'static str]) -> Router {
        Router::new().route(
            "/",
            post(move |Json(request): Json<JsonRpcRequest>| async move {
                let result = match request.method.as_str() {
                    "initialize" => json!({
                        "protocolVersion": MCP_PROTOCOL_VERSION,
                        "capabilities": {},
                        "serverInfo": {"name": "fake", "version": "0"}
                    }),
                    "tools/list" => json!({
                        "tools": tool_names
                            .iter()
                            .map(|name| json!({"name": name, "inputSchema": {"type": "object"}}))
                            .collect::<Vec<_>>()
                    }),
                    "tools/call" => {
                        let params = request.params.unwrap_or_default();
                        let name = params["name"].as_str().unwrap_or("");
                        json!({"content": [
                            {"type": "text", "text": format!("called {} ", name)},
                            {"type": "text", "text": params["arguments"].to_string()}
                        ]})
                    }
                    _ => Value::Null,
                };
                Json(JsonRpcResponse::success(request.id, result))
            }),
        )
    }

    /// Streamable-HTTP server: hands out a session on `initialize`, refuses
    /// requests without it and answers over an event stream.
    fn session_server(seen: Arc<Mutex<Vec<String>>>) -> Router {
        Router::new().route(
            "/",
            post(move |headers: HeaderMap, Json(request): Json<JsonRpcRequest>| {
                let seen = seen.clone();
                async move {
                    let accept = headers
                        .get("accept")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("");
                    if !accept.contains("text/event-stream") {
                        return StatusCode::NOT_ACCEPTABLE.into_response();
                    }
                    seen.lock().push(request.method.clone());

                    if request.method == "initialize" {
                        let result = json!({
                            "protocolVersion": MCP_PROTOCOL_VERSION,
                            "capabilities": {},
                            "serverInfo": {"name": "streamable", "version": "0"}
                        });
                        return (
                            [(SESSION_HEADER, "s-42")],
                            Json(JsonRpcResponse::success(request.id, result)),
                        )
                            .into_response();
                    }
                    let session = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
                    if session != Some("s-42") {
                        return StatusCode::BAD_REQUEST.into_response();
                    }
                    if request.method.starts_with("notifications/") {
                        return StatusCode::ACCEPTED.into_response();
                    }

                    let result = match request.method.as_str() {
                        "tools/list" => json!({"tools": [{"name": "echo", "inputSchema": {}}]}),
                        _ => json!({"content": [{"type": "text", "text": "streamed"}]}),
                    };
                    let frame =
                        serde_json::to_string(&JsonRpcResponse::success(request.id, result))
                            .unwrap();
                    (
                        [("content-type", "text/event-stream")],
                        format!(
                            ": keep-alive\n\nevent: message\r\ndata: {}\r\n\r\n",
                            frame
                        ),
                    )
                        .into_response()
                }
            }),
        )
    }

    fn client() -> McpRpcClient {
        McpRpcClient::new(reqwest::Client::new(), Duration::from_secs(5))
    }

    #[test]
    fn test_spec_defaults_properties() {
        let tool = Tool {
            name: "lookup".to_string(),
            description: None,
            input_schema: Value::Null,
        };
        let spec = build_tool_spec(&tool);
        assert_eq!(spec["function"]["name"], "lookup");
        assert_eq!(spec["function"]["parameters"]["properties"], json!({}));
        assert_eq!(spec["function"]["parameters"]["type"], "object");
    }

    #[tokio::test]
    async fn test_discover_and_call() {
        let addr = spawn(fake_server(&["lookup", "search"])).await;
        let url = format!("http://{}/", addr);

        let catalog = RemoteToolCatalog::discover(client(), &[url.clone()])
            .await
            .unwrap();
        assert_eq!(catalog.tools().len(), 2);
        assert_eq!(catalog.get("search").unwrap().server_url, url);

        let text = catalog.call("lookup", json!({"q": 1})).await.unwrap();
        assert_eq!(text, "called lookup {\"q\":1}");

        assert!(matches!(
            catalog.call("missing", json!({})).await,
            Err(CatalogError::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn test_streamable_session_and_event_stream() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let addr = spawn(session_server(seen.clone())).await;
        let url = format!("http://{}/", addr);

        let catalog = RemoteToolCatalog::discover(client(), &[url]).await.unwrap();
        assert_eq!(catalog.tools().len(), 1);
        assert_eq!(catalog.call("echo", json!({})).await.unwrap(), "streamed");

        assert_eq!(
            *seen.lock(),
            vec!["initialize", "notifications/initialized", "tools/list", "tools/call"]
        );
    }

    #[test]
    fn test_event_stream_picks_matching_response() {
        let body = concat!(
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"stale\":true}}\n\n",
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\n",
            "data: \"id\":2,\"result\":{\"ok\":true}}\n\n",
        );
        let response = parse_event_stream(body, &JsonRpcId::Number(2)).unwrap();
        assert_eq!(response.result, Some(json!({"ok": true})));
        assert!(parse_event_stream(body, &JsonRpcId::Number(3)).is_none());
        assert!(parse_event_stream("", &JsonRpcId::Number(1)).is_none());
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let first = spawn(fake_server(&["lookup"])).await;
        let second = spawn(fake_server(&["lookup"])).await;
        let urls = vec![format!("http://{}/", first), format!("http://{}/", second)];

        let err = RemoteToolCatalog::discover(client(), &urls)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::DuplicateTool { ref name, .. } if name == "lookup"));
    }
}
