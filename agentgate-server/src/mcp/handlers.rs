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

//! MCP request handlers

use std::sync::Arc;

use agentgate_storage::RegistryDb;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::protocol::*;
use super::tools::{ToolContext, ToolError, ToolRegistry};

/// URI of the agent id listing.
pub const AGENT_CARDS_URI: &str = "resource://agent_cards";

const JSON_MIME: &str = "application/json";

/// MCP request handler
pub struct McpHandler {
    tools: Arc<ToolRegistry>,
    db: RegistryDb,
    protocol: String,
}

impl McpHandler {
    pub fn new(tools: Arc<ToolRegistry>, db: RegistryDb, protocol: impl Into<String>) -> Self {
        Self {
            tools,
            db,
            protocol: protocol.into(),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle a request. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "MCP request");

        if request.method.starts_with("notifications/") {
            return None;
        }

        let id = request.id.clone();
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.id, request.params).await,
            "resources/list" => self.handle_list_resources().await,
            "resources/read" => self.handle_read_resource(request.params).await,
            method => Err(JsonRpcError::method_not_found(method)),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing initialize params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
            })?;

        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = %params.protocol_version,
            "MCP client initialized"
        );

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                resources: Some(ResourcesCapability::default()),
                tools: Some(ToolsCapability::default()),
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        to_result(&result)
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let tools = self
            .tools
            .list()
            .into_iter()
            .map(|entry| Tool {
                name: entry.name,
                description: Some(entry.description),
                input_schema: entry.input_schema,
            })
            .collect();
        to_result(&ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn handle_call_tool(
        &self,
        request_id: JsonRpcId,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tool call params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
            })?;

        let context = ToolContext { request_id };
        let result = match self
            .tools
            .execute(&params.name, params.arguments, &context)
            .await
        {
            Ok(output) => {
                let text = serde_json::to_string_pretty(&output.content)
                    .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
                CallToolResult {
                    content: vec![ToolContent::Text { text }],
                    structured_content: Some(output.content),
                    is_error: None,
                }
            }
            Err(ToolError::NotFound(name)) => {
                return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", name)));
            }
            Err(ToolError::InvalidParams(message)) => {
                return Err(JsonRpcError::invalid_params(message));
            }
            Err(ToolError::Execution(message)) => {
                warn!(tool = %params.name, error = %message, "Tool execution failed");
                CallToolResult {
                    content: vec![ToolContent::Text { text: message }],
                    structured_content: None,
                    is_error: Some(true),
                }
            }
        };
        to_result(&result)
    }

    async fn agent_ids(&self) -> Result<Vec<String>, JsonRpcError> {
        let protocol = self.protocol.clone();
        let cards = self
            .db
            .read(move |store| store.list_cards(&protocol, true))
            .await
            .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
        Ok(cards.into_iter().map(|card| card.agent_id).collect())
    }

    async fn handle_list_resources(&self) -> Result<Value, JsonRpcError> {
        let mut resources = vec![Resource {
            uri: AGENT_CARDS_URI.to_string(),
            name: "agent_cards".to_string(),
            description: Some("Ids of every agent with a card".to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        }];
        resources.extend(self.agent_ids().await?.into_iter().map(|agent_id| Resource {
            uri: format!("{}/{}", AGENT_CARDS_URI, agent_id),
            name: agent_id,
            description: Some("Latest agent card".to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        }));

        to_result(&ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing uri"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
            })?;

        let document = if params.uri == AGENT_CARDS_URI {
            json!({ "agents": self.agent_ids().await? })
        } else if let Some(agent_id) = params
            .uri
            .strip_prefix(AGENT_CARDS_URI)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|id| !id.is_empty())
        {
            let agent_id = agent_id.to_string();
            let protocol = self.protocol.clone();
            let card = self
                .db
                .read(move |store| store.get_card(&agent_id, None, &protocol))
                .await
                .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
            match card {
                Some(card) => card.card_document.to_value(),
                None => return Err(resource_not_found()),
            }
        } else {
            return Err(resource_not_found());
        };

        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
        to_result(&ReadResourceResult {
            contents: vec![ResourceContent {
                uri: params.uri,
                mime_type: Some(JSON_MIME.to_string()),
                text,
            }],
        })
    }
}

fn resource_not_found() -> JsonRpcError {
    JsonRpcError::invalid_params("Resource not found.")
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::ListAvailableAgentsTool;
    use agentgate_core::{CardDocument, CardRegistration};
    use agentgate_storage::Namespace;
    use serde_json::Map;
    use tempfile::TempDir;

    async fn handler(dir: &TempDir) -> McpHandler {
        let db = RegistryDb::open(dir.path().join("registry.db"), Namespace::default())
            .await
            .unwrap();
        let registration = CardRegistration {
            agent_id: "genie".to_string(),
            name: "Genie".to_string(),
            description: String::new(),
            owner: None,
            status: None,
            version: "1".to_string(),
            endpoint_url: None,
            tags: Map::new(),
            protocol: "a2a".to_string(),
            card_document: CardDocument::from_value(
                json!({"name": "Genie", "url": "http://genie"}),
            ),
        };
        db.write(move |store| store.register_card(&registration))
            .await
            .unwrap();

        let tools = Arc::new(ToolRegistry::new());
        tools
            .register(Arc::new(ListAvailableAgentsTool::new(db.clone(), "a2a")))
            .unwrap();
        McpHandler::new(tools, db, "a2a")
    }

    async fn call(handler: &McpHandler, method: &str, params: Value) -> JsonRpcResponse {
        handler
            .handle_request(JsonRpcRequest::new(JsonRpcId::Number(1), method, Some(params)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_notifications() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir).await;

        let response = call(
            &handler,
            "initialize",
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "1"}
            }),
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());

        let none = handler
            .handle_request(JsonRpcRequest::new(
                JsonRpcId::Null,
                "notifications/initialized",
                None,
            ))
            .await;
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_tools_call_returns_text_and_structured_content() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir).await;

        let response = call(&handler, "tools/list", json!({})).await;
        assert_eq!(response.result.unwrap()["tools"][0]["name"], "list_available_agents");

        let response = call(
            &handler,
            "tools/call",
            json!({"name": "list_available_agents", "arguments": {}}),
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["structuredContent"]["agents"][0]["name"], "Genie");
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("\"Genie\""));

        let response = call(&handler, "tools/call", json!({"name": "nope"})).await;
        assert_eq!(response.error.unwrap().code, -32602);

        let response = call(
            &handler,
            "tools/call",
            json!({"name": "list_available_agents", "arguments": {"limit": "ten"}}),
        )
        .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_resources() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir).await;

        let response = call(&handler, "resources/list", json!({})).await;
        let resources = response.result.unwrap()["resources"].clone();
        assert_eq!(resources[0]["uri"], AGENT_CARDS_URI);
        assert_eq!(resources[1]["uri"], "resource://agent_cards/genie");

        let response = call(&handler, "resources/read", json!({"uri": AGENT_CARDS_URI})).await;
        let text = response.result.unwrap()["contents"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        let listing: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(listing, json!({"agents": ["genie"]}));

        let response = call(
            &handler,
            "resources/read",
            json!({"uri": "resource://agent_cards/genie"}),
        )
        .await;
        let text = response.result.unwrap()["contents"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        let card: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(card["agentVersion"], "1");

        let response = call(
            &handler,
            "resources/read",
            json!({"uri": "resource://agent_cards/ghost"}),
        )
        .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Resource not found.");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir).await;
        let response = call(&handler, "prompts/list", json!({})).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }
}
