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

//! Registry tools: agent discovery and invocation.

use std::sync::Arc;
use std::time::Duration;

use agentgate_core::{list_available, ListQuery};
use agentgate_storage::RegistryDb;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::registry::{McpTool, ToolContext, ToolError, ToolResult};
use crate::gateway::InvocationRouter;

fn parse_params<T: for<'de> Deserialize<'de>>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// `list_available_agents`
pub struct ListAvailableAgentsTool {
    db: RegistryDb,
    protocol: String,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ListAgentsParams {
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    skills: Option<Vec<String>>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    include_full_card: bool,
    #[serde(default)]
    list_all_versions: bool,
}

impl ListAvailableAgentsTool {
    pub fn new(db: RegistryDb, protocol: impl Into<String>) -> Self {
        Self {
            db,
            protocol: protocol.into(),
            schema: json!({
                "type": "object",
                "properties": {
                    "tags": {
                        "type": ["array", "null"],
                        "items": {"type": "string"},
                        "description": "Only agents carrying every one of these tags"
                    },
                    "skills": {
                        "type": ["array", "null"],
                        "items": {"type": "string"},
                        "description": "Only agents offering at least one of these skill ids"
                    },
                    "limit": {
                        "type": ["integer", "null"],
                        "description": "Maximum agents returned (1-100, default 20)"
                    },
                    "include_full_card": {"type": "boolean", "default": false},
                    "list_all_versions": {"type": "boolean", "default": false}
                }
            }),
        }
    }
}

#[async_trait]
impl McpTool for ListAvailableAgentsTool {
    fn name(&self) -> &str {
        "list_available_agents"
    }

    fn description(&self) -> &str {
        "List registered agents, optionally filtered by tags (all must match) and skills (any may match)."
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let params: ListAgentsParams = parse_params(params)?;
        let query = ListQuery {
            tags: params.tags.unwrap_or_default(),
            skills: params.skills.unwrap_or_default(),
            limit: params.limit.unwrap_or(agentgate_core::capability::DEFAULT_LIST_LIMIT),
            include_full_card: params.include_full_card,
            all_versions: params.list_all_versions,
        };

        let protocol = self.protocol.clone();
        let rows = self
            .db
            .read(move |store| store.list_cards(&protocol, false))
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let listing = list_available(&rows, &query);
        debug!(
            request_id = ?context.request_id,
            matched = listing.agents.len(),
            "list_available_agents"
        );
        let content =
            serde_json::to_value(listing).map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolResult { content })
    }
}

/// `invoke_agent`
pub struct InvokeAgentTool {
    router: Arc<InvocationRouter>,
    default_timeout_secs: u64,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct InvokeParams {
    agent_id: String,
    task: Map<String, Value>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl InvokeAgentTool {
    pub fn new(router: Arc<InvocationRouter>, default_timeout: Duration) -> Self {
        let default_timeout_secs = default_timeout.as_secs().max(1);
        Self {
            router,
            default_timeout_secs,
            schema: json!({
                "type": "object",
                "properties": {
                    "agent_id": {"type": "string"},
                    "task": {
                        "type": "object",
                        "description": "{goal, input?, metadata?}"
                    },
                    "timeout_seconds": {
                        "type": "integer",
                        "minimum": 1,
                        "default": default_timeout_secs
                    }
                },
                "required": ["agent_id", "task"]
            }),
        }
    }
}

#[async_trait]
impl McpTool for InvokeAgentTool {
    fn name(&self) -> &str {
        "invoke_agent"
    }

    fn description(&self) -> &str {
        "Send a task to a registered agent and return its result."
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(
        &self,
        params: Value,
        _context: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: InvokeParams = parse_params(params)?;
        let timeout =
            Duration::from_secs(params.timeout_seconds.unwrap_or(self.default_timeout_secs));

        let outcome = self.router.invoke(&params.agent_id, &params.task, timeout).await;
        let content =
            serde_json::to_value(outcome).map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolResult { content })
    }
}
