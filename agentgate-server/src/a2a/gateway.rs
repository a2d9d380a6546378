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

//! Registry gateway executor
//!
//! The A2A face of the registry. A message is JSON text: either
//! `{"action": "list_agents"}` or `{agent_id, input, version?, metadata?}`,
//! which is forwarded to the agent version's tool-call endpoint.

use std::sync::Arc;
use std::time::Duration;

use agentgate_core::capability::auth_schemes;
use agentgate_core::{Agent, AgentVersion, ProtocolCard};
use agentgate_storage::RegistryDb;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::executor::{AgentExecutor, ExecutorError, RequestContext};
use super::protocol::{card_url, AgentCapabilities, AgentCard, AgentSkill, Part};
use super::task::TaskUpdater;
use crate::client::{resolve_auth_headers, AuthSecrets, Invocation, ProtocolClient};

pub const GATEWAY_PATH: &str = "/api/a2a";

pub const AGENT_CALL_HINT: &str = "Send JSON text with keys: agent_id, input, optional version. \
     Example: {'agent_id': 'genie', 'input': 'List top 3 distribution centers.'}";

/// Card of the gateway itself.
pub fn gateway_card(base_url: Option<&str>) -> AgentCard {
    AgentCard {
        name: "Agentgate Registry Gateway".to_string(),
        description: "Agent registry with an A2A gateway for agent execution.".to_string(),
        url: card_url(base_url, GATEWAY_PATH),
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        capabilities: AgentCapabilities { streaming: false },
        skills: vec![AgentSkill {
            id: "registry_gateway".to_string(),
            name: "Agent Registry Gateway".to_string(),
            description: "Routes A2A requests to registered agents.".to_string(),
            tags: vec!["registry".to_string(), "mcp".to_string(), "a2a".to_string()],
            examples: vec!["Call an agent by sending JSON with agent_id and input.".to_string()],
        }],
        supports_authenticated_extended_card: false,
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        _ => false,
    }
}

fn pretty(value: &Value) -> Result<String, ExecutorError> {
    serde_json::to_string_pretty(value).map_err(|e| ExecutorError::Internal(e.to_string()))
}

/// What the store knows about a call target.
struct CallTarget {
    agent: Agent,
    version: Option<AgentVersion>,
    card: Option<ProtocolCard>,
}

pub struct RegistryExecutor {
    db: RegistryDb,
    client: Arc<dyn ProtocolClient>,
    protocol: String,
    secrets: AuthSecrets,
    timeout: Duration,
}

impl RegistryExecutor {
    pub fn new(
        db: RegistryDb,
        client: Arc<dyn ProtocolClient>,
        protocol: impl Into<String>,
        secrets: AuthSecrets,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            client,
            protocol: protocol.into(),
            secrets,
            timeout,
        }
    }

    async fn list_agents(&self) -> Result<String, ExecutorError> {
        let agents = self
            .db
            .read(|store| store.list_agents())
            .await
            .map_err(|e| ExecutorError::Internal(e.to_string()))?;
        pretty(&json!({ "agents": agents }))
    }

    async fn load_target(
        &self,
        agent_id: &str,
        version: Option<String>,
    ) -> Result<Option<CallTarget>, ExecutorError> {
        let agent_id = agent_id.to_string();
        let protocol = self.protocol.clone();
        self.db
            .read(move |store| {
                let Some(agent) = store.get_agent(&agent_id)? else {
                    return Ok(None);
                };
                let version = match &version {
                    Some(v) => store.get_version(&agent_id, v)?,
                    None => store.get_default_version(&agent_id)?,
                };
                let card = match &version {
                    Some(v) => store.get_card(&agent_id, Some(v.version.as_str()), &protocol)?,
                    None => None,
                };
                Ok(Some(CallTarget {
                    agent,
                    version,
                    card,
                }))
            })
            .await
            .map_err(|e| ExecutorError::Internal(e.to_string()))
    }

    /// Forward a call. The returned text becomes the `agent_result` artifact;
    /// lookup problems and call failures are reported there, not raised.
    async fn call_agent(&self, payload: &Map<String, Value>) -> Result<String, ExecutorError> {
        let agent_id = scalar_text(payload.get("agent_id")).unwrap_or_default();
        let version = scalar_text(payload.get("version"));
        if is_blank(payload.get("input")) {
            return Ok("Missing input text.".to_string());
        }
        let prompt = payload.get("input").cloned().unwrap_or(Value::Null);

        let Some(target) = self.load_target(&agent_id, version).await? else {
            return Ok(format!("Unknown agent_id '{}'.", agent_id));
        };
        let Some(version) = target.version else {
            return Ok(format!("No version data for '{}'.", agent_id));
        };
        let Some(endpoint) = version.endpoint_url.clone().filter(|u| !u.is_empty()) else {
            return Ok(format!(
                "Agent '{}' is missing endpoint_url. Register an API endpoint to enable invocation.",
                agent_id
            ));
        };

        let headers = match &target.card {
            Some(card) => {
                let auth = resolve_auth_headers(&auth_schemes(&card.card_document), &self.secrets);
                if !auth.unknown_schemes.is_empty() {
                    warn!(
                        "Ignoring unsupported auth schemes for agent {}: {:?}",
                        agent_id, auth.unknown_schemes
                    );
                }
                auth.headers
            }
            None => Default::default(),
        };

        let invocation = Invocation {
            endpoint,
            goal: None,
            input: prompt,
            metadata: match payload.get("metadata") {
                Some(Value::Object(m)) => Value::Object(m.clone()),
                _ => json!({}),
            },
            headers,
            timeout: self.timeout,
        };

        info!(
            "Forwarding A2A call: agent_id={}, version={}, endpoint={}",
            agent_id, version.version, invocation.endpoint
        );
        let agent_card = target.card.map(|c| c.card_document);
        let body = match self.client.invoke(&invocation).await {
            Ok(result) => json!({
                "agent": target.agent,
                "agent_card": agent_card,
                "result": result,
            }),
            Err(e) => {
                warn!("Call to agent {} failed: {}", agent_id, e);
                json!({
                    "agent": target.agent,
                    "agent_card": agent_card,
                    "error": e.to_string(),
                })
            }
        };
        pretty(&body)
    }
}

#[async_trait]
impl AgentExecutor for RegistryExecutor {
    async fn execute(
        &self,
        context: &RequestContext,
        updater: &mut TaskUpdater,
    ) -> Result<(), ExecutorError> {
        let payload = match serde_json::from_str::<Value>(&context.user_input) {
            Ok(Value::Object(map)) if !map.is_empty() => map,
            _ => {
                updater.requires_input(AGENT_CALL_HINT)?;
                return Ok(());
            }
        };

        if payload.get("action").and_then(Value::as_str) == Some("list_agents") {
            let text = self.list_agents().await?;
            updater.add_artifact("agents", vec![Part::text(text)])?;
            updater.complete()?;
            return Ok(());
        }

        if is_blank(payload.get("agent_id")) {
            updater.requires_input(&format!("Missing agent_id. {}", AGENT_CALL_HINT))?;
            return Ok(());
        }

        let text = self.call_agent(&payload).await?;
        updater.add_artifact("agent_result", vec![Part::text(text)])?;
        updater.complete()?;
        Ok(())
    }
}
