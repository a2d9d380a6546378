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

//! Invocation Router
//!
//! Turns `(agent_id, task)` into a call against the agent's latest card.
//! Every failure is reported in the returned outcome; nothing here raises.

use std::sync::Arc;
use std::time::Duration;

use agentgate_core::capability::{auth_schemes, invocation_url};
use agentgate_storage::RegistryDb;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::client::{resolve_auth_headers, AuthSecrets, ClientError, Invocation, ProtocolClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Success,
    Error,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub message: String,
}

/// Result of routing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    pub status: InvocationStatus,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
}

impl InvocationOutcome {
    pub fn success(agent_id: &str, result: Value) -> Self {
        Self {
            status: InvocationStatus::Success,
            agent_id: agent_id.to_string(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(agent_id: &str, message: impl Into<String>) -> Self {
        Self::failed(InvocationStatus::Error, agent_id, message)
    }

    pub fn timeout(agent_id: &str) -> Self {
        Self::failed(InvocationStatus::Timeout, agent_id, "A2A request timed out")
    }

    fn failed(status: InvocationStatus, agent_id: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            agent_id: agent_id.to_string(),
            result: None,
            error: Some(OutcomeError {
                message: message.into(),
            }),
        }
    }
}

/// Join a relative (`/...`) card URL onto the gateway base URL.
pub fn resolve_invocation_url(url: &str, base_url: Option<&str>) -> Result<String, String> {
    if !url.starts_with('/') {
        return Ok(url.to_string());
    }
    match base_url.map(|b| b.trim_end_matches('/')).filter(|b| !b.is_empty()) {
        Some(base) => Ok(format!("{}{}", base, url)),
        None => Err("Relative a2a_url requires registry_base_url in config.".to_string()),
    }
}

fn goal_text(task: &Map<String, Value>) -> Option<String> {
    match task.get("goal") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(true)) => Some("true".to_string()),
        _ => None,
    }
}

fn object_or_empty(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(other) => other.clone(),
    }
}

/// Routes tasks to registered agents.
pub struct InvocationRouter {
    db: RegistryDb,
    client: Arc<dyn ProtocolClient>,
    protocol: String,
    base_url: Option<String>,
    secrets: AuthSecrets,
}

impl InvocationRouter {
    pub fn new(
        db: RegistryDb,
        client: Arc<dyn ProtocolClient>,
        protocol: impl Into<String>,
        base_url: Option<String>,
        secrets: AuthSecrets,
    ) -> Self {
        Self {
            db,
            client,
            protocol: protocol.into(),
            base_url,
            secrets,
        }
    }

    /// Invoke `agent_id` with `task` (`{goal, input?, metadata?}`).
    pub async fn invoke(
        &self,
        agent_id: &str,
        task: &Map<String, Value>,
        timeout: Duration,
    ) -> InvocationOutcome {
        let owned_id = agent_id.to_string();
        let protocol = self.protocol.clone();
        let card = match self
            .db
            .read(move |store| store.get_card(&owned_id, None, &protocol))
            .await
        {
            Ok(Some(card)) => card,
            Ok(None) => {
                return InvocationOutcome::error(
                    agent_id,
                    format!("Unknown agent_id: {}", agent_id),
                )
            }
            Err(e) => {
                warn!("Card lookup failed for agent {}: {}", agent_id, e);
                return InvocationOutcome::error(agent_id, e.to_string());
            }
        };

        let Some(url) = invocation_url(&card.card_document) else {
            return InvocationOutcome::error(
                agent_id,
                format!("Missing a2a_url for agent_id: {}", agent_id),
            );
        };
        let endpoint = match resolve_invocation_url(&url, self.base_url.as_deref()) {
            Ok(endpoint) => endpoint,
            Err(message) => return InvocationOutcome::error(agent_id, message),
        };

        let Some(goal) = goal_text(task) else {
            return InvocationOutcome::error(agent_id, "Missing task.goal");
        };

        let auth = resolve_auth_headers(&auth_schemes(&card.card_document), &self.secrets);
        if !auth.unknown_schemes.is_empty() {
            warn!(
                "Ignoring unsupported auth schemes for agent {}: {:?}",
                agent_id, auth.unknown_schemes
            );
        }

        let invocation = Invocation {
            endpoint,
            goal: Some(goal),
            input: object_or_empty(task.get("input")),
            metadata: object_or_empty(task.get("metadata")),
            headers: auth.headers,
            timeout,
        };

        info!(
            "Invoking agent: agent_id={}, version={}, endpoint={}",
            agent_id, card.version, invocation.endpoint
        );
        match self.client.invoke(&invocation).await {
            Ok(result) => InvocationOutcome::success(agent_id, result),
            Err(ClientError::Timeout(_)) => {
                warn!("Agent {} timed out after {:?}", agent_id, timeout);
                InvocationOutcome::timeout(agent_id)
            }
            Err(e) => InvocationOutcome::error(agent_id, e.to_string()),
        }
    }
}
