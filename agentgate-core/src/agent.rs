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

//! Registry records: agents, their versions, and per-protocol cards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::card::CardDocument;
use crate::error::{CoreError, Result};

/// Protocol name of task-RPC (A2A) cards.
pub const A2A_PROTOCOL: &str = "a2a";

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: Option<String>,
    pub status: Option<String>,
    /// Version used when a caller does not ask for one.
    pub default_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One deployable version of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVersion {
    pub agent_id: String,
    pub version: String,
    /// Tool-call endpoint the gateway forwards to.
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub tags: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A capability card for one `(agent, version, protocol)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolCard {
    pub agent_id: String,
    pub version: String,
    pub protocol: String,
    pub card_document: CardDocument,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to register (or re-register) an agent card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRegistration {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: Option<String>,
    pub status: Option<String>,
    pub version: String,
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub tags: Map<String, Value>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub card_document: CardDocument,
}

fn default_protocol() -> String {
    A2A_PROTOCOL.to_string()
}

impl CardRegistration {
    pub fn validate(&self) -> Result<()> {
        if self.agent_id.trim().is_empty() {
            return Err(CoreError::Validation("agent_id cannot be empty".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(CoreError::Validation("version cannot be empty".to_string()));
        }
        if self.protocol.trim().is_empty() {
            return Err(CoreError::Validation("protocol cannot be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("name cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredCard {
    pub agent_id: String,
    pub protocol: String,
    /// Version the caller asked for.
    pub requested_version: String,
    /// Version actually persisted.
    pub version: String,
    /// True when the requested version was taken and a new one was allocated.
    pub allocated: bool,
    /// Document as persisted, `agentVersion` included.
    pub card_document: CardDocument,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registration() -> CardRegistration {
        CardRegistration {
            agent_id: "demo/agent".to_string(),
            name: "Demo Agent".to_string(),
            description: "Does things.".to_string(),
            owner: Some("self-registered".to_string()),
            status: Some("active".to_string()),
            version: "1.0.0".to_string(),
            endpoint_url: Some("https://example.com/invocations".to_string()),
            tags: Map::new(),
            protocol: A2A_PROTOCOL.to_string(),
            card_document: CardDocument::from_value(json!({"name": "Demo Agent"})),
        }
    }

    #[test]
    fn test_validate_accepts_complete_registration() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut reg = registration();
        reg.agent_id = "  ".to_string();
        assert!(matches!(reg.validate(), Err(CoreError::Validation(_))));

        let mut reg = registration();
        reg.version = String::new();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn test_protocol_defaults_to_a2a() {
        let reg: CardRegistration = serde_json::from_value(json!({
            "agent_id": "a",
            "name": "A",
            "owner": null,
            "status": null,
            "version": "v1",
            "endpoint_url": null,
            "card_document": {"name": "A"}
        }))
        .unwrap();
        assert_eq!(reg.protocol, "a2a");
        assert_eq!(reg.card_document.field("name"), Some(&json!("A")));
    }
}
