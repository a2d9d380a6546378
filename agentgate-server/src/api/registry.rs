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

//! Registry browsing and self-registration endpoints.

use agentgate_core::{Agent, AgentVersion, CardDocument, CardRegistration};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::{ApiError, AppState};
use crate::a2a::protocol::AgentCapabilities;

#[derive(Debug, Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub versions: Vec<AgentVersion>,
}

#[derive(Debug, Deserialize)]
pub struct CardQuery {
    pub version: Option<String>,
}

/// Skill entry of a registered card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillPayload {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Card submitted for registration. Required A2A fields are typed, anything
/// else (`authSchemes`, `tags`, ...) is kept as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<SkillPayload>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// POST /agent-cards body
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAgentCardRequest {
    pub agent_id: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub version: String,
    #[serde(default, alias = "mcp_server_url")]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub tags: Option<Map<String, Value>>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub card: CardPayload,
}

fn default_owner() -> String {
    "self-registered".to_string()
}

fn default_status() -> String {
    "active".to_string()
}

fn default_protocol() -> String {
    agentgate_core::A2A_PROTOCOL.to_string()
}

impl RegisterAgentCardRequest {
    /// Convert into a store registration, defaulting `humanReadableId` and
    /// `agentVersion` in the card.
    pub fn into_registration(self) -> Result<CardRegistration, ApiError> {
        let card =
            serde_json::to_value(&self.card).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let mut document = CardDocument::from_value(card);
        document.set_default("humanReadableId", json!(self.agent_id));
        document.set_default("agentVersion", json!(self.version));

        let name = if self.card.name.trim().is_empty() {
            self.agent_id.clone()
        } else {
            self.card.name.clone()
        };

        Ok(CardRegistration {
            agent_id: self.agent_id,
            name,
            description: self.card.description,
            owner: Some(self.owner),
            status: Some(self.status),
            version: self.version,
            endpoint_url: self.endpoint_url.filter(|u| !u.trim().is_empty()),
            tags: self.tags.unwrap_or_default(),
            protocol: self.protocol,
            card_document: document,
        })
    }
}

/// GET /agents
pub async fn list_agents(State(state): State<AppState>) -> Result<Json<AgentsResponse>, ApiError> {
    let agents = state.db.read(|store| store.list_agents()).await?;
    Ok(Json(AgentsResponse { agents }))
}

/// GET /agents/:agent_id
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    state
        .db
        .read(move |store| store.get_agent(&agent_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Agent not found.".to_string()))
}

/// GET /agents/:agent_id/versions
pub async fn list_versions(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<VersionsResponse>, ApiError> {
    let versions = state
        .db
        .read(move |store| store.list_versions(&agent_id))
        .await?;
    Ok(Json(VersionsResponse { versions }))
}

/// GET /agents/:agent_id/versions/:version
pub async fn get_version(
    State(state): State<AppState>,
    Path((agent_id, version)): Path<(String, String)>,
) -> Result<Json<AgentVersion>, ApiError> {
    state
        .db
        .read(move |store| store.get_version(&agent_id, &version))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Version not found.".to_string()))
}

/// GET /agents/:agent_id/card?version=
///
/// Without a version: the default version's card, else the latest card.
pub async fn get_card(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<CardQuery>,
) -> Result<Json<CardDocument>, ApiError> {
    let protocol = state.protocol.clone();
    let version = query.version.filter(|v| !v.is_empty());

    let card = state
        .db
        .read(move |store| match version {
            Some(version) => store.get_card(&agent_id, Some(version.as_str()), &protocol),
            None => match store.get_default_version(&agent_id)? {
                Some(default) => {
                    store.get_card(&agent_id, Some(default.version.as_str()), &protocol)
                }
                None => store.get_card(&agent_id, None, &protocol),
            },
        })
        .await?;

    card.map(|card| Json(card.card_document))
        .ok_or_else(|| ApiError::NotFound("Agent card not found.".to_string()))
}

/// POST /agent-cards
pub async fn register_agent_card(
    State(state): State<AppState>,
    Json(request): Json<RegisterAgentCardRequest>,
) -> Result<Json<Value>, ApiError> {
    let registration = request.into_registration()?;
    registration
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let registered = state
        .db
        .write(move |store| store.register_card(&registration))
        .await?;

    info!(
        agent_id = %registered.agent_id,
        version = %registered.version,
        allocated = registered.allocated,
        "Agent card registered via REST"
    );
    Ok(Json(json!({
        "status": "ok",
        "agent_id": registered.agent_id,
        "version": registered.version,
    })))
}
