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

//! REST API for the agent registry

pub mod registry;
pub mod status;

use agentgate_storage::{RegistryDb, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub use registry::{CardPayload, RegisterAgentCardRequest, SkillPayload};
pub use status::{StatusResponse, SurfaceStatus};

/// Mount path of the registry API.
pub const REGISTRY_PATH: &str = "/api/registry";

/// Shared state of the registry API
#[derive(Clone)]
pub struct AppState {
    pub db: RegistryDb,
    pub protocol: String,
    /// Whether the test agent is mounted
    pub test_agent_enabled: bool,
}

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Core(core) => ApiError::BadRequest(core.to_string()),
            other => {
                error!("Registry storage error: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Registry routes. Nest under [`REGISTRY_PATH`].
pub fn registry_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status::status))
        .route("/agents", get(registry::list_agents))
        .route("/agents/:agent_id", get(registry::get_agent))
        .route("/agents/:agent_id/versions", get(registry::list_versions))
        .route("/agents/:agent_id/versions/:version", get(registry::get_version))
        .route("/agents/:agent_id/card", get(registry::get_card))
        .route("/agent-cards", post(registry::register_agent_card))
        .with_state(state)
}
