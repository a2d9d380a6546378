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

//! MCP HTTP transport: one JSON-RPC message per POST.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use super::handlers::McpHandler;
use super::protocol::*;

#[derive(Clone)]
pub struct McpServerState {
    pub handler: Arc<McpHandler>,
}

/// Router with the JSON-RPC endpoint at `/` and `/health`. Nest it under
/// the MCP mount path.
pub fn mcp_router(handler: Arc<McpHandler>) -> Router {
    Router::new()
        .route("/", post(handle_mcp_request))
        .route("/health", get(handle_mcp_health))
        .with_state(McpServerState { handler })
}

async fn handle_mcp_health(State(state): State<McpServerState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "protocol_version": MCP_PROTOCOL_VERSION,
        "server_name": SERVER_NAME,
        "server_version": env!("CARGO_PKG_VERSION"),
        "tools": state.handler.tools().list().len(),
        "capabilities": {
            "resources": true,
            "tools": true
        }
    }))
}

async fn handle_mcp_request(State(state): State<McpServerState>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => return Json(response).into_response(),
    };
    match state.handler.handle_request(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
