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

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::a2a::GATEWAY_PATH;
use crate::mcp::MCP_PATH;
use crate::test_agent::TEST_AGENT_PATH;

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SurfaceStatus {
    pub ok: bool,
    pub url: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database: DatabaseStatus,
    pub a2a: SurfaceStatus,
    pub mcp: SurfaceStatus,
    pub test_agent: SurfaceStatus,
}

/// GET /status - database reachability plus the mounted surfaces
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let database = match state.db.ping().await {
        Ok(()) => DatabaseStatus { ok: true, error: None },
        Err(e) => {
            warn!("Database ping failed: {}", e);
            DatabaseStatus {
                ok: false,
                error: Some(e.to_string()),
            }
        }
    };

    Json(StatusResponse {
        database,
        a2a: SurfaceStatus {
            ok: true,
            url: GATEWAY_PATH,
        },
        mcp: SurfaceStatus {
            ok: true,
            url: MCP_PATH,
        },
        test_agent: SurfaceStatus {
            ok: state.test_agent_enabled,
            url: TEST_AGENT_PATH,
        },
    })
}
