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

//! Agentgate Server
//!
//! Agent directory and invocation gateway. One HTTP listener serves:
//! - `/api/registry`: REST registry browsing and self-registration
//! - `/api/mcp`: MCP tools for discovering and invoking agents
//! - `/api/a2a`: A2A gateway agent fronting the registry
//! - `/api/test-agent`: local A2A agent for handshake checks

pub mod a2a;
pub mod api;
pub mod client;
pub mod config;
pub mod gateway;
pub mod jsonrpc;
pub mod mcp;
pub mod test_agent;

use std::sync::Arc;
use std::time::Duration;

use agentgate_storage::RegistryDb;
use anyhow::Result;
use axum::{http::HeaderValue, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use a2a::{a2a_router, gateway_card, A2aServerState, RegistryExecutor, GATEWAY_PATH};
use api::{registry_router, AppState, REGISTRY_PATH};
use client::{http_client, AuthSecrets, TaskRpcClient, ToolCallClient};
use config::ServerConfig;
use gateway::InvocationRouter;
use mcp::{
    mcp_router, InvokeAgentTool, ListAvailableAgentsTool, McpHandler, ToolRegistry, MCP_PATH,
};
use test_agent::{test_agent_router, DebugHistory, TEST_AGENT_PATH};

/// Assemble every surface on one router.
pub fn build_router(config: &ServerConfig, db: RegistryDb, secrets: AuthSecrets) -> Result<Router> {
    let base_url = config.base_url();
    let protocol = config.gateway.protocol.clone();
    let http = http_client();

    let invocation_router = Arc::new(InvocationRouter::new(
        db.clone(),
        Arc::new(TaskRpcClient::new(http.clone())),
        protocol.clone(),
        base_url.clone(),
        secrets.clone(),
    ));

    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(ListAvailableAgentsTool::new(db.clone(), protocol.clone())))?;
    tools.register(Arc::new(InvokeAgentTool::new(
        invocation_router,
        config.default_timeout(),
    )))?;
    let mcp_handler = Arc::new(McpHandler::new(tools, db.clone(), protocol.clone()));

    let registry_executor = RegistryExecutor::new(
        db.clone(),
        Arc::new(ToolCallClient::new(http)),
        protocol.clone(),
        secrets,
        config.default_timeout(),
    );
    let gateway = a2a_router(A2aServerState::new(
        Arc::new(registry_executor),
        gateway_card(base_url.as_deref()),
    ));

    let state = AppState {
        db,
        protocol,
        test_agent_enabled: config.test_agent.enabled,
    };

    let mut bounded = Router::new()
        .route("/", get(root))
        .nest(REGISTRY_PATH, registry_router(state));

    if config.test_agent.enabled {
        let history = Arc::new(DebugHistory::new(config.test_agent.history_capacity));
        bounded = bounded.nest(
            TEST_AGENT_PATH,
            test_agent_router(history, base_url.as_deref()),
        );
    }

    // Invocation surfaces are bounded by their per-call deadline instead, so
    // a slow agent still yields a structured timeout outcome.
    let bounded = bounded.layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    Ok(Router::new()
        .merge(bounded)
        .nest(MCP_PATH, mcp_router(mcp_handler))
        .nest(GATEWAY_PATH, gateway)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if !config.server.enable_cors {
        return CorsLayer::new();
    }

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.server.cors_origins.is_empty() {
        tracing::warn!("CORS: Allowing all origins. Set cors_origins in production!");
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("CORS: Ignoring invalid origin {:?}", origin);
                None
            }
        })
        .collect();
    tracing::info!("CORS: Allowing origins: {:?}", config.server.cors_origins);
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agentgate_server=info,agentgate_storage=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    init_tracing(config.server.json_logs);

    tracing::info!("Starting Agentgate Server");
    tracing::debug!("Configuration: {:#?}", config);

    config.validate()?;
    let addr = config.socket_addr()?;

    if let Some(parent) = config
        .storage
        .database_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db = RegistryDb::open(&config.storage.database_path, config.namespace()?).await?;

    let secrets = AuthSecrets::from_env();
    tracing::info!("Outbound credentials: {:?}", secrets);

    let app = build_router(&config, db, secrets)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Agentgate listening on http://{}", addr);
    tracing::info!("  REST registry: {}", REGISTRY_PATH);
    tracing::info!("  MCP endpoint:  {}", MCP_PATH);
    tracing::info!("  A2A gateway:   {}", GATEWAY_PATH);
    if config.test_agent.enabled {
        tracing::info!("  Test agent:    {}", TEST_AGENT_PATH);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Agentgate Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
