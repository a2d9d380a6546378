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

//! Shared helpers: a gateway on an ephemeral port backed by a temp database.

#![allow(dead_code)]

use std::net::SocketAddr;

use agentgate_server::{build_router, client::AuthSecrets, config::ServerConfig};
use agentgate_storage::{Namespace, RegistryDb};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;

pub struct TestGateway {
    pub addr: SocketAddr,
    pub db: RegistryDb,
    pub http: reqwest::Client,
    _dir: TempDir,
}

impl TestGateway {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(mut config: ServerConfig) -> Self {
        let dir = TempDir::new().unwrap();
        config.storage.database_path = dir.path().join("registry.db");
        let db = RegistryDb::open(&config.storage.database_path, Namespace::default())
            .await
            .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        if config.gateway.base_url.is_none() {
            config.gateway.base_url = Some(format!("http://{}", addr));
        }

        let app = build_router(&config, db.clone(), AuthSecrets::default()).unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            db,
            http: reqwest::Client::new(),
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.http.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn rpc(&self, path: &str, method: &str, params: Value) -> Value {
        let (status, body) = self
            .post(
                path,
                json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}),
            )
            .await;
        assert_eq!(status, 200);
        body
    }
}

/// Serve `app` on an ephemeral port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Registration body in the shape agents self-register with.
pub fn registration(agent_id: &str, version: &str, url: &str, endpoint: &str) -> Value {
    json!({
        "agent_id": agent_id,
        "version": version,
        "endpoint_url": endpoint,
        "card": {
            "name": format!("{} agent", agent_id),
            "description": "Registered in tests",
            "url": url,
            "version": "1.0.0",
            "defaultInputModes": ["text"],
            "defaultOutputModes": ["text"],
            "capabilities": {"streaming": false},
            "skills": [{"id": "lookup", "name": "Lookup", "description": "Looks things up"}],
            "tags": ["finance", "reports"]
        }
    })
}

/// `message/send` params carrying one text part.
pub fn text_message(text: &str) -> Value {
    json!({
        "message": {
            "role": "user",
            "parts": [{"kind": "text", "text": text}],
            "messageId": "m-1",
            "kind": "message"
        }
    })
}
