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

//! REST registry API over HTTP.

mod common;

use common::{registration, TestGateway};
use serde_json::json;

#[tokio::test]
async fn test_root_and_status() {
    let gateway = TestGateway::start().await;

    let (status, body) = gateway.get("/").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = gateway.get("/api/registry/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["database"]["ok"], true);
    assert!(body["database"]["error"].is_null());
    assert_eq!(body["a2a"]["url"], "/api/a2a");
    assert_eq!(body["mcp"]["url"], "/api/mcp");
    assert_eq!(body["test_agent"]["ok"], true);
}

#[tokio::test]
async fn test_register_then_browse() {
    let gateway = TestGateway::start().await;

    let (status, body) = gateway
        .post(
            "/api/registry/agent-cards",
            registration("genie", "1", "http://genie.local/a2a", "http://genie.local/invoke"),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "ok", "agent_id": "genie", "version": "1"}));

    let (_, body) = gateway.get("/api/registry/agents").await;
    let agents = body["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["agent_id"], "genie");
    assert_eq!(agents[0]["owner"], "self-registered");
    assert_eq!(agents[0]["status"], "active");
    assert_eq!(agents[0]["default_version"], "1");

    let (status, body) = gateway.get("/api/registry/agents/genie").await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "genie agent");

    let (_, body) = gateway.get("/api/registry/agents/genie/versions").await;
    assert_eq!(body["versions"][0]["endpoint_url"], "http://genie.local/invoke");

    let (status, body) = gateway.get("/api/registry/agents/genie/versions/1").await;
    assert_eq!(status, 200);
    assert_eq!(body["version"], "1");

    let (status, body) = gateway.get("/api/registry/agents/genie/card").await;
    assert_eq!(status, 200);
    assert_eq!(body["humanReadableId"], "genie");
    assert_eq!(body["agentVersion"], "1");
    assert_eq!(body["url"], "http://genie.local/a2a");
}

#[tokio::test]
async fn test_conflicting_version_allocates_next() {
    let gateway = TestGateway::start().await;
    let path = "/api/registry/agent-cards";

    gateway
        .post(path, registration("genie", "v2", "http://a.local", "http://a.local/invoke"))
        .await;

    // Identical content: same version, no new rows.
    let (_, body) = gateway
        .post(path, registration("genie", "v2", "http://a.local", "http://a.local/invoke"))
        .await;
    assert_eq!(body["version"], "v2");

    // Different content: next version.
    let (_, body) = gateway
        .post(path, registration("genie", "v2", "http://b.local", "http://b.local/invoke"))
        .await;
    assert_eq!(body["version"], "v3");

    let (_, body) = gateway.get("/api/registry/agents/genie/versions").await;
    assert_eq!(body["versions"].as_array().unwrap().len(), 2);

    let (_, body) = gateway.get("/api/registry/agents/genie/card?version=v3").await;
    assert_eq!(body["agentVersion"], "v3");
    assert_eq!(body["url"], "http://b.local");

    let (_, body) = gateway.get("/api/registry/agents/genie/card?version=v2").await;
    assert_eq!(body["url"], "http://a.local");
}

#[tokio::test]
async fn test_not_found_responses() {
    let gateway = TestGateway::start().await;

    let (status, body) = gateway.get("/api/registry/agents/ghost").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Agent not found.");

    let (status, body) = gateway.get("/api/registry/agents/ghost/versions/1").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Version not found.");

    let (status, body) = gateway.get("/api/registry/agents/ghost/card").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Agent card not found.");

    let (status, body) = gateway.get("/api/registry/agents/ghost/versions").await;
    assert_eq!(status, 200);
    assert_eq!(body["versions"], json!([]));
}

#[tokio::test]
async fn test_blank_agent_id_rejected() {
    let gateway = TestGateway::start().await;
    let (status, body) = gateway
        .post(
            "/api/registry/agent-cards",
            registration("  ", "1", "http://a.local", "http://a.local/invoke"),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("agent_id"));
}
