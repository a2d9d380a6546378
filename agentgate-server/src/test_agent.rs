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

//! Test agent
//!
//! A local A2A agent for checking the handshake end to end. It records every
//! message it receives and answers with the identifiers it saw.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::a2a::protocol::{card_url, AgentCapabilities, AgentCard, AgentSkill, Part};
use crate::a2a::{
    a2a_router, A2aServerState, AgentExecutor, ExecutorError, RequestContext, TaskUpdater,
};

pub const TEST_AGENT_PATH: &str = "/api/test-agent";

pub const GREETING: &str = "hello world from Test Agent";

/// One received message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub received_at: DateTime<Utc>,
    pub context_id: String,
    pub task_id: String,
    pub message_id: String,
    pub input_text: String,
}

/// Bounded record of received messages, oldest evicted first.
#[derive(Debug)]
pub struct DebugHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl DebugHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an entry and return the number of entries held.
    pub fn record(&self, entry: HistoryEntry) -> usize {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        entries.len()
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

pub struct TestAgentExecutor {
    history: Arc<DebugHistory>,
}

impl TestAgentExecutor {
    pub fn new(history: Arc<DebugHistory>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl AgentExecutor for TestAgentExecutor {
    async fn execute(
        &self,
        context: &RequestContext,
        updater: &mut TaskUpdater,
    ) -> Result<(), ExecutorError> {
        let history_size = self.history.record(HistoryEntry {
            received_at: Utc::now(),
            context_id: context.context_id.clone(),
            task_id: context.task_id.clone(),
            message_id: context.message.message_id.clone(),
            input_text: context.user_input.clone(),
        });
        debug!(task_id = %context.task_id, history_size, "Test agent received message");

        let response = json!({
            "message": GREETING,
            "handshake": {
                "context_id": context.context_id,
                "task_id": context.task_id,
                "message_id": context.message.message_id,
            },
            "request": {"input_text": context.user_input},
            "history_size": history_size,
        });
        let text = serde_json::to_string_pretty(&response)
            .map_err(|e| ExecutorError::Internal(e.to_string()))?;

        updater.add_artifact("test_agent_response", vec![Part::text(text)])?;
        updater.complete()?;
        Ok(())
    }
}

pub fn test_agent_card(base_url: Option<&str>) -> AgentCard {
    AgentCard {
        name: "Test Agent".to_string(),
        description: "Local Test Agent for testing handshake and payloads.".to_string(),
        url: card_url(base_url, TEST_AGENT_PATH),
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        capabilities: AgentCapabilities { streaming: false },
        skills: vec![AgentSkill {
            id: "test_agent".to_string(),
            name: "Test Agent".to_string(),
            description: "Returns a hello-world response with handshake details.".to_string(),
            tags: vec!["test".to_string(), "a2a".to_string()],
            examples: vec!["{\"action\": \"list_agents\"}".to_string()],
        }],
        supports_authenticated_extended_card: false,
    }
}

/// A2A endpoint plus `GET /history`, to be nested at [`TEST_AGENT_PATH`].
pub fn test_agent_router(history: Arc<DebugHistory>, base_url: Option<&str>) -> Router {
    let executor = Arc::new(TestAgentExecutor::new(history.clone()));
    let a2a = a2a_router(A2aServerState::new(executor, test_agent_card(base_url)));
    let history_routes = Router::new()
        .route("/history", get(handle_history))
        .with_state(history);
    a2a.merge(history_routes)
}

async fn handle_history(State(history): State<Arc<DebugHistory>>) -> Json<serde_json::Value> {
    Json(json!({ "history": history.snapshot() }))
}
