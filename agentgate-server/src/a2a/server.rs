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

//! A2A Server
//!
//! Serves an [`AgentExecutor`] as an A2A JSON-RPC endpoint plus its card.
//! Tasks live for one request; nothing is kept once the response is sent.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::get, routing::post, Json, Router};
use serde_json::Value;
use tracing::{info, warn};

use super::executor::{AgentExecutor, ExecutorError, RequestContext};
use super::protocol::{
    AgentCard, MessageSendParams, TaskIdParams, TASK_NOT_FOUND, UNSUPPORTED_OPERATION,
};
use super::task::TaskUpdater;
use crate::jsonrpc::{parse_request, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};

#[derive(Clone)]
pub struct A2aServerState {
    executor: Arc<dyn AgentExecutor>,
    card: Arc<AgentCard>,
}

impl A2aServerState {
    pub fn new(executor: Arc<dyn AgentExecutor>, card: AgentCard) -> Self {
        Self {
            executor,
            card: Arc::new(card),
        }
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    /// Handle one A2A JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        info!(method = %request.method, agent = %self.card.name, "A2A request received");

        match request.method.as_str() {
            "message/send" | "tasks/send" => self.handle_send(request.id, request.params).await,
            "tasks/cancel" => self.handle_cancel(request.id, request.params).await,
            "tasks/get" => JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(TASK_NOT_FOUND, "Task not found"),
            ),
            _ => {
                warn!(method = %request.method, "Unknown A2A method");
                JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(&request.method))
            }
        }
    }

    async fn handle_send(&self, id: JsonRpcId, params: Option<Value>) -> JsonRpcResponse {
        let params = match params.map(serde_json::from_value::<MessageSendParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid message params: {}", e)),
                )
            }
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"))
            }
        };

        let user_input = params.message.text_content();
        if user_input.trim().is_empty() {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("Message contains no user text"),
            );
        }

        let mut updater = TaskUpdater::new(&params.message);
        let context = RequestContext {
            task_id: updater.task_id().to_string(),
            context_id: updater.context_id().to_string(),
            message: params.message,
            user_input,
        };

        let outcome = match updater.start_work() {
            Ok(()) => self.executor.execute(&context, &mut updater).await,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(()) => {}
            Err(ExecutorError::InvalidParams(message)) => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params(message))
            }
            Err(ExecutorError::Unsupported) => {
                return JsonRpcResponse::error(id, unsupported())
            }
            Err(e) => {
                warn!(task_id = %context.task_id, error = %e, "Task failed");
                if !updater.is_final() {
                    if let Err(e) = updater.failed(&e.to_string()) {
                        return JsonRpcResponse::error(
                            id,
                            JsonRpcError::internal_error(e.to_string()),
                        );
                    }
                }
            }
        }

        if !updater.is_final() {
            if let Err(e) = updater.complete() {
                return JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string()));
            }
        }

        JsonRpcResponse::from_result(id, &updater.into_task())
    }

    async fn handle_cancel(&self, id: JsonRpcId, params: Option<Value>) -> JsonRpcResponse {
        let task_id = params
            .and_then(|p| serde_json::from_value::<TaskIdParams>(p).ok())
            .map(|p| p.id)
            .unwrap_or_default();
        match self.executor.cancel(&task_id).await {
            Ok(()) => {
                JsonRpcResponse::error(id, JsonRpcError::new(TASK_NOT_FOUND, "Task not found"))
            }
            Err(ExecutorError::Unsupported) => JsonRpcResponse::error(id, unsupported()),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }
}

fn unsupported() -> JsonRpcError {
    JsonRpcError::new(UNSUPPORTED_OPERATION, "This operation is not supported")
}

/// Router with the JSON-RPC endpoint at `/` and the card under
/// `/.well-known/`. Nest it under the agent's mount path.
pub fn a2a_router(state: A2aServerState) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .route("/.well-known/agent.json", get(handle_card))
        .route("/.well-known/agent-card.json", get(handle_card))
        .with_state(state)
}

async fn handle_rpc(State(state): State<A2aServerState>, body: Bytes) -> Json<JsonRpcResponse> {
    let response = match parse_request(&body) {
        Ok(request) => state.handle_request(request).await,
        Err(response) => response,
    };
    Json(response)
}

async fn handle_card(State(state): State<A2aServerState>) -> Json<AgentCard> {
    Json(state.card().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::protocol::{AgentCapabilities, Part, TaskState};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoExecutor;

    #[async_trait]
    impl AgentExecutor for EchoExecutor {
        async fn execute(
            &self,
            context: &RequestContext,
            updater: &mut TaskUpdater,
        ) -> Result<(), ExecutorError> {
            if context.user_input == "fail" {
                return Err(ExecutorError::Internal("boom".to_string()));
            }
            updater.add_artifact("echo", vec![Part::text(context.user_input.clone())])?;
            Ok(())
        }
    }

    fn state() -> A2aServerState {
        A2aServerState::new(
            Arc::new(EchoExecutor),
            AgentCard {
                name: "Echo".to_string(),
                description: "Echoes".to_string(),
                url: "/echo".to_string(),
                version: "0.1.0".to_string(),
                default_input_modes: vec!["text".to_string()],
                default_output_modes: vec!["text".to_string()],
                capabilities: AgentCapabilities::default(),
                skills: vec![],
                supports_authenticated_extended_card: false,
            },
        )
    }

    fn send(text: &str) -> JsonRpcRequest {
        JsonRpcRequest::new(
            JsonRpcId::Number(1),
            "message/send",
            Some(json!({
                "message": {
                    "role": "user",
                    "parts": [{"kind": "text", "text": text}],
                    "messageId": "m-1"
                }
            })),
        )
    }

    #[tokio::test]
    async fn test_send_completes_task() {
        let response = state().handle_request(send("hello")).await;
        let result = response.result.unwrap();
        assert_eq!(result["status"]["state"], "completed");
        assert_eq!(result["artifacts"][0]["parts"][0]["text"], "hello");
        assert_eq!(result["kind"], "task");
    }

    #[tokio::test]
    async fn test_executor_error_fails_task() {
        let response = state().handle_request(send("fail")).await;
        let result = response.result.unwrap();
        assert_eq!(
            serde_json::from_value::<TaskState>(result["status"]["state"].clone()).unwrap(),
            TaskState::Failed
        );
    }

    #[tokio::test]
    async fn test_blank_text_is_invalid_params() {
        let response = state().handle_request(send("   ")).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_cancel_is_unsupported() {
        let request = JsonRpcRequest::new(
            JsonRpcId::Number(2),
            "tasks/cancel",
            Some(json!({"id": "t-1"})),
        );
        let response = state().handle_request(request).await;
        assert_eq!(response.error.unwrap().code, UNSUPPORTED_OPERATION);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let request = JsonRpcRequest::new(JsonRpcId::Number(3), "tasks/resubscribe", None);
        let response = state().handle_request(request).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }
}
