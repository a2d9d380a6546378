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

//! Protocol clients
//!
//! Outbound calls to registered agents. Each client speaks one wire format;
//! all of them share [`Invocation`] as input and bound the whole exchange by
//! the invocation timeout.

pub mod auth;
pub mod task_rpc;
pub mod tool_call;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use auth::{resolve_auth_headers, AuthSecrets, ResolvedAuth};
pub use task_rpc::TaskRpcClient;
pub use tool_call::ToolCallClient;

/// One outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub endpoint: String,
    pub goal: Option<String>,
    pub input: Value,
    pub metadata: Value,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

/// Client for one agent wire protocol.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn invoke(&self, invocation: &Invocation) -> Result<Value, ClientError>;
}

/// Shared outbound HTTP client.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("agentgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

pub(crate) fn apply_headers(
    mut request: reqwest::RequestBuilder,
    headers: &BTreeMap<String, String>,
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

/// Run `call` under `timeout`, dropping it when the deadline passes.
pub(crate) async fn with_deadline<T, F>(timeout: Duration, call: F) -> Result<T, ClientError>
where
    F: std::future::Future<Output = Result<T, ClientError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(timeout)),
    }
}
