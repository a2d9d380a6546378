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

//! Agent executor seam.

use async_trait::async_trait;
use thiserror::Error;

use super::protocol::Message;
use super::task::{TaskStateError, TaskUpdater};

/// What an executor sees of the inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    pub message: Message,
    /// Text parts of the message, never empty.
    pub user_input: String,
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("This operation is not supported")]
    Unsupported,

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    State(#[from] TaskStateError),
}

/// Business logic behind an A2A endpoint.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Drive the task to a final state through `updater`. Returning without
    /// a final update completes the task.
    async fn execute(
        &self,
        context: &RequestContext,
        updater: &mut TaskUpdater,
    ) -> Result<(), ExecutorError>;

    async fn cancel(&self, _task_id: &str) -> Result<(), ExecutorError> {
        Err(ExecutorError::Unsupported)
    }
}
