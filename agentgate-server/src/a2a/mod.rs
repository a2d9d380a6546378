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

//! A2A surface: wire types, task lifecycle, the executor seam and the
//! JSON-RPC server, plus the registry gateway executor.

pub mod executor;
pub mod gateway;
pub mod protocol;
pub mod server;
pub mod task;

pub use executor::{AgentExecutor, ExecutorError, RequestContext};
pub use gateway::{gateway_card, RegistryExecutor, AGENT_CALL_HINT, GATEWAY_PATH};
pub use server::{a2a_router, A2aServerState};
pub use task::{TaskStateError, TaskUpdater};
