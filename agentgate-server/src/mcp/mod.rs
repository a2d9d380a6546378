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

//! Model Context Protocol (MCP) surface
//!
//! Exposes agent discovery and invocation as MCP tools, and agent cards as
//! MCP resources. [`catalog`] is the client side: it discovers and calls
//! tools of other MCP servers.

pub mod catalog;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use catalog::{build_tool_spec, CatalogError, McpRpcClient, RemoteTool, RemoteToolCatalog};
pub use handlers::{McpHandler, AGENT_CARDS_URI};
pub use server::{mcp_router, McpServerState};
pub use tools::{InvokeAgentTool, ListAvailableAgentsTool, McpTool, ToolRegistry};

/// Mount path of the MCP endpoint.
pub const MCP_PATH: &str = "/api/mcp";
