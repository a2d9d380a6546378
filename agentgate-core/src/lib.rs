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

//! Agentgate Core
//!
//! Registry records, card documents, version helpers and the capability
//! filter shared by the storage layer and the gateway.

pub mod agent;
pub mod capability;
pub mod card;
pub mod error;
pub mod version;

pub use agent::{
    Agent, AgentVersion, CardRegistration, ProtocolCard, RegisteredCard, A2A_PROTOCOL,
};
pub use capability::{
    list_available, matches_skills, matches_tags, summarize, AgentListing, AgentSummary,
    ListQuery,
};
pub use card::CardDocument;
pub use error::{CoreError, Result};
