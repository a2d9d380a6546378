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

//! Capability filter
//!
//! Pure functions over card documents: defensive field extraction, tag and
//! skill matching, and the agent listing served to tool-call clients.
//!
//! Tags and skills match differently. Requested tags are a filter (every one
//! must be present on the card); requested skills are a capability probe (any
//! one present is enough).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::ProtocolCard;
use crate::card::CardDocument;

/// Smallest and largest number of summaries a listing returns.
pub const MIN_LIST_LIMIT: i64 = 1;
pub const MAX_LIST_LIMIT: i64 = 100;

/// Listing size when the caller does not give one.
pub const DEFAULT_LIST_LIMIT: i64 = 20;

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// String entries of the card's `tags` list.
pub fn extract_tags(doc: &CardDocument) -> Vec<String> {
    match doc.field("tags") {
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(|tag| tag.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Ids of the card's `skills` entries that are objects carrying an `id`.
pub fn extract_skill_ids(doc: &CardDocument) -> Vec<String> {
    match doc.field("skills") {
        Some(Value::Array(skills)) => skills
            .iter()
            .filter_map(|skill| skill.as_object())
            .filter_map(|skill| skill.get("id"))
            .filter_map(scalar_to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn card_name(doc: &CardDocument) -> String {
    non_empty_str(doc.field("name")).unwrap_or_default()
}

pub fn card_description(doc: &CardDocument) -> String {
    non_empty_str(doc.field("description")).unwrap_or_default()
}

/// Invocation URL: `url`, falling back to `a2a_url`.
pub fn invocation_url(doc: &CardDocument) -> Option<String> {
    non_empty_str(doc.field("url")).or_else(|| non_empty_str(doc.field("a2a_url")))
}

/// Lower-cased auth scheme names from `authSchemes`.
///
/// Entries may be objects (`{"scheme": "apiKey"}`) or bare strings. Entries
/// without a usable name come back as an empty string, which means "no auth".
pub fn auth_schemes(doc: &CardDocument) -> Vec<String> {
    match doc.field("authSchemes") {
        Some(Value::Array(schemes)) => schemes
            .iter()
            .map(|scheme| {
                let name = match scheme {
                    Value::Object(map) => map.get("scheme").and_then(scalar_to_string),
                    other => scalar_to_string(other),
                };
                name.unwrap_or_default().trim().to_lowercase()
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// The `agentVersion` the card claims for itself.
pub fn card_agent_version(doc: &CardDocument) -> Option<String> {
    doc.field("agentVersion").and_then(scalar_to_string)
}

pub fn human_readable_id(doc: &CardDocument) -> Option<String> {
    non_empty_str(doc.field("humanReadableId"))
        .or_else(|| non_empty_str(doc.field("human_readable_id")))
}

fn requested_set(requested: &[String]) -> HashSet<&str> {
    requested
        .iter()
        .map(String::as_str)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Every requested tag is on the card. Nothing requested matches anything.
pub fn matches_tags(requested: &[String], card_tags: &[String]) -> bool {
    let card: HashSet<&str> = card_tags.iter().map(String::as_str).collect();
    requested_set(requested).is_subset(&card)
}

/// At least one requested skill is on the card. Nothing requested matches
/// anything.
pub fn matches_skills(requested: &[String], card_skills: &[String]) -> bool {
    let wanted = requested_set(requested);
    if wanted.is_empty() {
        return true;
    }
    card_skills.iter().any(|skill| wanted.contains(skill.as_str()))
}

/// Listing entry for one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub human_readable_id: Option<String>,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub a2a_url: String,
    pub agent_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDocument>,
}

/// Summarize a card row. The full document is attached only on request.
pub fn summarize(row: &ProtocolCard, include_full_card: bool) -> AgentSummary {
    let doc = &row.card_document;

    let human_readable_id = if row.agent_id.is_empty() {
        human_readable_id(doc)
    } else {
        Some(row.agent_id.clone())
    };

    let agent_version = if row.version.is_empty() {
        card_agent_version(doc)
    } else {
        Some(row.version.clone())
    };

    AgentSummary {
        human_readable_id,
        name: card_name(doc),
        description: card_description(doc),
        tags: extract_tags(doc),
        a2a_url: invocation_url(doc).unwrap_or_default(),
        agent_version,
        card: include_full_card.then(|| doc.clone()),
    }
}

/// Parameters of an agent listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub include_full_card: bool,
    #[serde(default)]
    pub all_versions: bool,
}

fn default_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            skills: Vec::new(),
            limit: DEFAULT_LIST_LIMIT,
            include_full_card: false,
            all_versions: false,
        }
    }
}

impl ListQuery {
    /// Limit clamped to `[MIN_LIST_LIMIT, MAX_LIST_LIMIT]`.
    pub fn normalized_limit(&self) -> usize {
        self.limit.clamp(MIN_LIST_LIMIT, MAX_LIST_LIMIT) as usize
    }
}

/// Result of [`list_available`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentListing {
    pub agents: Vec<AgentSummary>,
}

/// Filter and summarize card rows.
///
/// Rows are visited in the order given. The store orders each agent's rows
/// from highest version down, so keeping the first surviving row per agent
/// keeps its latest matching version.
pub fn list_available(rows: &[ProtocolCard], query: &ListQuery) -> AgentListing {
    let limit = query.normalized_limit();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut agents = Vec::new();

    for row in rows {
        let doc = &row.card_document;
        if !query.tags.is_empty() && !matches_tags(&query.tags, &extract_tags(doc)) {
            continue;
        }
        if !query.skills.is_empty() && !matches_skills(&query.skills, &extract_skill_ids(doc)) {
            continue;
        }
        if !query.all_versions && !seen.insert(row.agent_id.as_str()) {
            continue;
        }

        agents.push(summarize(row, query.include_full_card));
        if agents.len() >= limit {
            break;
        }
    }

    AgentListing { agents }
}
