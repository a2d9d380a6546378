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

//! Table namespace and DDL
//!
//! SQLite has no schemas, so the registry namespace becomes a table-name
//! prefix: `{ns}_agents`, `{ns}_agent_versions`, `{ns}_agent_protocol_cards`.

use rusqlite::Connection;

use crate::error::{query_err, Result, StoreError};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "agent_registry";

/// A validated table-name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    /// Accepts `[A-Za-z_][A-Za-z0-9_]*`. Anything else would end up spliced
    /// into SQL text.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if valid {
            Ok(Self(name))
        } else {
            Err(StoreError::InvalidNamespace(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tables(&self) -> Tables {
        Tables {
            agents: format!("{}_agents", self.0),
            versions: format!("{}_agent_versions", self.0),
            cards: format!("{}_agent_protocol_cards", self.0),
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self(DEFAULT_NAMESPACE.to_string())
    }
}

/// Concrete table names for a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub agents: String,
    pub versions: String,
    pub cards: String,
}

/// Create the registry tables if they do not exist.
pub fn ensure_schema(conn: &Connection, tables: &Tables) -> Result<()> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {agents} (
            agent_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            owner TEXT,
            status TEXT,
            default_version TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS {versions} (
            agent_id TEXT NOT NULL REFERENCES {agents}(agent_id) ON DELETE CASCADE,
            version TEXT NOT NULL,
            endpoint_url TEXT,
            tags TEXT NOT NULL DEFAULT '{{}}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (agent_id, version)
        );

        CREATE TABLE IF NOT EXISTS {cards} (
            agent_id TEXT NOT NULL,
            version TEXT NOT NULL,
            protocol TEXT NOT NULL,
            card_json TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (agent_id, version, protocol),
            FOREIGN KEY (agent_id, version)
                REFERENCES {versions}(agent_id, version) ON DELETE CASCADE
        );
        "#,
        agents = tables.agents,
        versions = tables.versions,
        cards = tables.cards,
    );
    conn.execute_batch(&ddl)
        .map_err(query_err(&tables.agents, "create schema"))
}
