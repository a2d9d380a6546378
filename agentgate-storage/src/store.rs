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

//! Card store
//!
//! Registry queries over a caller-supplied connection. The store never opens,
//! commits or closes anything; [`crate::RegistryDb`] owns that.

use std::collections::HashSet;

use agentgate_core::version::{compare_versions, equivalent_spellings, next_version, same_version};
use agentgate_core::{
    Agent, AgentVersion, CardDocument, CardRegistration, ProtocolCard, RegisteredCard,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{query_err, Result};
use crate::schema::{self, Namespace, Tables};

const AGENT_COLUMNS: &str =
    "agent_id, name, description, owner, status, default_version, created_at, updated_at";
const VERSION_COLUMNS: &str = "agent_id, version, endpoint_url, tags, created_at, updated_at";
const CARD_COLUMNS: &str = "agent_id, version, protocol, card_json, updated_at";

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        agent_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        owner: row.get(3)?,
        status: row.get(4)?,
        default_version: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn tags_from_text(text: Option<String>) -> Map<String, Value> {
    text.and_then(|t| serde_json::from_str::<Value>(&t).ok())
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<AgentVersion> {
    Ok(AgentVersion {
        agent_id: row.get(0)?,
        version: row.get(1)?,
        endpoint_url: row.get(2)?,
        tags: tags_from_text(row.get(3)?),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<ProtocolCard> {
    let card_json: String = row.get(3)?;
    Ok(ProtocolCard {
        agent_id: row.get(0)?,
        version: row.get(1)?,
        protocol: row.get(2)?,
        card_document: CardDocument::from_stored(&card_json),
        updated_at: row.get(4)?,
    })
}

/// Agent id first, then highest version first.
fn sort_cards(cards: &mut [ProtocolCard]) {
    cards.sort_by(|a, b| {
        a.agent_id
            .cmp(&b.agent_id)
            .then_with(|| compare_versions(&b.version, &a.version))
    });
}

/// Registry operations bound to one connection and namespace.
pub struct CardStore<'c> {
    conn: &'c Connection,
    tables: Tables,
}

impl<'c> CardStore<'c> {
    pub fn new(conn: &'c Connection, namespace: &Namespace) -> Self {
        Self {
            conn,
            tables: namespace.tables(),
        }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn ensure_schema(&self) -> Result<()> {
        schema::ensure_schema(self.conn, &self.tables)
    }

    /// Health probe.
    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(query_err("sqlite", "ping"))?;
        Ok(())
    }

    pub fn list_agents(&self) -> Result<Vec<Agent>> {
        let table = &self.tables.agents;
        let sql = format!("SELECT {AGENT_COLUMNS} FROM {table} ORDER BY agent_id");
        let mut stmt = self.conn.prepare(&sql).map_err(query_err(table, "list agents"))?;
        let rows = stmt
            .query_map([], agent_from_row)
            .map_err(query_err(table, "list agents"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err(table, "list agents"))
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>> {
        let table = &self.tables.agents;
        let sql = format!("SELECT {AGENT_COLUMNS} FROM {table} WHERE agent_id = ?1");
        self.conn
            .query_row(&sql, params![agent_id], agent_from_row)
            .optional()
            .map_err(query_err(table, "get agent"))
    }

    /// Versions of an agent in ascending text order.
    pub fn list_versions(&self, agent_id: &str) -> Result<Vec<AgentVersion>> {
        let table = &self.tables.versions;
        let sql =
            format!("SELECT {VERSION_COLUMNS} FROM {table} WHERE agent_id = ?1 ORDER BY version");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(query_err(table, "list versions"))?;
        let rows = stmt
            .query_map(params![agent_id], version_from_row)
            .map_err(query_err(table, "list versions"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err(table, "list versions"))
    }

    /// Look up a version, accepting `"2"` for `"v2"` and the reverse. The
    /// spelling as given wins when both are stored.
    pub fn get_version(&self, agent_id: &str, version: &str) -> Result<Option<AgentVersion>> {
        let table = &self.tables.versions;
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM {table} WHERE agent_id = ?1 AND version = ?2"
        );
        for spelling in equivalent_spellings(version) {
            let found = self
                .conn
                .query_row(&sql, params![agent_id, spelling], version_from_row)
                .optional()
                .map_err(query_err(table, "get version"))?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// The agent's default version. When unset or dangling, the last version
    /// in ascending text order.
    pub fn get_default_version(&self, agent_id: &str) -> Result<Option<AgentVersion>> {
        if let Some(default) = self
            .get_agent(agent_id)?
            .and_then(|agent| agent.default_version)
        {
            if let Some(version) = self.get_version(agent_id, &default)? {
                return Ok(Some(version));
            }
            debug!(
                "Default version {} of agent {} is missing, falling back",
                default, agent_id
            );
        }
        Ok(self.list_versions(agent_id)?.pop())
    }

    /// All cards for a protocol, agent id ascending then version descending.
    /// With `latest_only`, one card per agent.
    pub fn list_cards(&self, protocol: &str, latest_only: bool) -> Result<Vec<ProtocolCard>> {
        let table = &self.tables.cards;
        let sql = format!("SELECT {CARD_COLUMNS} FROM {table} WHERE protocol = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(query_err(table, "list cards"))?;
        let rows = stmt
            .query_map(params![protocol], card_from_row)
            .map_err(query_err(table, "list cards"))?;
        let mut cards = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err(table, "list cards"))?;
        sort_cards(&mut cards);

        if latest_only {
            let mut seen = HashSet::new();
            cards.retain(|card| seen.insert(card.agent_id.clone()));
        }
        Ok(cards)
    }

    /// Card for a specific version, or the highest version when none is given.
    pub fn get_card(
        &self,
        agent_id: &str,
        version: Option<&str>,
        protocol: &str,
    ) -> Result<Option<ProtocolCard>> {
        let table = &self.tables.cards;
        match version {
            Some(version) => {
                let sql = format!(
                    "SELECT {CARD_COLUMNS} FROM {table} WHERE agent_id = ?1 AND version = ?2 AND protocol = ?3"
                );
                for spelling in equivalent_spellings(version) {
                    let found = self
                        .conn
                        .query_row(&sql, params![agent_id, spelling, protocol], card_from_row)
                        .optional()
                        .map_err(query_err(table, "get card"))?;
                    if found.is_some() {
                        return Ok(found);
                    }
                }
                Ok(None)
            }
            None => {
                let sql = format!(
                    "SELECT {CARD_COLUMNS} FROM {table} WHERE agent_id = ?1 AND protocol = ?2"
                );
                let mut stmt = self.conn.prepare(&sql).map_err(query_err(table, "get card"))?;
                let rows = stmt
                    .query_map(params![agent_id, protocol], card_from_row)
                    .map_err(query_err(table, "get card"))?;
                let mut cards = rows
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(query_err(table, "get card"))?;
                sort_cards(&mut cards);
                Ok(cards.into_iter().next())
            }
        }
    }

    /// Register an agent card.
    ///
    /// A submission whose card, endpoint and tags match what is already
    /// stored for that version is upserted in place and leaves the default
    /// version alone. Anything else for a taken version gets the next free
    /// numeric version, so stored versions never change content. The
    /// persisted document carries the version used in `agentVersion`.
    pub fn register_card(&self, registration: &CardRegistration) -> Result<RegisteredCard> {
        registration.validate()?;
        let agent_id = registration.agent_id.as_str();
        let protocol = registration.protocol.as_str();
        let requested = registration.version.trim();

        let existing = self.list_versions(agent_id)?;
        let taken = existing
            .iter()
            .find(|v| v.version == requested)
            .or_else(|| existing.iter().find(|v| same_version(&v.version, requested)));

        let (version, allocated, resubmitted, document) = match taken {
            Some(taken) => {
                let document = prepare_document(registration, &taken.version);
                let stored = self.get_card(agent_id, Some(taken.version.as_str()), protocol)?;
                let unchanged = taken.endpoint_url == registration.endpoint_url
                    && taken.tags == registration.tags
                    && stored.is_some_and(|card| card.card_document == document);
                if unchanged {
                    (taken.version.clone(), false, true, document)
                } else {
                    let next = next_version(requested, existing.iter().map(|v| v.version.as_str()));
                    let document = prepare_document(registration, &next);
                    (next, true, false, document)
                }
            }
            None => {
                let document = prepare_document(registration, requested);
                (requested.to_string(), false, false, document)
            }
        };

        let default_version = if resubmitted {
            self.get_agent(agent_id)?
                .and_then(|agent| agent.default_version)
                .unwrap_or_else(|| version.clone())
        } else {
            version.clone()
        };

        let now = Utc::now().to_rfc3339();
        let tags = Value::Object(registration.tags.clone()).to_string();

        let table = &self.tables.agents;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {table} ({AGENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                     ON CONFLICT(agent_id) DO UPDATE SET
                         name = excluded.name,
                         description = excluded.description,
                         owner = excluded.owner,
                         status = excluded.status,
                         default_version = excluded.default_version,
                         updated_at = excluded.updated_at"
                ),
                params![
                    agent_id,
                    registration.name,
                    registration.description,
                    registration.owner,
                    registration.status,
                    default_version,
                    now
                ],
            )
            .map_err(query_err(table, "upsert agent"))?;

        let table = &self.tables.versions;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {table} ({VERSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(agent_id, version) DO UPDATE SET
                         endpoint_url = excluded.endpoint_url,
                         tags = excluded.tags,
                         updated_at = excluded.updated_at"
                ),
                params![agent_id, version, registration.endpoint_url, tags, now],
            )
            .map_err(query_err(table, "upsert version"))?;

        let table = &self.tables.cards;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {table} ({CARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(agent_id, version, protocol) DO UPDATE SET
                         card_json = excluded.card_json,
                         updated_at = excluded.updated_at"
                ),
                params![agent_id, version, protocol, document.to_stored(), now],
            )
            .map_err(query_err(table, "upsert card"))?;

        if allocated {
            info!(
                "Version {} of agent {} is taken, registered card as {}",
                requested, agent_id, version
            );
        } else {
            info!(
                "Registered card: agent_id={}, version={}, protocol={}",
                agent_id, version, protocol
            );
        }

        Ok(RegisteredCard {
            agent_id: agent_id.to_string(),
            protocol: protocol.to_string(),
            requested_version: requested.to_string(),
            version,
            allocated,
            card_document: document,
        })
    }
}

fn prepare_document(registration: &CardRegistration, version: &str) -> CardDocument {
    let mut document = registration.card_document.clone();
    document.set_field("agentVersion", Value::String(version.to_string()));
    document.set_default(
        "humanReadableId",
        Value::String(registration.agent_id.clone()),
    );
    document
}
