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

//! Database handle
//!
//! Every scope opens its own SQLite connection on the blocking pool, so no
//! connection or lock is held across an await point.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::schema::Namespace;
use crate::store::CardStore;

/// Handle to the registry database file.
#[derive(Debug, Clone)]
pub struct RegistryDb {
    path: PathBuf,
    namespace: Namespace,
}

impl RegistryDb {
    /// Open (creating if needed) the database and its tables.
    pub async fn open(path: impl AsRef<Path>, namespace: Namespace) -> Result<Self> {
        let db = Self {
            path: path.as_ref().to_path_buf(),
            namespace,
        };
        db.write(|store| store.ensure_schema()).await?;
        info!(
            "Registry database ready: path={}, namespace={}",
            db.path.display(),
            db.namespace.as_str()
        );
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|source| StoreError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Ok(conn)
    }

    /// Run read-only store operations.
    pub async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CardStore<'_>) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let namespace = self.namespace.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::connect(&path)?;
            let store = CardStore::new(&conn, &namespace);
            f(&store)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Run store operations in a transaction, committed when `f` succeeds.
    pub async fn write<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CardStore<'_>) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let namespace = self.namespace.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Self::connect(&path)?;
            let tx = conn.transaction().map_err(|source| StoreError::Query {
                table: "sqlite".to_string(),
                operation: "begin transaction",
                source,
            })?;
            let value = f(&CardStore::new(&tx, &namespace))?;
            tx.commit().map_err(|source| StoreError::Query {
                table: "sqlite".to_string(),
                operation: "commit",
                source,
            })?;
            Ok(value)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn ping(&self) -> Result<()> {
        self.read(|store| store.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_core::{CardDocument, CardRegistration};
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn registration(version: &str) -> CardRegistration {
        CardRegistration {
            agent_id: "agent-1".to_string(),
            name: "Agent One".to_string(),
            description: String::new(),
            owner: None,
            status: None,
            version: version.to_string(),
            endpoint_url: None,
            tags: Map::new(),
            protocol: "a2a".to_string(),
            card_document: CardDocument::from_value(json!({"name": "Agent One"})),
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let db = RegistryDb::open(dir.path().join("registry.db"), Namespace::default())
            .await
            .unwrap();

        let registered = db
            .write(|store| store.register_card(&registration("1")))
            .await
            .unwrap();
        assert_eq!(registered.version, "1");

        let agents = db.read(|store| store.list_agents()).await.unwrap();
        assert_eq!(agents.len(), 1);
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = TempDir::new().unwrap();
        let db = RegistryDb::open(dir.path().join("registry.db"), Namespace::default())
            .await
            .unwrap();

        let result: Result<()> = db
            .write(|store| {
                store.register_card(&registration("1"))?;
                Err(StoreError::Task("abort".to_string()))
            })
            .await;
        assert!(result.is_err());

        let agents = db.read(|store| store.list_agents()).await.unwrap();
        assert!(agents.is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.db");
        let a = RegistryDb::open(&path, Namespace::new("team_a").unwrap())
            .await
            .unwrap();
        let b = RegistryDb::open(&path, Namespace::new("team_b").unwrap())
            .await
            .unwrap();

        a.write(|store| store.register_card(&registration("1")))
            .await
            .unwrap();
        assert!(b.read(|store| store.list_agents()).await.unwrap().is_empty());
    }
}
