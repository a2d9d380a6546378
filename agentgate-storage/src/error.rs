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

//! Storage errors

use agentgate_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid table namespace '{0}': expected a plain SQL identifier")]
    InvalidNamespace(String),

    #[error("failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{operation} on {table} failed: {source}")]
    Query {
        table: String,
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid registration: {0}")]
    Core(#[from] CoreError),

    #[error("blocking task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Map a rusqlite error into [`StoreError::Query`] for one table/operation.
pub(crate) fn query_err<'a>(
    table: &'a str,
    operation: &'static str,
) -> impl FnOnce(rusqlite::Error) -> StoreError + 'a {
    move |source| StoreError::Query {
        table: table.to_string(),
        operation,
        source,
    }
}
