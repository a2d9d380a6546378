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

use agentgate_storage::{Namespace, DEFAULT_NAMESPACE};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Agentgate Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub test_agent: TestAgentConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:47200")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Allowed CORS origins (empty = allow all)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Table-name prefix of the registry tables
    #[serde(default = "default_registry_schema")]
    pub registry_schema: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Public base URL, used to resolve relative card URLs
    #[serde(default)]
    pub base_url: Option<String>,

    /// Outbound invocation timeout when the caller gives none
    #[serde(default = "default_invoke_timeout")]
    pub default_timeout_secs: u64,

    /// Card protocol served by the listing and invocation tools
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestAgentConfig {
    #[serde(default = "default_enable_test_agent")]
    pub enabled: bool,

    /// Messages kept in the debug history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:47200".to_string()
}

fn default_request_timeout() -> u64 {
    90
}

fn default_enable_cors() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./agentgate-data/registry.db")
}

fn default_registry_schema() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_invoke_timeout() -> u64 {
    60
}

fn default_protocol() -> String {
    agentgate_core::A2A_PROTOCOL.to_string()
}

fn default_enable_test_agent() -> bool {
    true
}

fn default_history_capacity() -> usize {
    256
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
            enable_cors: default_enable_cors(),
            cors_origins: Vec::new(),
            json_logs: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            registry_schema: default_registry_schema(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_timeout_secs: default_invoke_timeout(),
            protocol: default_protocol(),
        }
    }
}

impl Default for TestAgentConfig {
    fn default() -> Self {
        Self {
            enabled: default_enable_test_agent(),
            history_capacity: default_history_capacity(),
        }
    }
}

/// Startup configuration problems. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address '{addr}': {source}")]
    ListenAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("storage.database_path must not be empty")]
    EmptyDatabasePath,

    #[error("invalid registry_schema: {0}")]
    Namespace(#[from] agentgate_storage::StoreError),

    #[error("invalid gateway.base_url '{0}': expected an absolute http(s) URL")]
    BaseUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

const ENV_HTTP_ADDR: &str = "AGENTGATE_HTTP_ADDR";
const ENV_CORS_ORIGINS: &str = "AGENTGATE_CORS_ORIGINS";
const ENV_DATABASE_PATH: &str = "AGENTGATE_DATABASE_PATH";
const ENV_REGISTRY_SCHEMA: &str = "AGENTGATE_REGISTRY_SCHEMA";
const ENV_BASE_URL: &str = "AGENTGATE_BASE_URL";
const ENV_DEFAULT_TIMEOUT: &str = "AGENTGATE_DEFAULT_TIMEOUT_SECS";
const ENV_TEST_AGENT_ENABLED: &str = "AGENTGATE_TEST_AGENT_ENABLED";
const ENV_LOG_FORMAT: &str = "AGENTGATE_LOG_FORMAT";

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration: file (if given) < environment
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        Ok(Self::merge_with(config, |key| std::env::var(key).ok()))
    }

    /// Override fields whose variable is set. `lookup` stands in for the
    /// process environment.
    pub fn merge_with(mut config: Self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup(ENV_HTTP_ADDR) {
            config.server.listen_addr = addr;
        }
        if let Some(origins) = lookup(ENV_CORS_ORIGINS) {
            config.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            config.storage.database_path = PathBuf::from(path);
        }
        if let Some(schema) = lookup(ENV_REGISTRY_SCHEMA) {
            config.storage.registry_schema = schema;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.gateway.base_url = Some(base_url).filter(|u| !u.trim().is_empty());
        }
        if let Some(secs) = lookup(ENV_DEFAULT_TIMEOUT).and_then(|s| s.parse().ok()) {
            config.gateway.default_timeout_secs = secs;
        }
        if let Some(enabled) = lookup(ENV_TEST_AGENT_ENABLED) {
            config.test_agent.enabled = matches!(enabled.as_str(), "1" | "true" | "yes");
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            config.server.json_logs = format.eq_ignore_ascii_case("json");
        }
        config
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .listen_addr
            .parse()
            .map_err(|source| ConfigError::ListenAddr {
                addr: self.server.listen_addr.clone(),
                source,
            })
    }

    pub fn namespace(&self) -> Result<Namespace, ConfigError> {
        Ok(Namespace::new(self.storage.registry_schema.clone())?)
    }

    /// Base URL without its trailing slash.
    pub fn base_url(&self) -> Option<String> {
        self.gateway
            .base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.default_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.storage.database_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        self.namespace()?;

        if let Some(base_url) = self.base_url() {
            let parsed =
                url::Url::parse(&base_url).map_err(|_| ConfigError::BaseUrl(base_url.clone()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::BaseUrl(base_url));
            }
        }

        if self.gateway.default_timeout_secs == 0 {
            return Err(ConfigError::Zero("gateway.default_timeout_secs"));
        }
        if self.test_agent.history_capacity == 0 {
            return Err(ConfigError::Zero("test_agent.history_capacity"));
        }

        Ok(())
    }
}
