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

use agentgate_server::{config::ServerConfig, run_server};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config file)
    #[arg(long, env = "AGENTGATE_HTTP_ADDR")]
    http_addr: Option<String>,

    /// SQLite database path (overrides config file)
    #[arg(long, env = "AGENTGATE_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Public base URL used to resolve relative agent URLs
    #[arg(long, env = "AGENTGATE_BASE_URL")]
    base_url: Option<String>,

    /// Do not mount the test agent
    #[arg(long)]
    no_test_agent: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::load(args.config)?;

    // CLI overrides
    if let Some(addr) = args.http_addr {
        config.server.listen_addr = addr;
    }
    if let Some(path) = args.database_path {
        config.storage.database_path = path;
    }
    if let Some(base_url) = args.base_url {
        config.gateway.base_url = Some(base_url);
    }
    if args.no_test_agent {
        config.test_agent.enabled = false;
    }
    if args.log_json {
        config.server.json_logs = true;
    }

    run_server(config).await
}
