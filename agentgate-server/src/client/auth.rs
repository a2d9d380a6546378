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

//! Outbound auth from card auth schemes.

use std::collections::BTreeMap;

pub const API_KEY_ENV: &str = "A2A_API_KEY";
pub const OAUTH_TOKEN_ENV: &str = "A2A_OAUTH_TOKEN";

/// Credentials used for outbound calls. Only ever read from the environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthSecrets {
    pub api_key: Option<String>,
    pub oauth_token: Option<String>,
}

impl std::fmt::Debug for AuthSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSecrets")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("oauth_token", &self.oauth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthSecrets {
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            api_key: read(API_KEY_ENV),
            oauth_token: read(OAUTH_TOKEN_ENV),
        }
    }
}

/// Headers for a call plus the schemes that were not understood.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAuth {
    pub headers: BTreeMap<String, String>,
    pub unknown_schemes: Vec<String>,
}

fn bearer(token: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), format!("Bearer {}", token));
    headers
}

/// Walk the card's schemes in order and stop at the first one that settles
/// the question. `none` (or a blank entry) means no auth; a known scheme
/// without a configured secret falls through to the next entry.
pub fn resolve_auth_headers(schemes: &[String], secrets: &AuthSecrets) -> ResolvedAuth {
    let mut resolved = ResolvedAuth::default();
    for scheme in schemes {
        match scheme.to_lowercase().as_str() {
            "" | "none" => return resolved,
            "apikey" => {
                if let Some(key) = &secrets.api_key {
                    resolved.headers = bearer(key);
                    return resolved;
                }
            }
            "oauth2" | "oauth" => {
                if let Some(token) = &secrets.oauth_token {
                    resolved.headers = bearer(token);
                    return resolved;
                }
            }
            other => resolved.unknown_schemes.push(other.to_string()),
        }
    }
    resolved
}
