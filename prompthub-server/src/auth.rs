// Copyright 2026 PromptHub Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Bearer-token auth middleware: resolves a
//! `CallerIdentity` from `Authorization: Bearer <api_key>` before any handler
//! runs. The actual key/tenant mapping is out of scope (
//! Non-goals); this is the minimal directory the middleware boundary needs.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use prompthub_core::model::CallerIdentity;
use prompthub_core::PromptHubError;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Maps a static API key to the caller identity it authenticates as.
/// Entries are `key:caller_id:project_id`. An empty directory means auth is
/// disabled (development mode).
pub struct CallerDirectory {
    keys: HashMap<String, CallerIdentity>,
}

impl CallerDirectory {
    pub fn from_config_entries(entries: &[String]) -> Self {
        let mut keys = HashMap::new();
        for entry in entries {
            let parts: Vec<&str> = entry.splitn(3, ':').collect();
            if let [key, caller_id, project_id] = parts[..] {
                if let Ok(project_id) = Uuid::parse_str(project_id) {
                    keys.insert(
                        key.to_string(),
                        CallerIdentity { caller_id: caller_id.to_string(), project_id },
                    );
                }
            }
        }
        Self { keys }
    }

    pub fn is_disabled(&self) -> bool {
        self.keys.is_empty()
    }

    fn resolve(&self, api_key: &str) -> Option<CallerIdentity> {
        self.keys.get(api_key).cloned()
    }
}

/// Development fallback identity used when no `api_keys` are configured.
fn dev_identity() -> CallerIdentity {
    CallerIdentity { caller_id: "dev".to_string(), project_id: Uuid::nil() }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.caller_directory.is_disabled() {
        req.extensions_mut().insert(dev_identity());
        return Ok(next.run(req).await);
    }

    let caller = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| state.caller_directory.resolve(token))
        .ok_or(PromptHubError::Authentication)?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_is_disabled() {
        let dir = CallerDirectory::from_config_entries(&[]);
        assert!(dir.is_disabled());
    }

    #[test]
    fn parses_key_caller_project_triples() {
        let project_id = Uuid::new_v4();
        let dir = CallerDirectory::from_config_entries(&[format!("sk-abc:tester:{project_id}")]);
        let identity = dir.resolve("sk-abc").unwrap();
        assert_eq!(identity.caller_id, "tester");
        assert_eq!(identity.project_id, project_id);
    }

    #[test]
    fn unknown_key_resolves_to_none() {
        let dir = CallerDirectory::from_config_entries(&["sk-abc:tester:not-a-uuid".to_string()]);
        assert!(dir.is_disabled());
    }
}
