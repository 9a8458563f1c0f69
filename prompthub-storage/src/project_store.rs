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

//! `ProjectStore`: a thin stand-in for the out-of-scope, externally-owned
//! project/user system (see spec.md §1 Non-goals). PromptHub only ever needs
//! to check a project exists and list its id/slug, so this is deliberately a
//! read-mostly sliver rather than a full projects service.

use async_trait::async_trait;
use parking_lot::RwLock;
use prompthub_core::model::Project;
use prompthub_core::{PromptHubError, Result};
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create(&self, slug: String) -> Result<Project>;
    async fn get(&self, id: Uuid) -> Result<Project>;
    async fn list(&self) -> Result<Vec<Project>>;
}

#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<Uuid, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn create(&self, slug: String) -> Result<Project> {
        if self.projects.read().values().any(|p| p.slug == slug) {
            return Err(PromptHubError::Conflict(format!(
                "project slug '{slug}' already exists"
            )));
        }
        let project = Project {
            id: Uuid::new_v4(),
            slug,
        };
        self.projects.write().insert(project.id, project.clone());
        Ok(project)
    }

    async fn get(&self, id: Uuid) -> Result<Project> {
        self.projects
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| PromptHubError::NotFound(format!("project {id} not found")))
    }

    async fn list(&self) -> Result<Vec<Project>> {
        Ok(self.projects.read().values().cloned().collect())
    }
}
