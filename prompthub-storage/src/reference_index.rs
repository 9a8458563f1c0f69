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

//! Reference Index: the directed edge table backing the
//! Dependency Resolver's upstream lookups and the `/scenes/{id}/dependencies`
//! introspection endpoint.

use async_trait::async_trait;
use parking_lot::RwLock;
use prompthub_core::model::{PromptRef, RefSource};
use prompthub_core::Result;
use uuid::Uuid;

#[async_trait]
pub trait ReferenceIndex: Send + Sync {
    /// Atomically replaces every edge sourced from `scene_id`'s steps with
    /// `edges`. Called once per scene save so the index never holds stale
    /// edges from a prior pipeline shape.
    async fn replace_scene_edges(&self, scene_id: Uuid, edges: Vec<PromptRef>) -> Result<()>;

    /// Removes every edge sourced from `scene_id` (scene deletion).
    async fn remove_scene_edges(&self, scene_id: Uuid) -> Result<()>;

    /// Edges where `source == RefSource::Prompt(prompt_id)`: the upstream refs
    /// a prompt declares about itself, followed by the resolver when a
    /// pipeline step's target prompt itself has further dependencies.
    async fn out_edges(&self, prompt_id: Uuid) -> Result<Vec<PromptRef>>;

    /// Edges where `target == prompt_id`, regardless of source: every scene
    /// step or prompt that depends on this prompt. Drives impact analysis and
    /// dependency-graph visualization.
    async fn in_edges(&self, prompt_id: Uuid) -> Result<Vec<PromptRef>>;
}

/// In-memory `ReferenceIndex`, using the same `RwLock<Vec<_>>` texture as
/// `InMemoryPromptStore`.
#[derive(Default)]
pub struct InMemoryReferenceIndex {
    edges: RwLock<Vec<PromptRef>>,
}

impl InMemoryReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceIndex for InMemoryReferenceIndex {
    async fn replace_scene_edges(&self, scene_id: Uuid, edges: Vec<PromptRef>) -> Result<()> {
        let mut store = self.edges.write();
        store.retain(|e| !matches!(&e.source, RefSource::SceneStep { scene_id: sid, .. } if *sid == scene_id));
        store.extend(edges);
        Ok(())
    }

    async fn remove_scene_edges(&self, scene_id: Uuid) -> Result<()> {
        let mut store = self.edges.write();
        store.retain(|e| !matches!(&e.source, RefSource::SceneStep { scene_id: sid, .. } if *sid == scene_id));
        Ok(())
    }

    async fn out_edges(&self, prompt_id: Uuid) -> Result<Vec<PromptRef>> {
        Ok(self
            .edges
            .read()
            .iter()
            .filter(|e| matches!(&e.source, RefSource::Prompt(id) if *id == prompt_id))
            .cloned()
            .collect())
    }

    async fn in_edges(&self, prompt_id: Uuid) -> Result<Vec<PromptRef>> {
        Ok(self
            .edges
            .read()
            .iter()
            .filter(|e| e.target == prompt_id)
            .cloned()
            .collect())
    }
}
