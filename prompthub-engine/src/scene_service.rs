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

//! Orchestrates `SceneStore` writes with the Reference Index edges they imply
//! ("Refs are created implicitly when a scene pipeline is
//! saved... the Reference Index is re-derived from the pipeline").
//!
//! Design note: a pipeline `Step` carries only static `variables`, not its
//! own `override_config` — that field lives on `PromptRef`. For scene-derived
//! edges this service seeds `override_config` from the step's `variables` at
//! save time, so the edge and the step agree. This keeps the ref-level layer
//! in 's four-layer precedence meaningful for non-scene-derived
//! refs (a prompt's own `extends` declarations) while scene steps see a
//! consistent, redundant-by-design pair of layers.

use prompthub_core::model::{PromptRef, RefSource, RefType, Scene};
use prompthub_core::Result;
use prompthub_storage::{NewScene, ReferenceIndex, SceneStore, SceneUpdate};
use std::sync::Arc;
use uuid::Uuid;

pub struct SceneService {
    scene_store: Arc<dyn SceneStore>,
    reference_index: Arc<dyn ReferenceIndex>,
}

impl SceneService {
    pub fn new(scene_store: Arc<dyn SceneStore>, reference_index: Arc<dyn ReferenceIndex>) -> Self {
        Self { scene_store, reference_index }
    }

    pub async fn create(&self, new: NewScene) -> Result<Scene> {
        let scene = self.scene_store.create(new).await?;
        self.reference_index
            .replace_scene_edges(scene.id, derive_edges(&scene))
            .await?;
        Ok(scene)
    }

    pub async fn update(&self, id: Uuid, changes: SceneUpdate) -> Result<Scene> {
        let scene = self.scene_store.update(id, changes).await?;
        self.reference_index
            .replace_scene_edges(scene.id, derive_edges(&scene))
            .await?;
        Ok(scene)
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.scene_store.soft_delete(id).await?;
        self.reference_index.remove_scene_edges(id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Scene> {
        self.scene_store.get(id).await
    }

    pub async fn list(&self, project_id: Uuid) -> Result<Vec<Scene>> {
        self.scene_store.list(project_id).await
    }
}

fn derive_edges(scene: &Scene) -> Vec<PromptRef> {
    scene
        .pipeline
        .iter()
        .map(|step| PromptRef {
            source: RefSource::SceneStep {
                scene_id: scene.id,
                step_id: step.step_id.clone(),
            },
            target: step.prompt_ref.prompt_id,
            ref_type: RefType::Includes,
            override_config: Some(
                step.variables
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            pinned_version: match &step.prompt_ref.version {
                prompthub_core::model::VersionSelector::Exact(v) => Some(v.clone()),
                prompthub_core::model::VersionSelector::Latest => None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompthub_core::model::{MergeStrategy, PromptFormat, PromptRefSpec, Step, VersionSelector};
    use prompthub_storage::{InMemoryReferenceIndex, InMemorySceneStore};
    use std::collections::HashMap;

    #[tokio::test]
    async fn create_scene_derives_matching_edge() {
        let scene_store = Arc::new(InMemorySceneStore::new());
        let reference_index = Arc::new(InMemoryReferenceIndex::new());
        let service = SceneService::new(scene_store, reference_index.clone());

        let project_id = Uuid::new_v4();
        let prompt_id = Uuid::new_v4();
        let mut vars = HashMap::new();
        vars.insert("style".to_string(), serde_json::json!("serif"));

        let scene = service
            .create(NewScene {
                project_id,
                slug: "s".into(),
                pipeline: vec![Step {
                    step_id: "s1".into(),
                    prompt_ref: PromptRefSpec { prompt_id, version: VersionSelector::Latest },
                    variables: vars,
                    condition: None,
                }],
                merge_strategy: MergeStrategy::Concat,
                separator: "\n".into(),
                output_format: PromptFormat::Text,
            })
            .await
            .unwrap();

        let edges = reference_index.in_edges(prompt_id).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert!(matches!(&edges[0].source, RefSource::SceneStep { scene_id, step_id }
            if *scene_id == scene.id && step_id == "s1"));
        assert_eq!(
            edges[0].override_config.as_ref().unwrap().get("style"),
            Some(&serde_json::json!("serif"))
        );
    }

    #[tokio::test]
    async fn delete_scene_removes_its_edges() {
        let scene_store = Arc::new(InMemorySceneStore::new());
        let reference_index = Arc::new(InMemoryReferenceIndex::new());
        let service = SceneService::new(scene_store, reference_index.clone());

        let project_id = Uuid::new_v4();
        let prompt_id = Uuid::new_v4();
        let scene = service
            .create(NewScene {
                project_id,
                slug: "s".into(),
                pipeline: vec![Step {
                    step_id: "s1".into(),
                    prompt_ref: PromptRefSpec { prompt_id, version: VersionSelector::Latest },
                    variables: HashMap::new(),
                    condition: None,
                }],
                merge_strategy: MergeStrategy::Concat,
                separator: "\n".into(),
                output_format: PromptFormat::Text,
            })
            .await
            .unwrap();

        service.soft_delete(scene.id).await.unwrap();
        assert!(reference_index.in_edges(prompt_id).await.unwrap().is_empty());
    }
}
