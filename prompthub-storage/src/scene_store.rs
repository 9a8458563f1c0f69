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

//! Scene storage: raw CRUD for scene pipelines. Deriving and replacing the
//! `ReferenceIndex` edges on save is a `prompthub-engine` responsibility (it
//! needs the Dependency Resolver's edge-derivation logic), not this crate's.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use prompthub_core::model::{MergeStrategy, PromptFormat, Scene, Step};
use prompthub_core::{PromptHubError, Result};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewScene {
    pub project_id: Uuid,
    pub slug: String,
    pub pipeline: Vec<Step>,
    pub merge_strategy: MergeStrategy,
    pub separator: String,
    pub output_format: PromptFormat,
}

#[derive(Debug, Clone, Default)]
pub struct SceneUpdate {
    pub pipeline: Option<Vec<Step>>,
    pub merge_strategy: Option<MergeStrategy>,
    pub separator: Option<String>,
    pub output_format: Option<PromptFormat>,
}

#[async_trait]
pub trait SceneStore: Send + Sync {
    async fn create(&self, new: NewScene) -> Result<Scene>;
    async fn get(&self, id: Uuid) -> Result<Scene>;
    async fn list(&self, project_id: Uuid) -> Result<Vec<Scene>>;
    async fn update(&self, id: Uuid, changes: SceneUpdate) -> Result<Scene>;
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
}

#[derive(Default)]
pub struct InMemorySceneStore {
    scenes: RwLock<HashMap<Uuid, Scene>>,
}

impl InMemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slug_taken(&self, project_id: Uuid, slug: &str) -> bool {
        self.scenes
            .read()
            .values()
            .any(|s| !s.is_deleted() && s.project_id == project_id && s.slug == slug)
    }
}

#[async_trait]
impl SceneStore for InMemorySceneStore {
    async fn create(&self, new: NewScene) -> Result<Scene> {
        if self.slug_taken(new.project_id, &new.slug) {
            return Err(PromptHubError::Conflict(format!(
                "scene slug '{}' already exists in project {}",
                new.slug, new.project_id
            )));
        }
        let now = Utc::now();
        let scene = Scene {
            id: Uuid::new_v4(),
            project_id: new.project_id,
            slug: new.slug,
            pipeline: new.pipeline,
            merge_strategy: new.merge_strategy,
            separator: new.separator,
            output_format: new.output_format,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.scenes.write().insert(scene.id, scene.clone());
        tracing::info!(scene_id = %scene.id, "created scene");
        Ok(scene)
    }

    async fn get(&self, id: Uuid) -> Result<Scene> {
        self.scenes
            .read()
            .get(&id)
            .filter(|s| !s.is_deleted())
            .cloned()
            .ok_or_else(|| PromptHubError::NotFound(format!("scene {id} not found")))
    }

    async fn list(&self, project_id: Uuid) -> Result<Vec<Scene>> {
        Ok(self
            .scenes
            .read()
            .values()
            .filter(|s| !s.is_deleted() && s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, changes: SceneUpdate) -> Result<Scene> {
        let mut scenes = self.scenes.write();
        let scene = scenes
            .get_mut(&id)
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| PromptHubError::NotFound(format!("scene {id} not found")))?;

        if let Some(pipeline) = changes.pipeline {
            scene.pipeline = pipeline;
        }
        if let Some(merge_strategy) = changes.merge_strategy {
            scene.merge_strategy = merge_strategy;
        }
        if let Some(separator) = changes.separator {
            scene.separator = separator;
        }
        if let Some(output_format) = changes.output_format {
            scene.output_format = output_format;
        }
        scene.updated_at = Utc::now();
        tracing::info!(scene_id = %id, "updated scene");
        Ok(scene.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        let mut scenes = self.scenes.write();
        let scene = scenes
            .get_mut(&id)
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| PromptHubError::NotFound(format!("scene {id} not found")))?;
        scene.deleted_at = Some(Utc::now());
        tracing::info!(scene_id = %id, "soft-deleted scene");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompthub_core::model::{PromptRefSpec, VersionSelector};

    fn new_scene(project_id: Uuid, slug: &str) -> NewScene {
        NewScene {
            project_id,
            slug: slug.to_string(),
            pipeline: vec![Step {
                step_id: "s1".into(),
                prompt_ref: PromptRefSpec {
                    prompt_id: Uuid::new_v4(),
                    version: VersionSelector::Latest,
                },
                variables: HashMap::new(),
                condition: None,
            }],
            merge_strategy: MergeStrategy::Concat,
            separator: "\n".into(),
            output_format: PromptFormat::Text,
        }
    }

    #[tokio::test]
    async fn duplicate_scene_slug_conflicts() {
        let store = InMemorySceneStore::new();
        let project_id = Uuid::new_v4();
        store.create(new_scene(project_id, "onboarding")).await.unwrap();
        let err = store.create(new_scene(project_id, "onboarding")).await.unwrap_err();
        assert_eq!(err.code(), 40900);
    }

    #[tokio::test]
    async fn soft_deleted_scene_is_hidden() {
        let store = InMemorySceneStore::new();
        let project_id = Uuid::new_v4();
        let scene = store.create(new_scene(project_id, "onboarding")).await.unwrap();
        store.soft_delete(scene.id).await.unwrap();
        assert!(store.get(scene.id).await.is_err());
        assert!(store.list(project_id).await.unwrap().is_empty());
    }
}
