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

//! `/scenes`: pipeline CRUD through `SceneService` (keeps the
//! Reference Index in sync), plus the core `resolve` and `dependencies` ops.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use prompthub_core::model::{CallerIdentity, MergeStrategy, PromptFormat, Step};
use prompthub_storage::{NewScene, SceneUpdate};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::api::PageQuery;
use crate::error::{ApiError, Envelope};
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListScenesQuery>,
) -> Result<Envelope<Vec<prompthub_core::model::Scene>>, ApiError> {
    let scenes = state.scene_service.list(q.project_id).await?;
    Ok(Envelope::ok(scenes))
}

#[derive(Debug, Deserialize)]
pub struct ListScenesQuery {
    pub project_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateSceneRequest {
    pub project_id: Uuid,
    pub slug: String,
    pub pipeline: Vec<Step>,
    pub merge_strategy: MergeStrategy,
    #[serde(default = "default_separator")]
    pub separator: String,
    pub output_format: PromptFormat,
}

fn default_separator() -> String {
    "\n".to_string()
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSceneRequest>,
) -> Result<Envelope<prompthub_core::model::Scene>, ApiError> {
    let scene = state
        .scene_service
        .create(NewScene {
            project_id: req.project_id,
            slug: req.slug,
            pipeline: req.pipeline,
            merge_strategy: req.merge_strategy,
            separator: req.separator,
            output_format: req.output_format,
        })
        .await?;
    Ok(Envelope::ok(scene))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<prompthub_core::model::Scene>, ApiError> {
    let scene = state.scene_service.get(id).await?;
    Ok(Envelope::ok(scene))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateSceneRequest {
    pub pipeline: Option<Vec<Step>>,
    pub merge_strategy: Option<MergeStrategy>,
    pub separator: Option<String>,
    pub output_format: Option<PromptFormat>,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSceneRequest>,
) -> Result<Envelope<prompthub_core::model::Scene>, ApiError> {
    let scene = state
        .scene_service
        .update(
            id,
            SceneUpdate {
                pipeline: req.pipeline,
                merge_strategy: req.merge_strategy,
                separator: req.separator,
                output_format: req.output_format,
            },
        )
        .await?;
    state.engine.invalidate_scene(id);
    Ok(Envelope::ok(scene))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<()>, ApiError> {
    state.scene_service.soft_delete(id).await?;
    state.engine.invalidate_scene(id);
    Ok(Envelope::ok(()))
}

#[derive(Debug, Deserialize, Default)]
pub struct ResolveRequest {
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
    pub deadline_ms: Option<u64>,
}

pub async fn resolve(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveRequest>,
) -> Result<Envelope<prompthub_engine::SceneResolveResult>, ApiError> {
    let scene = state.scene_service.get(id).await?;
    let deadline = req.deadline_ms.map(Duration::from_millis);
    let (result, _cache_hit) = state
        .engine
        .resolve_scene(&scene, req.variables, &caller, deadline)
        .await?;
    Ok(Envelope::ok(result))
}

pub async fn dependencies(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<prompthub_engine::ResolvedPlan>, ApiError> {
    let scene = state.scene_service.get(id).await?;
    let plan = prompthub_engine::resolve_plan(&scene, state.reference_index.as_ref()).await?;
    Ok(Envelope::ok(plan))
}
