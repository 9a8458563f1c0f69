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

//! `/prompts`: CRUD, version history, publish, render, share.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use prompthub_core::model::{CallerIdentity, PromptFormat, TemplateEngine, VariableDecl};
use prompthub_core::Bump;
use prompthub_storage::{ListFilters, NewPrompt, PromptUpdate, SortKey, SortOrder};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::PageQuery;
use crate::error::{ApiError, Envelope};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPromptsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub project_id: Option<Uuid>,
    pub slug: Option<String>,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub is_shared: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListPromptsQuery>,
) -> Result<Envelope<Vec<prompthub_core::model::Prompt>>, ApiError> {
    let pagination = PageQuery { page: q.page, page_size: q.page_size }.pagination(state.max_page_size);
    let filters = ListFilters {
        project_id: q.project_id,
        slug: q.slug,
        tags: q.tags.map(|t| t.split(',').map(str::to_string).collect()),
        category: q.category,
        is_shared: q.is_shared,
        search: q.search,
        sort_by: q.sort_by.as_deref().map(parse_sort_key),
        order: q.order.as_deref().map(parse_sort_order),
        offset: pagination.offset(),
        limit: pagination.limit(),
    };
    let (prompts, total) = state.prompt_store.list(filters).await?;
    Ok(Envelope::paginated(prompts, pagination.page, pagination.page_size, total))
}

fn parse_sort_key(raw: &str) -> SortKey {
    match raw {
        "updated_at" => SortKey::UpdatedAt,
        "name" => SortKey::Name,
        "slug" => SortKey::Slug,
        "current_version" => SortKey::CurrentVersion,
        _ => SortKey::CreatedAt,
    }
}

fn parse_sort_order(raw: &str) -> SortOrder {
    if raw.eq_ignore_ascii_case("desc") {
        SortOrder::Desc
    } else {
        SortOrder::Asc
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePromptRequest {
    pub project_id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub format: PromptFormat,
    pub template_engine: TemplateEngine,
    #[serde(default)]
    pub variable_spec: Vec<VariableDecl>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub content: String,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePromptRequest>,
) -> Result<Envelope<prompthub_core::model::Prompt>, ApiError> {
    let prompt = state
        .prompt_store
        .create(NewPrompt {
            project_id: req.project_id,
            slug: req.slug,
            name: req.name,
            description: req.description,
            format: req.format,
            template_engine: req.template_engine,
            variable_spec: req.variable_spec,
            tags: req.tags,
            category: req.category,
            initial_content: req.content,
        })
        .await?;
    Ok(Envelope::ok(prompt))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<prompthub_core::model::Prompt>, ApiError> {
    let prompt = state.prompt_store.get(id).await?;
    Ok(Envelope::ok(prompt))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatePromptRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePromptRequest>,
) -> Result<Envelope<prompthub_core::model::Prompt>, ApiError> {
    let prompt = state
        .prompt_store
        .update(
            id,
            PromptUpdate {
                name: req.name,
                description: req.description,
                tags: req.tags,
                category: req.category,
            },
        )
        .await?;
    state.engine.invalidate_prompt(id);
    Ok(Envelope::ok(prompt))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<()>, ApiError> {
    state.prompt_store.soft_delete(id).await?;
    state.engine.invalidate_prompt(id);
    Ok(Envelope::ok(()))
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Vec<prompthub_core::model::Version>>, ApiError> {
    let versions = state.prompt_store.list_versions(id).await?;
    Ok(Envelope::ok(versions))
}

pub async fn get_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(Uuid, String)>,
) -> Result<Envelope<prompthub_core::model::Version>, ApiError> {
    let version = semver::Version::parse(&version)
        .map_err(|e| prompthub_core::PromptHubError::Validation(format!("invalid version: {e}")))?;
    let row = state.prompt_store.get_version(id, &version).await?;
    Ok(Envelope::ok(row))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub bump: Bump,
    pub content: Option<String>,
    pub changelog: Option<String>,
}

pub async fn publish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishRequest>,
) -> Result<Envelope<prompthub_core::model::Version>, ApiError> {
    let version = state
        .prompt_store
        .publish(id, req.bump, req.content, req.changelog)
        .await?;
    state.engine.invalidate_prompt(id);
    Ok(Envelope::ok(version))
}

#[derive(Debug, Deserialize, Default)]
pub struct RenderRequest {
    pub version: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
}

#[derive(Debug, serde::Serialize)]
pub struct RenderResponse {
    pub content: String,
    pub token_estimate: usize,
}

pub async fn render(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenderRequest>,
) -> Result<Envelope<RenderResponse>, ApiError> {
    let version = req
        .version
        .as_deref()
        .map(semver::Version::parse)
        .transpose()
        .map_err(|e| prompthub_core::PromptHubError::Validation(format!("invalid version: {e}")))?;
    let (content, token_estimate) =
        state.engine.render_prompt(id, version, req.variables, &caller).await?;
    Ok(Envelope::ok(RenderResponse { content, token_estimate }))
}

pub async fn share(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<prompthub_core::model::Prompt>, ApiError> {
    let prompt = state.prompt_store.share(id).await?;
    state.engine.invalidate_prompt(id);
    Ok(Envelope::ok(prompt))
}
