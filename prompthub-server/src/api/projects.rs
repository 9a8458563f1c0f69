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

//! `/projects`: thin passthrough to `ProjectStore`, which
//! is itself a stand-in for the out-of-scope external project system.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::PageQuery;
use crate::error::{ApiError, Envelope};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub slug: String,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Envelope<prompthub_core::model::Project>, ApiError> {
    let project = state.project_store.create(req.slug).await?;
    Ok(Envelope::ok(project))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<prompthub_core::model::Project>, ApiError> {
    let project = state.project_store.get(id).await?;
    Ok(Envelope::ok(project))
}

pub async fn list(
    State(state): State<AppState>,
    Query(_page): Query<PageQuery>,
) -> Result<Envelope<Vec<prompthub_core::model::Project>>, ApiError> {
    let projects = state.project_store.list().await?;
    Ok(Envelope::ok(projects))
}

pub async fn prompts(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Envelope<Vec<prompthub_core::model::Prompt>>, ApiError> {
    let pagination = page.pagination(state.max_page_size);
    let filters = prompthub_storage::ListFilters {
        project_id: Some(project_id),
        offset: pagination.offset(),
        limit: pagination.limit(),
        ..Default::default()
    };
    let (prompts, total) = state.prompt_store.list(filters).await?;
    Ok(Envelope::paginated(prompts, pagination.page, pagination.page_size, total))
}
