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

//! `/shared/prompts`: cross-project browsing and forking of
//! prompts marked `is_shared`.

use axum::extract::{Path, Query, State};
use axum::Extension;
use prompthub_core::model::CallerIdentity;
use prompthub_storage::ListFilters;
use uuid::Uuid;

use crate::api::PageQuery;
use crate::error::{ApiError, Envelope};
use crate::AppState;

pub async fn list_shared(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Envelope<Vec<prompthub_core::model::Prompt>>, ApiError> {
    let pagination = page.pagination(state.max_page_size);
    let filters = ListFilters {
        is_shared: Some(true),
        offset: pagination.offset(),
        limit: pagination.limit(),
        ..Default::default()
    };
    let (prompts, total) = state.prompt_store.list(filters).await?;
    Ok(Envelope::paginated(prompts, pagination.page, pagination.page_size, total))
}

pub async fn fork(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<prompthub_core::model::Prompt>, ApiError> {
    let source = state.prompt_store.get(id).await?;
    if !source.is_shared && source.project_id != caller.project_id {
        return Err(ApiError(prompthub_core::PromptHubError::PermissionDenied(
            format!("prompt {id} is not shared"),
        )));
    }
    let forked = state.prompt_store.fork(id, caller.project_id).await?;
    Ok(Envelope::ok(forked))
}
