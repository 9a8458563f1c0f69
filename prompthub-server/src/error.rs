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

//! Maps `PromptHubError` onto the HTTP boundary exactly once: every internal
//! layer raises the typed error directly, and only this module turns it into
//! a status code and envelope body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prompthub_core::PromptHubError;
use serde::Serialize;

/// Thin wrapper so handlers can `?`-propagate `PromptHubError` and still
/// implement `IntoResponse`.
pub struct ApiError(pub PromptHubError);

impl From<PromptHubError> for ApiError {
    fn from(err: PromptHubError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    code: u32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let code = err.code();
        let status = match code {
            40100 => StatusCode::UNAUTHORIZED,
            40300 => StatusCode::FORBIDDEN,
            40400 => StatusCode::NOT_FOUND,
            40900 | 40901 => StatusCode::CONFLICT,
            42200 | 42201 => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            let correlation_id = uuid::Uuid::new_v4();
            tracing::error!(correlation_id = %correlation_id, error = %err, "internal error");
            Some(format!("correlation_id={correlation_id}"))
        } else {
            tracing::debug!(code, error = %err, "business error");
            None
        };

        let body = ErrorEnvelope {
            code,
            message: err.to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}

/// Success envelope: `{ code: 0, message: "success", data, meta? }`.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub code: u32,
    pub message: &'static str,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Serialize)]
pub struct Meta {
    pub page: u32,
    pub page_size: u32,
    pub total: usize,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { code: 0, message: "success", data, meta: None }
    }

    pub fn paginated(data: T, page: u32, page_size: u32, total: usize) -> Self {
        Self {
            code: 0,
            message: "success",
            data,
            meta: Some(Meta { page, page_size, total }),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
