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

//! Shared error taxonomy. Mapped once at the API boundary (see `prompthub-server::api`);
//! internal layers raise these directly and never log-and-swallow.

use thiserror::Error;

/// Reason a template failed to render. Mirrors 's `kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateErrorKind {
    UndefinedVariable,
    TypeMismatch,
    EnumViolation,
    SyntaxError,
    SandboxViolation,
    MissingRequired,
}

/// The stable error taxonomy. `code()` returns the exact
/// numeric contract; never renumber a variant once shipped.
#[derive(Debug, Error)]
pub enum PromptHubError {
    #[error("authentication failed")]
    Authentication,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("circular dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("template render error ({kind:?}): {message}")]
    TemplateRender {
        kind: TemplateErrorKind,
        message: String,
    },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PromptHubError {
    /// The stable numeric error code.
    pub fn code(&self) -> u32 {
        match self {
            PromptHubError::Authentication => 40100,
            PromptHubError::PermissionDenied(_) => 40300,
            PromptHubError::NotFound(_) => 40400,
            PromptHubError::Conflict(_) => 40900,
            PromptHubError::CircularDependency { .. } => 40901,
            PromptHubError::Validation(_) => 42200,
            PromptHubError::TemplateRender { .. } => 42201,
            PromptHubError::DeadlineExceeded => 50000,
            PromptHubError::Internal(_) => 50000,
        }
    }

    /// Whether a `CallLog` should still be written for this failure: written
    /// on success and on expected business errors where a resolve was
    /// attempted; internal errors are never logged to call_logs.
    pub fn is_expected_business_error(&self) -> bool {
        !matches!(
            self,
            PromptHubError::Internal(_) | PromptHubError::DeadlineExceeded
        )
    }
}

pub type Result<T> = std::result::Result<T, PromptHubError>;
