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

//! Domain model for PromptHub: projects, prompts, versions, refs, scenes, and
//! call logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identity-only from the core's perspective; owned and CRUD'd by an external
/// `ProjectStore` (see spec.md §1 Non-goals). Kept here because prompts and
/// scenes reference it by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: Uuid,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFormat {
    Text,
    Json,
    Yaml,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateEngine {
    EngineA,
    EngineB,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    String,
    Integer,
    Number,
    Boolean,
    Enum,
    Object,
    Array,
}

/// A single entry of a prompt or version's `variable_spec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub enum_values: Option<Vec<String>>,
}

/// The logical, mutable artifact. `current_version` must always resolve to an
/// existing published `Version` row (enforced by the store on `publish`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: Uuid,
    pub project_id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub current_version: semver::Version,
    pub format: PromptFormat,
    pub template_engine: TemplateEngine,
    pub variable_spec: Vec<VariableDecl>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub is_shared: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Prompt {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Published,
    Deprecated,
}

/// An immutable snapshot of a prompt's content. Once `status` becomes
/// `Published`, `content` and `variable_spec` are frozen for good (see
/// Testable Property 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub version: semver::Version,
    pub content: String,
    pub variable_spec: Vec<VariableDecl>,
    pub changelog: Option<String>,
    pub status: VersionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    Extends,
    Includes,
    Composes,
}

/// Where a `PromptRef` edge originates: either a scene pipeline step (the
/// mandatory, scene-derived path) or another prompt's textual citation
/// (deferred as a non-goal for the first implementation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefSource {
    SceneStep { scene_id: Uuid, step_id: String },
    Prompt(Uuid),
}

/// A directed edge `source -> target`. Cross-project edges require
/// `target.is_shared == true` at reference time (enforced by the resolver, not
/// the index itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRef {
    pub source: RefSource,
    pub target: Uuid,
    pub ref_type: RefType,
    pub override_config: Option<HashMap<String, serde_json::Value>>,
    pub pinned_version: Option<semver::Version>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    Concat,
    Chain,
    SelectBest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Eq,
    Neq,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Exists,
    NotExists,
}

/// A three-term predicate evaluated over a step's merged variable scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub variable: String,
    pub operator: ConditionOp,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// `version` may be a literal semver or the symbol `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSelector {
    Latest,
    Exact(semver::Version),
}

impl VersionSelector {
    pub fn parse(raw: Option<&str>) -> std::result::Result<Self, semver::Error> {
        match raw {
            None | Some("latest") => Ok(VersionSelector::Latest),
            Some(v) => semver::Version::parse(v).map(VersionSelector::Exact),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRefSpec {
    pub prompt_id: Uuid,
    pub version: VersionSelector,
}

/// One step of a scene pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step_id: String,
    pub prompt_ref: PromptRefSpec,
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub condition: Option<Condition>,
}

/// A named pipeline yielding one final rendered text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: Uuid,
    pub project_id: Uuid,
    pub slug: String,
    pub pipeline: Vec<Step>,
    pub merge_strategy: MergeStrategy,
    pub separator: String,
    pub output_format: PromptFormat,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Scene {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The caller identity an (external, out-of-scope) auth middleware is assumed
/// to have already resolved from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub caller_id: String,
    pub project_id: Uuid,
}

/// Telemetry record for a resolved call. Durability is best-effort; this
/// struct is the payload handed to the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLog {
    pub id: Uuid,
    pub prompt_id: Option<Uuid>,
    pub scene_id: Option<Uuid>,
    pub resolved_version: Option<String>,
    pub caller_id: String,
    pub caller_project_id: Uuid,
    pub input_variables: serde_json::Value,
    pub rendered_content: String,
    pub token_estimate: usize,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Pagination filters shared by `list` endpoints.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.page_size) as usize
    }

    pub fn limit(&self) -> usize {
        self.page_size as usize
    }
}
