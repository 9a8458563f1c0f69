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

//! Prompt Store: persistent CRUD of prompts and versions, slug
//! indexing, atomic publish.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use prompthub_core::{
    bump_version, Bump, PromptFormat, PromptHubError, Result, TemplateEngine, VariableDecl,
};
use prompthub_core::model::{Prompt, Version, VersionStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// Fields accepted on prompt creation.
#[derive(Debug, Clone)]
pub struct NewPrompt {
    pub project_id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub format: PromptFormat,
    pub template_engine: TemplateEngine,
    pub variable_spec: Vec<VariableDecl>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    /// Initial content, published immediately as version 0.1.0 so
    /// `current_version` always points at an existing published version.
    pub initial_content: String,
}

/// Fields accepted on prompt update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct PromptUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    Name,
    Slug,
    CurrentVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filters accepted by `list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub project_id: Option<Uuid>,
    pub slug: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub is_shared: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub offset: usize,
    pub limit: usize,
}

#[async_trait]
pub trait PromptStore: Send + Sync {
    async fn create(&self, new: NewPrompt) -> Result<Prompt>;
    async fn get(&self, id: Uuid) -> Result<Prompt>;
    async fn get_by_slug(&self, project_id: Option<Uuid>, slug: &str) -> Result<Prompt>;
    /// Returns the page of matching prompts plus the total match count
    /// (pre-pagination), for the `meta.total` envelope field.
    async fn list(&self, filters: ListFilters) -> Result<(Vec<Prompt>, usize)>;
    async fn update(&self, id: Uuid, changes: PromptUpdate) -> Result<Prompt>;
    async fn soft_delete(&self, id: Uuid) -> Result<()>;
    async fn list_versions(&self, prompt_id: Uuid) -> Result<Vec<Version>>;
    async fn get_version(&self, prompt_id: Uuid, version: &semver::Version) -> Result<Version>;
    async fn publish(
        &self,
        prompt_id: Uuid,
        bump: Bump,
        content: Option<String>,
        changelog: Option<String>,
    ) -> Result<Version>;
    async fn share(&self, prompt_id: Uuid) -> Result<Prompt>;
    /// Copy semantics (see DESIGN.md's fork Open Question): creates a
    /// brand-new, independent prompt seeded from the source's current
    /// published content.
    async fn fork(&self, source_id: Uuid, target_project_id: Uuid) -> Result<Prompt>;
}

struct ProjectSlugKey {
    project_id: Uuid,
    slug: String,
}

/// In-memory `PromptStore`. Good enough to back a single-writer deployment;
/// a SQL-backed implementation can satisfy the same trait without touching
/// the engine or API layers.
pub struct InMemoryPromptStore {
    prompts: RwLock<HashMap<Uuid, Prompt>>,
    versions: RwLock<HashMap<Uuid, Vec<Version>>>,
}

impl Default for InMemoryPromptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPromptStore {
    pub fn new() -> Self {
        Self {
            prompts: RwLock::new(HashMap::new()),
            versions: RwLock::new(HashMap::new()),
        }
    }

    fn slug_taken(&self, project_id: Uuid, slug: &str, exclude: Option<Uuid>) -> bool {
        self.prompts.read().values().any(|p| {
            !p.is_deleted()
                && p.project_id == project_id
                && p.slug == slug
                && exclude.map(|id| id != p.id).unwrap_or(true)
        })
    }

    fn validate_variable_spec(template_engine: TemplateEngine, spec: &[VariableDecl]) -> Result<()> {
        if template_engine == TemplateEngine::None && !spec.is_empty() {
            return Err(PromptHubError::Validation(
                "template_engine 'none' requires an empty variable_spec".to_string(),
            ));
        }
        for decl in spec {
            if decl.var_type == prompthub_core::VariableType::Enum {
                let values = decl.enum_values.as_ref().ok_or_else(|| {
                    PromptHubError::Validation(format!(
                        "variable '{}' has type enum but no enum_values",
                        decl.name
                    ))
                })?;
                if values.is_empty() {
                    return Err(PromptHubError::Validation(format!(
                        "variable '{}' enum_values must not be empty",
                        decl.name
                    )));
                }
                if let Some(serde_json::Value::String(default)) = &decl.default {
                    if !values.contains(default) {
                        return Err(PromptHubError::Validation(format!(
                            "variable '{}' default '{}' is outside enum_values",
                            decl.name, default
                        )));
                    }
                }
            } else if decl.enum_values.is_some() {
                return Err(PromptHubError::Validation(format!(
                    "variable '{}' has enum_values but type is not enum",
                    decl.name
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PromptStore for InMemoryPromptStore {
    async fn create(&self, new: NewPrompt) -> Result<Prompt> {
        Self::validate_variable_spec(new.template_engine, &new.variable_spec)?;

        if self.slug_taken(new.project_id, &new.slug, None) {
            return Err(PromptHubError::Conflict(format!(
                "prompt slug '{}' already exists in project {}",
                new.slug, new.project_id
            )));
        }

        let prompt_id = Uuid::new_v4();
        let now = Utc::now();
        let initial_version = semver::Version::new(0, 1, 0);

        let version = Version {
            id: Uuid::new_v4(),
            prompt_id,
            version: initial_version.clone(),
            content: new.initial_content,
            variable_spec: new.variable_spec.clone(),
            changelog: Some("initial version".to_string()),
            status: VersionStatus::Published,
            created_at: now,
        };

        let prompt = Prompt {
            id: prompt_id,
            project_id: new.project_id,
            slug: new.slug,
            name: new.name,
            description: new.description,
            current_version: initial_version,
            format: new.format,
            template_engine: new.template_engine,
            variable_spec: new.variable_spec,
            tags: new.tags,
            category: new.category,
            is_shared: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.prompts.write().insert(prompt_id, prompt.clone());
        self.versions.write().insert(prompt_id, vec![version]);
        tracing::info!(prompt_id = %prompt_id, project_id = %prompt.project_id, "created prompt");
        Ok(prompt)
    }

    async fn get(&self, id: Uuid) -> Result<Prompt> {
        self.prompts
            .read()
            .get(&id)
            .filter(|p| !p.is_deleted())
            .cloned()
            .ok_or_else(|| PromptHubError::NotFound(format!("prompt {id} not found")))
    }

    async fn get_by_slug(&self, project_id: Option<Uuid>, slug: &str) -> Result<Prompt> {
        self.prompts
            .read()
            .values()
            .find(|p| {
                !p.is_deleted()
                    && p.slug == slug
                    && project_id.map(|pid| pid == p.project_id).unwrap_or(true)
            })
            .cloned()
            .ok_or_else(|| PromptHubError::NotFound(format!("prompt slug '{slug}' not found")))
    }

    async fn list(&self, filters: ListFilters) -> Result<(Vec<Prompt>, usize)> {
        let prompts = self.prompts.read();
        let mut matched: Vec<Prompt> = prompts
            .values()
            .filter(|p| !p.is_deleted())
            .filter(|p| filters.project_id.map(|pid| pid == p.project_id).unwrap_or(true))
            .filter(|p| filters.slug.as_deref().map(|s| s == p.slug).unwrap_or(true))
            .filter(|p| {
                filters
                    .category
                    .as_deref()
                    .map(|c| p.category.as_deref() == Some(c))
                    .unwrap_or(true)
            })
            .filter(|p| filters.is_shared.map(|s| s == p.is_shared).unwrap_or(true))
            .filter(|p| {
                filters
                    .tags
                    .as_ref()
                    .map(|query| query.iter().any(|t| p.tags.contains(t)))
                    .unwrap_or(true)
            })
            .filter(|p| {
                filters
                    .search
                    .as_deref()
                    .map(|needle| {
                        let needle = needle.to_lowercase();
                        p.name.to_lowercase().contains(&needle)
                            || p.description
                                .as_deref()
                                .map(|d| d.to_lowercase().contains(&needle))
                                .unwrap_or(false)
                    })
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        sort_prompts(&mut matched, filters.sort_by, filters.order);

        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(filters.offset)
            .take(filters.limit)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, id: Uuid, changes: PromptUpdate) -> Result<Prompt> {
        let mut prompts = self.prompts.write();
        let prompt = prompts
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| PromptHubError::NotFound(format!("prompt {id} not found")))?;

        if let Some(name) = changes.name {
            prompt.name = name;
        }
        if let Some(description) = changes.description {
            prompt.description = Some(description);
        }
        if let Some(tags) = changes.tags {
            prompt.tags = tags;
        }
        if let Some(category) = changes.category {
            prompt.category = Some(category);
        }
        prompt.updated_at = Utc::now();
        tracing::info!(prompt_id = %id, "updated prompt");
        Ok(prompt.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<()> {
        let mut prompts = self.prompts.write();
        let prompt = prompts
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| PromptHubError::NotFound(format!("prompt {id} not found")))?;
        prompt.deleted_at = Some(Utc::now());
        tracing::info!(prompt_id = %id, "soft-deleted prompt");
        Ok(())
    }

    async fn list_versions(&self, prompt_id: Uuid) -> Result<Vec<Version>> {
        self.versions
            .read()
            .get(&prompt_id)
            .cloned()
            .ok_or_else(|| PromptHubError::NotFound(format!("prompt {prompt_id} not found")))
    }

    async fn get_version(&self, prompt_id: Uuid, version: &semver::Version) -> Result<Version> {
        self.versions
            .read()
            .get(&prompt_id)
            .and_then(|versions| versions.iter().find(|v| &v.version == version).cloned())
            .ok_or_else(|| {
                PromptHubError::NotFound(format!("prompt {prompt_id} version {version} not found"))
            })
    }

    async fn publish(
        &self,
        prompt_id: Uuid,
        bump: Bump,
        content: Option<String>,
        changelog: Option<String>,
    ) -> Result<Version> {
        let mut prompts = self.prompts.write();
        let mut versions = self.versions.write();

        let prompt = prompts
            .get_mut(&prompt_id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| PromptHubError::NotFound(format!("prompt {prompt_id} not found")))?;

        let history = versions
            .get_mut(&prompt_id)
            .ok_or_else(|| PromptHubError::Internal("version history missing".into()))?;

        let current = history
            .iter()
            .find(|v| v.version == prompt.current_version)
            .ok_or_else(|| PromptHubError::Internal("current_version has no version row".into()))?;

        let new_version_number = bump_version(&prompt.current_version, bump);
        if history.iter().any(|v| v.version == new_version_number) {
            return Err(PromptHubError::Conflict(format!(
                "version {new_version_number} already exists for prompt {prompt_id}"
            )));
        }

        let new_version = Version {
            id: Uuid::new_v4(),
            prompt_id,
            version: new_version_number.clone(),
            content: content.unwrap_or_else(|| current.content.clone()),
            variable_spec: prompt.variable_spec.clone(),
            changelog,
            status: VersionStatus::Published,
            created_at: Utc::now(),
        };

        // Atomic: both the new version row and current_version advance together,
        // guarded by the same write-lock acquisition.
        history.push(new_version.clone());
        prompt.current_version = new_version_number;
        prompt.updated_at = Utc::now();

        tracing::info!(prompt_id = %prompt_id, version = %new_version.version, "published new version");
        Ok(new_version)
    }

    async fn share(&self, prompt_id: Uuid) -> Result<Prompt> {
        let mut prompts = self.prompts.write();
        let prompt = prompts
            .get_mut(&prompt_id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| PromptHubError::NotFound(format!("prompt {prompt_id} not found")))?;
        prompt.is_shared = true;
        prompt.updated_at = Utc::now();
        tracing::info!(prompt_id = %prompt_id, "marked prompt as shared");
        Ok(prompt.clone())
    }

    async fn fork(&self, source_id: Uuid, target_project_id: Uuid) -> Result<Prompt> {
        let source = self.get(source_id).await?;
        let current_content = self.get_version(source_id, &source.current_version).await?;

        let mut slug = format!("{}-fork", source.slug);
        let mut suffix = 1;
        while self.slug_taken(target_project_id, &slug, None) {
            suffix += 1;
            slug = format!("{}-fork-{}", source.slug, suffix);
        }

        let new = NewPrompt {
            project_id: target_project_id,
            slug,
            name: source.name.clone(),
            description: source.description.clone(),
            format: source.format,
            template_engine: source.template_engine,
            variable_spec: current_content.variable_spec.clone(),
            tags: source.tags.clone(),
            category: source.category.clone(),
            initial_content: current_content.content.clone(),
        };
        // `is_shared` stays false on the fork: an independent copy, not a live
        // link back to the shared source.
        self.create(new).await
    }
}

fn sort_prompts(prompts: &mut [Prompt], sort_by: Option<SortKey>, order: Option<SortOrder>) {
    let order = order.unwrap_or(SortOrder::Asc);
    match sort_by.unwrap_or(SortKey::CreatedAt) {
        SortKey::CreatedAt => prompts.sort_by_key(|p| p.created_at),
        SortKey::UpdatedAt => prompts.sort_by_key(|p| p.updated_at),
        SortKey::Name => prompts.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Slug => prompts.sort_by(|a, b| a.slug.cmp(&b.slug)),
        SortKey::CurrentVersion => prompts.sort_by(|a, b| a.current_version.cmp(&b.current_version)),
    }
    if order == SortOrder::Desc {
        prompts.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompthub_core::TemplateEngine;

    fn new_prompt(project_id: Uuid, slug: &str) -> NewPrompt {
        NewPrompt {
            project_id,
            slug: slug.to_string(),
            name: slug.to_string(),
            description: None,
            format: PromptFormat::Text,
            template_engine: TemplateEngine::EngineA,
            variable_spec: vec![],
            tags: vec![],
            category: None,
            initial_content: "hello {{ name }}".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_slug_in_project_conflicts() {
        let store = InMemoryPromptStore::new();
        let project_id = Uuid::new_v4();
        store.create(new_prompt(project_id, "greet")).await.unwrap();
        let err = store.create(new_prompt(project_id, "greet")).await.unwrap_err();
        assert_eq!(err.code(), 40900);
    }

    #[tokio::test]
    async fn slug_unique_per_project_not_globally() {
        let store = InMemoryPromptStore::new();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        store.create(new_prompt(p1, "greet")).await.unwrap();
        store.create(new_prompt(p2, "greet")).await.unwrap();
    }

    #[tokio::test]
    async fn soft_delete_hides_prompt_and_frees_slug() {
        let store = InMemoryPromptStore::new();
        let project_id = Uuid::new_v4();
        let prompt = store.create(new_prompt(project_id, "greet")).await.unwrap();
        store.soft_delete(prompt.id).await.unwrap();
        assert!(store.get(prompt.id).await.is_err());
        // slug freed up for reuse
        store.create(new_prompt(project_id, "greet")).await.unwrap();
    }

    #[tokio::test]
    async fn publish_bumps_version_and_freezes_prior_content() {
        let store = InMemoryPromptStore::new();
        let project_id = Uuid::new_v4();
        let prompt = store.create(new_prompt(project_id, "greet")).await.unwrap();
        let v1 = store.get_version(prompt.id, &prompt.current_version).await.unwrap();

        let v2 = store
            .publish(prompt.id, Bump::Minor, Some("hi {{ name }}".into()), None)
            .await
            .unwrap();
        assert_eq!(v2.version, semver::Version::new(0, 2, 0));

        let updated = store.get(prompt.id).await.unwrap();
        assert_eq!(updated.current_version, v2.version);

        // v1 content/variable_spec are frozen.
        let v1_again = store.get_version(prompt.id, &v1.version).await.unwrap();
        assert_eq!(v1_again.content, v1.content);
    }

    #[tokio::test]
    async fn enum_without_values_is_rejected() {
        let store = InMemoryPromptStore::new();
        let mut new = new_prompt(Uuid::new_v4(), "bad-enum");
        new.variable_spec.push(VariableDecl {
            name: "tone".into(),
            var_type: prompthub_core::VariableType::Enum,
            required: true,
            default: None,
            enum_values: None,
        });
        let err = store.create(new).await.unwrap_err();
        assert_eq!(err.code(), 42200);
    }

    #[tokio::test]
    async fn fork_creates_independent_unshared_copy() {
        let store = InMemoryPromptStore::new();
        let project_id = Uuid::new_v4();
        let other_project = Uuid::new_v4();
        let prompt = store.create(new_prompt(project_id, "greet")).await.unwrap();
        store.share(prompt.id).await.unwrap();

        let forked = store.fork(prompt.id, other_project).await.unwrap();
        assert_ne!(forked.id, prompt.id);
        assert_eq!(forked.slug, "greet-fork");
        assert!(!forked.is_shared);
        assert_eq!(forked.project_id, other_project);
    }
}
