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

//! Scene Engine: executes a resolved pipeline end to end —
//! variable precedence merge, condition evaluation, per-step render, and the
//! scene's merge strategy.

use crate::condition;
use crate::resolver::{resolve_plan, ResolvedPlan};
use chrono::Utc;
use prompthub_core::model::{CallLog, CallerIdentity, MergeStrategy, Prompt, Scene, Step, VersionSelector};
use prompthub_core::{estimate_tokens, PromptHubError, Result};
use prompthub_storage::{PromptStore, ReferenceIndex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize)]
pub struct StepResult {
    pub step_id: String,
    pub prompt_id: Uuid,
    pub resolved_version: semver::Version,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub rendered_content: Option<String>,
    pub token_estimate: Option<usize>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SceneResolveResult {
    pub final_content: String,
    pub steps: Vec<StepResult>,
    pub total_token_estimate: usize,
    pub warnings: Vec<String>,
}

/// Everything the Scene Engine needs that crosses a trait boundary.
pub struct SceneEngine {
    pub prompt_store: std::sync::Arc<dyn PromptStore>,
    pub reference_index: std::sync::Arc<dyn ReferenceIndex>,
}

/// The cheap half of a resolve: cycle detection plus a batched read of every
/// prompt the plan touches (one query per distinct `prompt_id`). Computing
/// this does not render anything, so the Resolve Cache can check for a hit
/// before paying for the expensive half.
pub struct PlanContext {
    pub plan: ResolvedPlan,
    pub prompts: HashMap<Uuid, Prompt>,
    pub versions: HashMap<Uuid, semver::Version>,
}

impl PlanContext {
    pub fn plan_version_tuple(&self) -> Vec<(Uuid, semver::Version)> {
        self.plan.version_tuple(&self.versions)
    }
}

impl SceneEngine {
    pub fn new(
        prompt_store: std::sync::Arc<dyn PromptStore>,
        reference_index: std::sync::Arc<dyn ReferenceIndex>,
    ) -> Self {
        Self { prompt_store, reference_index }
    }

    /// Resolves the DAG and batches the Prompt Store reads it implies, but
    /// renders nothing yet.
    pub async fn plan(&self, scene: &Scene) -> Result<PlanContext> {
        let plan = resolve_plan(scene, self.reference_index.as_ref()).await?;

        let mut prompts: HashMap<Uuid, Prompt> = HashMap::new();
        let mut versions: HashMap<Uuid, semver::Version> = HashMap::new();
        for node in &plan.nodes {
            if prompts.contains_key(&node.prompt_id) {
                continue;
            }
            let prompt = self.prompt_store.get(node.prompt_id).await?;
            if prompt.project_id != scene.project_id && !prompt.is_shared {
                return Err(PromptHubError::PermissionDenied(format!(
                    "prompt {} is not shared outside its project",
                    prompt.id
                )));
            }
            versions.insert(prompt.id, prompt.current_version.clone());
            prompts.insert(prompt.id, prompt);
        }

        Ok(PlanContext { plan, prompts, versions })
    }

    /// Resolves a scene's full pipeline in one call (plan + execute), for
    /// callers that don't need the Resolve Cache's short-circuit. `deadline`
    /// is checked between steps; exceeding it aborts with
    /// `DeadlineExceeded` and no `CallLog` is produced for this attempt (the
    /// caller decides that).
    pub async fn resolve(
        &self,
        scene: &Scene,
        variables: &HashMap<String, Value>,
        caller: &CallerIdentity,
        deadline: Instant,
    ) -> Result<(SceneResolveResult, Vec<(Uuid, semver::Version)>)> {
        let ctx = self.plan(scene).await?;
        self.execute(scene, &ctx, variables, caller, deadline).await
    }

    /// The expensive half: renders every step against the already-resolved
    /// plan and merges per `merge_strategy`.
    pub async fn execute(
        &self,
        scene: &Scene,
        ctx: &PlanContext,
        variables: &HashMap<String, Value>,
        caller: &CallerIdentity,
        deadline: Instant,
    ) -> Result<(SceneResolveResult, Vec<(Uuid, semver::Version)>)> {
        let _ = caller; // reserved for future per-caller redaction/ACL hooks
        let mut step_results = Vec::with_capacity(scene.pipeline.len());
        let mut prior_output: Option<String> = None;
        let mut warnings = Vec::new();

        for step in &scene.pipeline {
            if Instant::now() >= deadline {
                return Err(PromptHubError::DeadlineExceeded);
            }

            let prompt = ctx
                .prompts
                .get(&step.prompt_ref.prompt_id)
                .cloned()
                .ok_or_else(|| PromptHubError::NotFound(format!("prompt {} not found", step.prompt_ref.prompt_id)))?;

            let version_number = match &step.prompt_ref.version {
                VersionSelector::Latest => prompt.current_version.clone(),
                VersionSelector::Exact(v) => v.clone(),
            };
            let version = self.prompt_store.get_version(prompt.id, &version_number).await?;

            let mut scope = self.merge_scope(scene.id, step, &prompt, variables).await?;
            if let Some(prior) = &prior_output {
                scope.insert("prior_output".to_string(), Value::String(prior.clone()));
            }

            if !condition::evaluate(step.condition.as_ref(), &scope) {
                step_results.push(StepResult {
                    step_id: step.step_id.clone(),
                    prompt_id: prompt.id,
                    resolved_version: version_number,
                    skipped: true,
                    skip_reason: Some("condition false".to_string()),
                    rendered_content: None,
                    token_estimate: None,
                    score: None,
                });
                continue;
            }

            let rendered = prompthub_render::render(prompt.template_engine, &version.content, &version.variable_spec, &scope)?;
            let token_estimate = estimate_tokens(&rendered);
            let score = extract_score(&rendered);
            prior_output = Some(rendered.clone());

            step_results.push(StepResult {
                step_id: step.step_id.clone(),
                prompt_id: prompt.id,
                resolved_version: version_number,
                skipped: false,
                skip_reason: None,
                rendered_content: Some(rendered),
                token_estimate: Some(token_estimate),
                score,
            });
        }

        let (final_content, merge_warning) = merge(&step_results, scene.merge_strategy, &scene.separator);
        if let Some(w) = merge_warning {
            warnings.push(w);
        }

        let total_token_estimate = step_results
            .iter()
            .filter_map(|s| s.token_estimate)
            .sum();

        let plan_version_tuple = ctx.plan_version_tuple();

        Ok((
            SceneResolveResult {
                final_content,
                steps: step_results,
                total_token_estimate,
                warnings,
            },
            plan_version_tuple,
        ))
    }

    /// Variable precedence (lowest to highest): prompt defaults, step-static
    /// `variables`, the reference edge's `override_config`, caller-supplied
    /// variables.
    async fn merge_scope(
        &self,
        scene_id: Uuid,
        step: &Step,
        prompt: &Prompt,
        caller_variables: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>> {
        let mut scope = HashMap::new();

        for decl in &prompt.variable_spec {
            if let Some(default) = &decl.default {
                scope.insert(decl.name.clone(), default.clone());
            }
        }

        for (key, value) in &step.variables {
            scope.insert(key.clone(), value.clone());
        }

        let ref_override = self
            .reference_index
            .in_edges(prompt.id)
            .await?
            .into_iter()
            .find(|edge| {
                matches!(&edge.source, prompthub_core::model::RefSource::SceneStep { scene_id: sid, step_id }
                    if *sid == scene_id && step_id == &step.step_id)
            })
            .and_then(|edge| edge.override_config);
        if let Some(overrides) = ref_override {
            for (key, value) in overrides {
                scope.insert(key, value);
            }
        }

        for (key, value) in caller_variables {
            scope.insert(key.clone(), value.clone());
        }

        Ok(scope)
    }
}

fn score_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{!score=([-+]?[0-9]*\.?[0-9]+)\}\}").unwrap())
}

fn extract_score(rendered: &str) -> Option<f64> {
    score_pattern().captures(rendered).and_then(|c| c[1].parse().ok())
}

fn strip_score(rendered: &str) -> String {
    score_pattern().replace_all(rendered, "").into_owned()
}

/// Merges non-skipped step outputs per `merge_strategy` ( step 5).
/// Returns the final content plus an optional warning (only ever populated by
/// `select_best`'s unscored fallback).
fn merge(steps: &[StepResult], strategy: MergeStrategy, separator: &str) -> (String, Option<String>) {
    let rendered: Vec<&StepResult> = steps.iter().filter(|s| !s.skipped).collect();

    match strategy {
        MergeStrategy::Concat => {
            let joined = rendered
                .iter()
                .filter_map(|s| s.rendered_content.as_deref())
                .collect::<Vec<_>>()
                .join(separator);
            (joined, None)
        }
        MergeStrategy::Chain => {
            let content = rendered
                .last()
                .and_then(|s| s.rendered_content.clone())
                .unwrap_or_default();
            (content, None)
        }
        MergeStrategy::SelectBest => {
            let scored = rendered.iter().filter(|s| s.score.is_some()).max_by(|a, b| {
                a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal)
            });
            match scored {
                Some(best) => (
                    strip_score(best.rendered_content.as_deref().unwrap_or_default()),
                    None,
                ),
                None => {
                    let fallback = rendered.last().and_then(|s| s.rendered_content.clone()).unwrap_or_default();
                    (
                        fallback,
                        Some("select_best: no step emitted a score, falling back to last step".to_string()),
                    )
                }
            }
        }
    }
}

/// Builds the `CallLog` for a completed resolve. Failures are
/// only logged when `PromptHubError::is_expected_business_error` is true;
/// callers check that before calling this.
pub fn build_call_log(
    scene_id: Option<Uuid>,
    prompt_id: Option<Uuid>,
    resolved_version: Option<String>,
    caller: &CallerIdentity,
    input_variables: Value,
    rendered_content: String,
    token_estimate: usize,
    elapsed_ms: u64,
) -> CallLog {
    CallLog {
        id: Uuid::new_v4(),
        prompt_id,
        scene_id,
        resolved_version,
        caller_id: caller.caller_id.clone(),
        caller_project_id: caller.project_id,
        input_variables,
        rendered_content,
        token_estimate,
        elapsed_ms,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompthub_core::model::{
        Condition, ConditionOp, PromptFormat, PromptRefSpec, TemplateEngine, VariableDecl,
        VariableType,
    };
    use prompthub_storage::{InMemoryPromptStore, InMemoryReferenceIndex, NewPrompt};
    use std::sync::Arc;
    use std::time::Duration;

    async fn seed_prompt(store: &InMemoryPromptStore, project_id: Uuid, slug: &str, content: &str) -> Prompt {
        store
            .create(NewPrompt {
                project_id,
                slug: slug.to_string(),
                name: slug.to_string(),
                description: None,
                format: PromptFormat::Text,
                template_engine: TemplateEngine::EngineA,
                variable_spec: vec![VariableDecl {
                    name: "name".into(),
                    var_type: VariableType::String,
                    required: false,
                    default: Some(Value::String("world".into())),
                    enum_values: None,
                }],
                tags: vec![],
                category: None,
                initial_content: content.to_string(),
            })
            .await
            .unwrap()
    }

    fn scene(project_id: Uuid, pipeline: Vec<Step>, strategy: MergeStrategy) -> Scene {
        Scene {
            id: Uuid::new_v4(),
            project_id,
            slug: "s".into(),
            pipeline,
            merge_strategy: strategy,
            separator: "\n".into(),
            output_format: PromptFormat::Text,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn step(id: &str, prompt_id: Uuid, variables: HashMap<String, Value>, condition: Option<Condition>) -> Step {
        Step {
            step_id: id.into(),
            prompt_ref: PromptRefSpec { prompt_id, version: VersionSelector::Latest },
            variables,
            condition,
        }
    }

    #[tokio::test]
    async fn single_step_concat() {
        let prompt_store = Arc::new(InMemoryPromptStore::new());
        let reference_index = Arc::new(InMemoryReferenceIndex::new());
        let project_id = Uuid::new_v4();
        let prompt = seed_prompt(&prompt_store, project_id, "greet", "Hello, {{ name }}!").await;

        let scene = scene(project_id, vec![step("s", prompt.id, HashMap::new(), None)], MergeStrategy::Concat);
        let engine = SceneEngine::new(prompt_store, reference_index);
        let caller = CallerIdentity { caller_id: "t".into(), project_id };
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), Value::String("Ada".into()));

        let (result, _) = engine
            .resolve(&scene, &vars, &caller, Instant::now() + Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.final_content, "Hello, Ada!");
        assert_eq!(result.steps.len(), 1);
        assert!(!result.steps[0].skipped);
    }

    #[tokio::test]
    async fn condition_false_skips_step() {
        let prompt_store = Arc::new(InMemoryPromptStore::new());
        let reference_index = Arc::new(InMemoryReferenceIndex::new());
        let project_id = Uuid::new_v4();
        let prompt = seed_prompt(&prompt_store, project_id, "greet", "Hello, {{ name }}!").await;

        let cond = Condition { variable: "tier".into(), operator: ConditionOp::Eq, value: Some(Value::String("gold".into())) };
        let scene = scene(project_id, vec![step("s", prompt.id, HashMap::new(), Some(cond))], MergeStrategy::Concat);
        let engine = SceneEngine::new(prompt_store, reference_index);
        let caller = CallerIdentity { caller_id: "t".into(), project_id };
        let mut vars = HashMap::new();
        vars.insert("tier".to_string(), Value::String("silver".into()));

        let (result, _) = engine
            .resolve(&scene, &vars, &caller, Instant::now() + Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.final_content, "");
        assert!(result.steps[0].skipped);
        assert_eq!(result.steps[0].skip_reason.as_deref(), Some("condition false"));
    }

    #[tokio::test]
    async fn chain_merge_threads_prior_output() {
        let prompt_store = Arc::new(InMemoryPromptStore::new());
        let reference_index = Arc::new(InMemoryReferenceIndex::new());
        let project_id = Uuid::new_v4();
        let a = seed_prompt(&prompt_store, project_id, "a", "raw: {{ text }}").await;
        let b = prompt_store
            .create(NewPrompt {
                project_id,
                slug: "b".into(),
                name: "b".into(),
                description: None,
                format: PromptFormat::Text,
                template_engine: TemplateEngine::EngineA,
                variable_spec: vec![],
                tags: vec![],
                category: None,
                initial_content: "upper: {{ prior_output }}".into(),
            })
            .await
            .unwrap();

        let scene = scene(
            project_id,
            vec![
                step("A", a.id, HashMap::new(), None),
                step("B", b.id, HashMap::new(), None),
            ],
            MergeStrategy::Chain,
        );
        let engine = SceneEngine::new(prompt_store, reference_index);
        let caller = CallerIdentity { caller_id: "t".into(), project_id };
        let mut vars = HashMap::new();
        vars.insert("text".to_string(), Value::String("hi".into()));

        let (result, _) = engine
            .resolve(&scene, &vars, &caller, Instant::now() + Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.final_content, "upper: raw: hi");
    }

    #[tokio::test]
    async fn precedence_caller_wins_over_everything() {
        let prompt_store = Arc::new(InMemoryPromptStore::new());
        let reference_index = Arc::new(InMemoryReferenceIndex::new());
        let project_id = Uuid::new_v4();
        let prompt = prompt_store
            .create(NewPrompt {
                project_id,
                slug: "style".into(),
                name: "style".into(),
                description: None,
                format: PromptFormat::Text,
                template_engine: TemplateEngine::EngineA,
                variable_spec: vec![VariableDecl {
                    name: "style".into(),
                    var_type: VariableType::String,
                    required: false,
                    default: Some(Value::String("plain".into())),
                    enum_values: None,
                }],
                tags: vec![],
                category: None,
                initial_content: "{{ style }}".into(),
            })
            .await
            .unwrap();

        let mut step_vars = HashMap::new();
        step_vars.insert("style".to_string(), Value::String("serif".into()));
        let scene = scene(project_id, vec![step("s", prompt.id, step_vars, None)], MergeStrategy::Concat);
        let engine = SceneEngine::new(prompt_store, reference_index);
        let caller = CallerIdentity { caller_id: "t".into(), project_id };
        let mut vars = HashMap::new();
        vars.insert("style".to_string(), Value::String("bold".into()));

        let (result, _) = engine
            .resolve(&scene, &vars, &caller, Instant::now() + Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.final_content, "bold");
    }

    #[tokio::test]
    async fn deadline_exceeded_aborts() {
        let prompt_store = Arc::new(InMemoryPromptStore::new());
        let reference_index = Arc::new(InMemoryReferenceIndex::new());
        let project_id = Uuid::new_v4();
        let prompt = seed_prompt(&prompt_store, project_id, "greet", "Hello, {{ name }}!").await;
        let scene = scene(project_id, vec![step("s", prompt.id, HashMap::new(), None)], MergeStrategy::Concat);
        let engine = SceneEngine::new(prompt_store, reference_index);
        let caller = CallerIdentity { caller_id: "t".into(), project_id };

        let err = engine
            .resolve(&scene, &HashMap::new(), &caller, Instant::now() - Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 50000);
    }
}
