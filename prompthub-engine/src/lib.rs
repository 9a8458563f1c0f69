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

//! The orchestration core: Dependency Resolver, Scene Engine, Resolve Cache,
//! and Call Log Sink wired together behind one entry point the API surface
//! calls into.

pub mod call_log_sink;
pub mod condition;
pub mod resolve_cache;
pub mod resolver;
pub mod scene_engine;
pub mod scene_service;

pub use call_log_sink::CallLogSink;
pub use resolve_cache::{CacheEntry, CacheKeyInput, InvalidationIndex, ResolveCache};
pub use resolver::{resolve_plan, NodeId, ResolvedNode, ResolvedPlan};
pub use scene_engine::{build_call_log, SceneEngine, SceneResolveResult, StepResult};
pub use scene_service::SceneService;

use prompthub_core::model::CallerIdentity;
use prompthub_core::{estimate_tokens, Result};
use prompthub_storage::{PromptStore, ReferenceIndex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The default per-request deadline when a caller doesn't
/// specify one.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// The default Resolve Cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Ties the orchestration components together behind the two operations the
/// API surface drives: resolving a scene, and rendering a single prompt.
pub struct PromptHubEngine {
    pub prompt_store: Arc<dyn PromptStore>,
    pub reference_index: Arc<dyn ReferenceIndex>,
    pub scene_engine: SceneEngine,
    pub cache: ResolveCache,
    pub invalidation: InvalidationIndex,
    pub call_log_sink: CallLogSink,
}

impl PromptHubEngine {
    pub fn new(
        prompt_store: Arc<dyn PromptStore>,
        reference_index: Arc<dyn ReferenceIndex>,
        call_log_sink: CallLogSink,
        cache_capacity: u64,
        cache_ttl: Duration,
    ) -> Self {
        let scene_engine = SceneEngine::new(prompt_store.clone(), reference_index.clone());
        Self {
            prompt_store,
            reference_index,
            scene_engine,
            cache: ResolveCache::new(cache_capacity, cache_ttl),
            invalidation: InvalidationIndex::new(),
            call_log_sink,
        }
    }

    /// `resolve(scene_id, variables, caller)`: plans cheaply
    /// first so the cache key (which depends on the resolved plan-version
    /// tuple) can be computed before paying for a render, then lets
    /// `ResolveCache::get_or_compute` short-circuit on a hit or single-flight
    /// concurrent misses.
    pub async fn resolve_scene(
        &self,
        scene: &prompthub_core::model::Scene,
        variables: HashMap<String, Value>,
        caller: &CallerIdentity,
        deadline: Option<Duration>,
    ) -> Result<(SceneResolveResult, bool)> {
        let started = Instant::now();
        let deadline_instant = started + deadline.unwrap_or(DEFAULT_DEADLINE);

        let ctx = self.scene_engine.plan(scene).await?;
        let plan_version_tuple = ctx.plan_version_tuple();
        let variables_json = serde_json::to_value(&variables).unwrap_or(Value::Null);
        let key = CacheKeyInput {
            scene_id: scene.id,
            variables: &variables_json,
            caller_project_id: caller.project_id,
            plan_version_tuple: &plan_version_tuple,
        };
        let fingerprint = self.cache.fingerprint_of(&key);
        let already_cached = self.cache.get(&key).is_some();

        let result = self
            .cache
            .get_or_compute(key, || async {
                let (result, _) = self
                    .scene_engine
                    .execute(scene, &ctx, &variables, caller, deadline_instant)
                    .await?;
                Ok(result)
            })
            .await?;

        self.invalidation.record(&fingerprint, scene.id, &plan_version_tuple);

        let log = build_call_log(
            Some(scene.id),
            None,
            None,
            caller,
            variables_json,
            result.final_content.clone(),
            result.total_token_estimate,
            started.elapsed().as_millis() as u64,
        );
        self.call_log_sink.record(log);

        Ok((result, already_cached))
    }

    /// Renders a single prompt directly, bypassing the scene machinery
    /// entirely (used by `POST /prompts/{id}/render`).
    pub async fn render_prompt(
        &self,
        prompt_id: Uuid,
        version: Option<semver::Version>,
        variables: HashMap<String, Value>,
        caller: &CallerIdentity,
    ) -> Result<(String, usize)> {
        let started = Instant::now();
        let prompt = self.prompt_store.get(prompt_id).await?;
        let version_number = version.unwrap_or_else(|| prompt.current_version.clone());
        let version_row = self.prompt_store.get_version(prompt_id, &version_number).await?;

        let rendered = prompthub_render::render(
            prompt.template_engine,
            &version_row.content,
            &version_row.variable_spec,
            &variables,
        )?;
        let token_estimate = estimate_tokens(&rendered);

        let log = build_call_log(
            None,
            Some(prompt_id),
            Some(version_number.to_string()),
            caller,
            serde_json::to_value(&variables).unwrap_or(Value::Null),
            rendered.clone(),
            token_estimate,
            started.elapsed().as_millis() as u64,
        );
        self.call_log_sink.record(log);

        Ok((rendered, token_estimate))
    }

    /// Invalidates cache entries touched by a prompt write.
    pub fn invalidate_prompt(&self, prompt_id: Uuid) {
        for fingerprint in self.invalidation.take_fingerprints_for_prompt(prompt_id) {
            self.cache.invalidate_key(&fingerprint);
        }
    }

    /// Invalidates cache entries touched by a scene write.
    pub fn invalidate_scene(&self, scene_id: Uuid) {
        for fingerprint in self.invalidation.take_fingerprints_for_scene(scene_id) {
            self.cache.invalidate_key(&fingerprint);
        }
    }
}
