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

//! Resolve Cache: caches a scene's fully-rendered output keyed
//! on `(scene_id, variables, caller_project_id, plan_version_tuple)`, with a
//! TTL and single-flight de-duplication of concurrent identical requests.

use moka::sync::Cache;
use parking_lot::Mutex;
use prompthub_core::fingerprint::{canonicalize, sha256_hex};
use semver::Version;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

/// The cache stores a scene's full resolve result, not just the joined text:
/// callers (the API surface) still need per-step detail and warnings even on
/// a cache hit, and the result is cheap to clone.
pub type CacheEntry = crate::scene_engine::SceneResolveResult;

/// Inputs hashed into the cache key. `plan_version_tuple` must already be in
/// a stable, deterministic order (the resolver guarantees this).
pub struct CacheKeyInput<'a> {
    pub scene_id: Uuid,
    pub variables: &'a serde_json::Value,
    pub caller_project_id: Uuid,
    pub plan_version_tuple: &'a [(Uuid, Version)],
}

fn fingerprint(input: &CacheKeyInput<'_>) -> String {
    let plan_version_json: Vec<serde_json::Value> = input
        .plan_version_tuple
        .iter()
        .map(|(id, v)| serde_json::json!({"prompt_id": id.to_string(), "version": v.to_string()}))
        .collect();

    let envelope = serde_json::json!({
        "scene_id": input.scene_id.to_string(),
        "variables": input.variables,
        "caller_project_id": input.caller_project_id.to_string(),
        "plan_version_tuple": plan_version_json,
    });

    sha256_hex(&canonicalize(&envelope))
}

/// Moka-backed TTL cache plus a sharded single-flight map so concurrent
/// identical requests render once, not N times.
pub struct ResolveCache {
    cache: Cache<String, CacheEntry>,
    // `tokio::sync::Mutex`, not `parking_lot`: its guard is held across the
    // `compute().await` below and must stay `Send` for multi-threaded tasks.
    in_flight: Arc<dashmap::DashMap<String, Arc<AsyncMutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Observability snapshot (cache hit/miss rate exposed for
/// operators). Cheap to compute; no lock held across the snapshot.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
}

impl ResolveCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).time_to_live(ttl).build(),
            in_flight: Arc::new(dashmap::DashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, input: &CacheKeyInput<'_>) -> Option<CacheEntry> {
        let hit = self.cache.get(&fingerprint(input));
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.entry_count(),
        }
    }

    /// Runs `compute` for a given key with single-flight semantics: the first
    /// caller for a fingerprint actually computes and populates the cache;
    /// concurrent callers for the same fingerprint block on that computation
    /// instead of racing to recompute it.
    pub async fn get_or_compute<F, Fut>(&self, input: CacheKeyInput<'_>, compute: F) -> prompthub_core::Result<CacheEntry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = prompthub_core::Result<CacheEntry>>,
    {
        let key = fingerprint(&input);

        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check: the in-flight leader may have populated the cache while we
        // were waiting on the lock above.
        if let Some(hit) = self.cache.get(&key) {
            self.in_flight.remove(&key);
            return Ok(hit);
        }

        let result = compute().await;
        if let Ok(entry) = &result {
            self.cache.insert(key.clone(), entry.clone());
        }
        self.in_flight.remove(&key);
        result
    }

    /// Invalidates every cached entry whose plan-version tuple references
    /// `prompt_id` ("a prompt write invalidates cache entries
    /// whose plan-version tuple contains that prompt id"). Since moka has no
    /// indexed lookup by arbitrary predicate, invalidation is tracked
    /// separately by the caller via `invalidate_key`; this helper exists for
    /// callers that keep their own `prompt_id -> fingerprints` side index.
    pub fn invalidate_key(&self, key: &str) {
        self.cache.invalidate(key);
    }

    pub fn fingerprint_of(&self, input: &CacheKeyInput<'_>) -> String {
        fingerprint(input)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// Tracks which cache fingerprints a given prompt id or scene id participated
/// in, so a write can invalidate exactly the affected entries without
/// scanning the whole cache ("on a prompt write, remove entries
/// whose plan-version tuple contains that prompt_id; on a scene write, remove
/// entries with that scene_id").
#[derive(Default)]
pub struct InvalidationIndex {
    by_prompt: Mutex<HashMap<Uuid, Vec<String>>>,
    by_scene: Mutex<HashMap<Uuid, Vec<String>>>,
}

impl InvalidationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, fingerprint: &str, scene_id: Uuid, plan_version_tuple: &[(Uuid, Version)]) {
        let mut by_prompt = self.by_prompt.lock();
        for (prompt_id, _) in plan_version_tuple {
            by_prompt.entry(*prompt_id).or_default().push(fingerprint.to_string());
        }
        self.by_scene.lock().entry(scene_id).or_default().push(fingerprint.to_string());
    }

    pub fn take_fingerprints_for_prompt(&self, prompt_id: Uuid) -> Vec<String> {
        self.by_prompt.lock().remove(&prompt_id).unwrap_or_default()
    }

    pub fn take_fingerprints_for_scene(&self, scene_id: Uuid) -> Vec<String> {
        self.by_scene.lock().remove(&scene_id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fingerprint_is_stable_for_equal_inputs() {
        let scene_id = Uuid::new_v4();
        let caller_project_id = Uuid::new_v4();
        let vars = serde_json::json!({"name": "Ada"});
        let tuple = vec![(Uuid::new_v4(), Version::new(1, 0, 0))];

        let a = CacheKeyInput {
            scene_id,
            variables: &vars,
            caller_project_id,
            plan_version_tuple: &tuple,
        };
        let b = CacheKeyInput {
            scene_id,
            variables: &vars,
            caller_project_id,
            plan_version_tuple: &tuple,
        };
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_changes_with_plan_version() {
        let scene_id = Uuid::new_v4();
        let caller_project_id = Uuid::new_v4();
        let vars = serde_json::json!({"name": "Ada"});
        let prompt_id = Uuid::new_v4();
        let tuple_a = vec![(prompt_id, Version::new(1, 0, 0))];
        let tuple_b = vec![(prompt_id, Version::new(1, 1, 0))];

        let a = CacheKeyInput { scene_id, variables: &vars, caller_project_id, plan_version_tuple: &tuple_a };
        let b = CacheKeyInput { scene_id, variables: &vars, caller_project_id, plan_version_tuple: &tuple_b };
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[tokio::test]
    async fn concurrent_identical_requests_compute_once() {
        let cache = Arc::new(ResolveCache::new(100, Duration::from_secs(60)));
        let scene_id = Uuid::new_v4();
        let caller_project_id = Uuid::new_v4();
        let tuple = vec![(Uuid::new_v4(), Version::new(1, 0, 0))];
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let tuple = tuple.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                let vars = serde_json::json!({"name": "Ada"});
                let input = CacheKeyInput {
                    scene_id,
                    variables: &vars,
                    caller_project_id,
                    plan_version_tuple: &tuple,
                };
                cache
                    .get_or_compute(input, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(CacheEntry {
                            final_content: "x".into(),
                            steps: vec![],
                            total_token_estimate: 1,
                            warnings: vec![],
                        })
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
