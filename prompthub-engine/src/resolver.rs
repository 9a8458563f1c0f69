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

//! Dependency Resolver: expands a scene's pipeline into a flat,
//! cycle-free execution order. A scene's pipeline is already an explicit,
//! ordered list of steps; the resolver's job is to additionally pull in each
//! step's *transitive* upstream refs (a referenced prompt that itself
//! declares further refs via the Reference Index) and schedule everything in
//! a stable dependency-respecting order.

use prompthub_core::model::Scene;
use prompthub_core::{PromptHubError, Result};
use prompthub_storage::ReferenceIndex;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Identifies one node in the resolved execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NodeId {
    /// A pipeline step, addressed by its `step_id`.
    Step(String),
    /// A transitively-discovered upstream dependency, addressed by prompt id.
    Dependency(Uuid),
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedNode {
    pub id: NodeId,
    pub prompt_id: Uuid,
    /// Position in `scene.pipeline`, for step nodes only. Used purely as a
    /// stable tie-breaker; rendering order is `scene.pipeline`'s own order,
    /// not this resolver's topological order.
    pub step_index: Option<usize>,
}

/// The resolver's output: transitive dependency nodes followed by the
/// pipeline's own step nodes, in an order where every node's upstream refs
/// precede it.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlan {
    pub nodes: Vec<ResolvedNode>,
}

impl ResolvedPlan {
    /// The plan-version tuple fed into the Resolve Cache fingerprint: every
    /// prompt id and its resolved version, in plan order, so two calls that
    /// land on different dependency versions never collide.
    pub fn version_tuple(&self, versions: &HashMap<Uuid, semver::Version>) -> Vec<(Uuid, semver::Version)> {
        self.nodes
            .iter()
            .filter_map(|n| versions.get(&n.prompt_id).map(|v| (n.prompt_id, v.clone())))
            .collect()
    }
}

/// Walks the scene's pipeline plus each target prompt's transitive upstream
/// refs (via `index.out_edges`), detects cycles with a DFS visiting-set, and
/// returns a stable topological order (Kahn's algorithm, ties broken by step
/// index then prompt id).
pub async fn resolve_plan(scene: &Scene, index: &dyn ReferenceIndex) -> Result<ResolvedPlan> {
    let mut nodes: HashMap<NodeId, ResolvedNode> = HashMap::new();
    let mut edges: HashMap<NodeId, Vec<NodeId>> = HashMap::new(); // dependency -> dependents

    for (idx, step) in scene.pipeline.iter().enumerate() {
        let step_node = NodeId::Step(step.step_id.clone());
        nodes.insert(
            step_node.clone(),
            ResolvedNode {
                id: step_node.clone(),
                prompt_id: step.prompt_ref.prompt_id,
                step_index: Some(idx),
            },
        );
        edges.entry(step_node.clone()).or_default();

        expand_dependencies(step.prompt_ref.prompt_id, step_node, index, &mut nodes, &mut edges).await?;
    }

    topological_sort(nodes, edges)
}

/// One unexpanded frame of the dependency walk: the prompt whose upstream
/// refs are being pulled in, the node that should end up depending on them,
/// and the (already-fetched) edges still to process.
struct Frame {
    dependent: NodeId,
    children: std::vec::IntoIter<Uuid>,
}

/// Iteratively pulls in `start`'s upstream refs, and those refs' own upstream
/// refs, wiring each discovered dependency so it precedes its dependent.
/// Written as an explicit stack (rather than recursive `async fn`, which
/// can't recurse without heap-boxing its own future) with `path` tracking the
/// current walk so a prompt id reappearing on it is reported as a cycle.
async fn expand_dependencies(
    start: Uuid,
    start_dependent: NodeId,
    index: &dyn ReferenceIndex,
    nodes: &mut HashMap<NodeId, ResolvedNode>,
    edges: &mut HashMap<NodeId, Vec<NodeId>>,
) -> Result<()> {
    let mut path = vec![start];
    let first_children: Vec<Uuid> = index.out_edges(start).await?.into_iter().map(|e| e.target).collect();
    let mut stack = vec![Frame {
        dependent: start_dependent,
        children: first_children.into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        match frame.children.next() {
            Some(upstream_id) => {
                if path.contains(&upstream_id) {
                    let mut cycle_path: Vec<String> = path.iter().map(|id| id.to_string()).collect();
                    cycle_path.push(upstream_id.to_string());
                    return Err(PromptHubError::CircularDependency { path: cycle_path });
                }

                let dependent = frame.dependent.clone();
                let dep_node = NodeId::Dependency(upstream_id);
                nodes.entry(dep_node.clone()).or_insert_with(|| ResolvedNode {
                    id: dep_node.clone(),
                    prompt_id: upstream_id,
                    step_index: None,
                });
                edges.entry(dep_node.clone()).or_default();
                edges.entry(dep_node.clone()).or_default().push(dependent);

                path.push(upstream_id);
                let children: Vec<Uuid> = index
                    .out_edges(upstream_id)
                    .await?
                    .into_iter()
                    .map(|e| e.target)
                    .collect();
                stack.push(Frame {
                    dependent: dep_node,
                    children: children.into_iter(),
                });
            }
            None => {
                path.pop();
                stack.pop();
            }
        }
    }
    Ok(())
}

fn topological_sort(
    nodes: HashMap<NodeId, ResolvedNode>,
    edges: HashMap<NodeId, Vec<NodeId>>,
) -> Result<ResolvedPlan> {
    let mut in_degree: HashMap<NodeId, usize> = nodes.keys().map(|k| (k.clone(), 0)).collect();
    for dependents in edges.values() {
        for dependent in dependents {
            *in_degree.entry(dependent.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: Vec<NodeId> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| id.clone())
        .collect();
    sort_ready(&mut ready, &nodes);

    let mut queue: VecDeque<NodeId> = ready.into();
    let mut ordered = Vec::with_capacity(nodes.len());
    let mut seen = HashSet::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        ordered.push(nodes[&current].clone());

        let mut newly_ready = Vec::new();
        if let Some(dependents) = edges.get(&current) {
            for dependent in dependents {
                let deg = in_degree.get_mut(dependent).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    newly_ready.push(dependent.clone());
                }
            }
        }
        sort_ready(&mut newly_ready, &nodes);
        for id in newly_ready {
            queue.push_back(id);
        }
    }

    if ordered.len() != nodes.len() {
        // Every genuine cycle is caught during DFS expansion above; reaching
        // here would mean a bug in the edge bookkeeping, not a user-facing
        // circular-dependency case.
        return Err(PromptHubError::Internal(
            "topological sort did not cover every node".to_string(),
        ));
    }

    Ok(ResolvedPlan { nodes: ordered })
}

/// Stable tie-break: step nodes by pipeline index, dependency nodes by prompt
/// id, with step nodes ordered ahead of dependency nodes at equal readiness
/// (deterministic for the Resolve Cache fingerprint).
fn sort_ready(ready: &mut [NodeId], nodes: &HashMap<NodeId, ResolvedNode>) {
    ready.sort_by(|a, b| {
        let na = &nodes[a];
        let nb = &nodes[b];
        match (na.step_index, nb.step_index) {
            (Some(ia), Some(ib)) => ia.cmp(&ib),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => na.prompt_id.cmp(&nb.prompt_id),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompthub_core::model::{
        MergeStrategy, PromptFormat, PromptRef, PromptRefSpec, RefSource, RefType, Step,
        VersionSelector,
    };
    use prompthub_storage::InMemoryReferenceIndex;
    use std::collections::HashMap as Map;

    fn scene_with_steps(steps: Vec<Step>) -> Scene {
        Scene {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            slug: "s".into(),
            pipeline: steps,
            merge_strategy: MergeStrategy::Concat,
            separator: "\n".into(),
            output_format: PromptFormat::Text,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: None,
        }
    }

    fn step(id: &str, prompt_id: Uuid) -> Step {
        Step {
            step_id: id.into(),
            prompt_ref: PromptRefSpec {
                prompt_id,
                version: VersionSelector::Latest,
            },
            variables: Map::new(),
            condition: None,
        }
    }

    #[tokio::test]
    async fn flat_pipeline_preserves_step_order() {
        let index = InMemoryReferenceIndex::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let scene = scene_with_steps(vec![step("s1", a), step("s2", b)]);

        let plan = resolve_plan(&scene, &index).await.unwrap();
        assert_eq!(plan.nodes.len(), 2);
        assert_eq!(plan.nodes[0].id, NodeId::Step("s1".into()));
        assert_eq!(plan.nodes[1].id, NodeId::Step("s2".into()));
    }

    #[tokio::test]
    async fn transitive_dependency_precedes_its_step() {
        let index = InMemoryReferenceIndex::new();
        let a = Uuid::new_v4();
        let upstream = Uuid::new_v4();
        index
            .replace_scene_edges(
                Uuid::nil(),
                vec![PromptRef {
                    source: RefSource::Prompt(a),
                    target: upstream,
                    ref_type: RefType::Extends,
                    override_config: None,
                    pinned_version: None,
                }],
            )
            .await
            .unwrap();

        let scene = scene_with_steps(vec![step("s1", a)]);
        let plan = resolve_plan(&scene, &index).await.unwrap();

        let upstream_pos = plan.nodes.iter().position(|n| n.prompt_id == upstream).unwrap();
        let step_pos = plan.nodes.iter().position(|n| n.id == NodeId::Step("s1".into())).unwrap();
        assert!(upstream_pos < step_pos);
    }

    #[tokio::test]
    async fn cycle_is_detected() {
        let index = InMemoryReferenceIndex::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        index
            .replace_scene_edges(
                Uuid::nil(),
                vec![
                    PromptRef {
                        source: RefSource::Prompt(a),
                        target: b,
                        ref_type: RefType::Extends,
                        override_config: None,
                        pinned_version: None,
                    },
                    PromptRef {
                        source: RefSource::Prompt(b),
                        target: a,
                        ref_type: RefType::Extends,
                        override_config: None,
                        pinned_version: None,
                    },
                ],
            )
            .await
            .unwrap();

        let scene = scene_with_steps(vec![step("s1", a)]);
        let err = resolve_plan(&scene, &index).await.unwrap_err();
        assert_eq!(err.code(), 40901);
    }
}
