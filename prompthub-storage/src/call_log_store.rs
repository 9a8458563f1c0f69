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

//! Durable side of the Call Log Sink. The sink itself (bounded
//! channel, background drain, drop-oldest overflow) lives in
//! `prompthub-engine`; this crate only owns where drained records land.

use async_trait::async_trait;
use parking_lot::RwLock;
use prompthub_core::model::CallLog;
use prompthub_core::Result;
use uuid::Uuid;

#[async_trait]
pub trait CallLogStore: Send + Sync {
    async fn append(&self, log: CallLog) -> Result<()>;
    async fn list_for_prompt(&self, prompt_id: Uuid, limit: usize) -> Result<Vec<CallLog>>;
    async fn list_for_scene(&self, scene_id: Uuid, limit: usize) -> Result<Vec<CallLog>>;
}

/// Bounded ring of the most recent records, grounded on the same
/// write-lock-protected `Vec` texture used throughout this crate. A
/// production deployment swaps this for an append-only table; the trait
/// boundary is what matters to the engine.
pub struct InMemoryCallLogStore {
    logs: RwLock<Vec<CallLog>>,
    capacity: usize,
}

impl InMemoryCallLogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            logs: RwLock::new(Vec::new()),
            capacity,
        }
    }
}

impl Default for InMemoryCallLogStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CallLogStore for InMemoryCallLogStore {
    async fn append(&self, log: CallLog) -> Result<()> {
        let mut logs = self.logs.write();
        logs.push(log);
        if logs.len() > self.capacity {
            let overflow = logs.len() - self.capacity;
            logs.drain(0..overflow);
        }
        Ok(())
    }

    async fn list_for_prompt(&self, prompt_id: Uuid, limit: usize) -> Result<Vec<CallLog>> {
        Ok(self
            .logs
            .read()
            .iter()
            .rev()
            .filter(|l| l.prompt_id == Some(prompt_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_for_scene(&self, scene_id: Uuid, limit: usize) -> Result<Vec<CallLog>> {
        Ok(self
            .logs
            .read()
            .iter()
            .rev()
            .filter(|l| l.scene_id == Some(scene_id))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log(prompt_id: Uuid) -> CallLog {
        CallLog {
            id: Uuid::new_v4(),
            prompt_id: Some(prompt_id),
            scene_id: None,
            resolved_version: Some("0.1.0".into()),
            caller_id: "tester".into(),
            caller_project_id: Uuid::new_v4(),
            input_variables: serde_json::json!({}),
            rendered_content: "hi".into(),
            token_estimate: 1,
            elapsed_ms: 1,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ring_drops_oldest_past_capacity() {
        let store = InMemoryCallLogStore::new(2);
        let prompt_id = Uuid::new_v4();
        for _ in 0..5 {
            store.append(log(prompt_id)).await.unwrap();
        }
        assert_eq!(store.list_for_prompt(prompt_id, 10).await.unwrap().len(), 2);
    }
}
