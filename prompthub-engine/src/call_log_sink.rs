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

//! Call Log Sink: a bounded ring buffer feeding a background
//! drain task so logging a call never blocks the request that produced it.
//! Overflow policy is drop-oldest: under sustained overload we prefer losing
//! old telemetry to blocking new calls or growing without bound.

use prompthub_core::model::CallLog;
use prompthub_storage::CallLogStore;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Handle callers use to enqueue a `CallLog`. Cloning is cheap (it's just a
/// few `Arc`s).
#[derive(Clone)]
pub struct CallLogSink {
    queue: Arc<Mutex<VecDeque<CallLog>>>,
    capacity: usize,
    notify: Arc<Notify>,
    dropped: Arc<AtomicU64>,
}

impl CallLogSink {
    /// Spawns the background drain task and returns a sink handle. `capacity`
    /// bounds the ring buffer; once full, `record` evicts the oldest queued
    /// entry to make room rather than blocking the caller or growing without
    /// bound.
    pub fn spawn(store: Arc<dyn CallLogStore>, capacity: usize) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let notify = Arc::new(Notify::new());
        let dropped = Arc::new(AtomicU64::new(0));

        let task_queue = queue.clone();
        let task_notify = notify.clone();
        tokio::spawn(async move {
            loop {
                let next = task_queue.lock().pop_front();
                match next {
                    Some(log) => {
                        if let Err(err) = store.append(log).await {
                            tracing::warn!(error = %err, "failed to persist call log");
                        }
                    }
                    None => task_notify.notified().await,
                }
            }
        });

        Self { queue, capacity, notify, dropped }
    }

    /// Enqueues `log`. Never blocks: once the ring buffer is at capacity, the
    /// oldest queued record is evicted to make room and the drop counter
    /// increments.
    pub fn record(&self, log: CallLog) {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                queue.pop_front();
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(total_dropped = total, "call log dropped, sink at capacity");
            }
            queue.push_back(log);
        }
        self.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prompthub_storage::InMemoryCallLogStore;
    use uuid::Uuid;

    fn log() -> CallLog {
        CallLog {
            id: Uuid::new_v4(),
            prompt_id: Some(Uuid::new_v4()),
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
    async fn recorded_logs_reach_the_store() {
        let store: Arc<dyn CallLogStore> = Arc::new(InMemoryCallLogStore::new(10));
        let sink = CallLogSink::spawn(store.clone(), 4);
        let prompt_id = log().prompt_id.unwrap();
        let mut entry = log();
        entry.prompt_id = Some(prompt_id);
        sink.record(entry);

        // give the background task a chance to drain
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let stored = store.list_for_prompt(prompt_id, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn overflow_drops_instead_of_blocking() {
        let store: Arc<dyn CallLogStore> = Arc::new(InMemoryCallLogStore::new(100));
        // capacity 1 channel, no consumer running yet (spawned but likely
        // backed up) exercises try_send failing under load.
        let sink = CallLogSink::spawn(store, 1);
        for _ in 0..50 {
            sink.record(log());
        }
        // Not a strict assertion on the exact drop count (timing-dependent),
        // just that recording never panics or blocks the test.
        let _ = sink.dropped_count();
    }
}
