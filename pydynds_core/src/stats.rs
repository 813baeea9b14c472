//! Algorithm statistics owned by a single worker.
//!
//! All mutation happens under one lock; readers only ever get a full copy,
//! so nobody observes a half-applied update or aliases internal storage.

use crate::ids::IdGenerator;

use pydynds_env::{Computation, Message, NodeId, StatsSnapshot};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// Mutex-guarded stats with copy-out reads.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    stats: Mutex<StatsSnapshot>,
    message_ids: IdGenerator,
    computation_ids: IdGenerator,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a message and returns it. Never fails.
    pub fn record_message(
        &self,
        source: NodeId,
        destination: NodeId,
        start_cycle: u64,
        payload: Value,
    ) -> Message {
        let mut stats = self.lock();
        // Ids are drawn under the lock so they follow append order.
        let message = Message::new(
            self.message_ids.next_id(),
            source,
            destination,
            start_cycle,
            payload,
        );
        stats.total_messages += 1;
        stats.last_message = Some(message.clone());
        stats.unread_messages.push(message.clone());
        message
    }

    /// Records a computation and returns it.
    pub fn record_computation(&self, node: NodeId, start_cycle: u64, payload: Value) -> Computation {
        let mut stats = self.lock();
        let computation = Computation::new(self.computation_ids.next_id(), node, start_cycle, payload);
        stats.total_computations += 1;
        stats.last_computation = Some(computation.clone());
        stats.unread_computations.push(computation.clone());
        computation
    }

    /// Returns an independent copy of the current stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock().clone()
    }

    pub fn total_messages(&self) -> u64 {
        self.lock().total_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequential_messages_in_call_order() {
        let recorder = StatsRecorder::new();
        for i in 0..5u64 {
            recorder.record_message("v1".into(), "v2".into(), i, json!(i));
        }

        let stats = recorder.snapshot();
        assert_eq!(stats.total_messages, 5);
        assert_eq!(stats.unread_messages.len(), 5);
        assert_eq!(stats.last_message.as_ref().map(|m| m.payload()), Some(&json!(4)));
        let order: Vec<u64> = stats.unread_messages.iter().map(|m| m.id()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let recorder = StatsRecorder::new();
        recorder.record_message("a".into(), "b".into(), 0, json!(null));

        let mut copy = recorder.snapshot();
        copy.unread_messages.clear();
        copy.total_messages = 99;

        let fresh = recorder.snapshot();
        assert_eq!(fresh.total_messages, 1);
        assert_eq!(fresh.unread_messages.len(), 1);
    }

    #[test]
    fn test_computations_tracked_separately() {
        let recorder = StatsRecorder::new();
        recorder.record_computation("v1".into(), 2, json!("local"));

        let stats = recorder.snapshot();
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.total_computations, 1);
        assert_eq!(stats.last_computation.map(|c| c.start_cycle()), Some(2));
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots() {
        let recorder = Arc::new(StatsRecorder::new());

        let writer = {
            let recorder = Arc::clone(&recorder);
            thread::spawn(move || {
                for i in 0..2_000u64 {
                    recorder.record_message("v1".into(), "v2".into(), i, json!(i));
                }
            })
        };

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let stats = recorder.snapshot();
                        assert_eq!(stats.total_messages as usize, stats.unread_messages.len());
                        assert_eq!(stats.total_messages == 0, stats.last_message.is_none());
                        assert_eq!(stats.last_message.as_ref(), stats.unread_messages.last());
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(recorder.total_messages(), 2_000);
    }
}
