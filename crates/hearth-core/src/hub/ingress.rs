//! Bounded, drop-oldest ingress queue (§4.8). `tokio::sync::mpsc` has no
//! drop-oldest-on-full mode, so the hub uses this small ring instead.

use crate::types::HubEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// A bounded queue that drops the oldest entry rather than blocking or
/// rejecting the newest one when full.
pub struct IngressQueue {
    capacity: usize,
    queue: Mutex<VecDeque<HubEvent>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl IngressQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push an event, dropping the oldest queued event if at capacity.
    /// Returns `true` if a drop occurred.
    pub fn push(&self, event: HubEvent) -> bool {
        let mut queue = self.queue.lock().unwrap();
        let dropped = if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        };
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
        dropped
    }

    /// Wait for at least one queued event, then drain everything currently
    /// buffered in one pass (batching naturally coalesces this way).
    pub async fn recv_batch(&self) -> Vec<HubEvent> {
        loop {
            {
                let mut queue = self.queue.lock().unwrap();
                if !queue.is_empty() {
                    return queue.drain(..).collect();
                }
            }
            self.notify.notified().await;
        }
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityRemovedEvent, UnifiedId};
    use chrono::Utc;

    fn sample(id: &str) -> HubEvent {
        HubEvent::EntityRemoved(EntityRemovedEvent {
            entity_id: UnifiedId::new("homeassistant", id).unwrap(),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn drops_oldest_when_full() {
        let queue = IngressQueue::new(2);
        assert!(!queue.push(sample("a")));
        assert!(!queue.push(sample("b")));
        assert!(queue.push(sample("c")));
        assert_eq!(queue.dropped_count(), 1);
    }

    #[tokio::test]
    async fn recv_batch_drains_everything_queued() {
        let queue = IngressQueue::new(10);
        queue.push(sample("a"));
        queue.push(sample("b"));
        let batch = queue.recv_batch().await;
        assert_eq!(batch.len(), 2);
    }
}
