//! Hub-wide atomic counters and the forwarding-errors ring buffer (§4.8, §9).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One entry in the forwarding-errors ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardingError {
    pub subscriber_id: String,
    pub reason: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Atomic event-hub counters, safe to read concurrently without locking
/// (§9: metric reads must always be consistent).
#[derive(Debug)]
pub struct HubMetrics {
    pub events_ingested: AtomicU64,
    pub events_dropped: AtomicU64,
    pub events_rate_limited: AtomicU64,
    pub events_batched: AtomicU64,
    /// Number of batch-window flushes that forwarded at least one event,
    /// distinct from `events_batched` which counts coalesced events.
    pub batches_processed: AtomicU64,
    pub events_forwarded: AtomicU64,
    pub forwarding_errors: AtomicU64,
    /// Unix epoch millis of the most recently ingested event, 0 if none yet.
    last_event_millis: AtomicU64,
    max_retained_errors: usize,
    errors: Mutex<VecDeque<ForwardingError>>,
}

impl HubMetrics {
    #[must_use]
    pub fn new(max_retained_errors: usize) -> Self {
        Self {
            events_ingested: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_rate_limited: AtomicU64::new(0),
            events_batched: AtomicU64::new(0),
            batches_processed: AtomicU64::new(0),
            events_forwarded: AtomicU64::new(0),
            forwarding_errors: AtomicU64::new(0),
            last_event_millis: AtomicU64::new(0),
            max_retained_errors: max_retained_errors.max(1),
            errors: Mutex::new(VecDeque::new()),
        }
    }

    /// Record that an event was just ingested, for `lastEventTime` (§4.8).
    pub fn record_event_time(&self, at: chrono::DateTime<chrono::Utc>) {
        self.last_event_millis.store(at.timestamp_millis().max(0) as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn last_event_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let millis = self.last_event_millis.load(Ordering::Relaxed);
        if millis == 0 {
            return None;
        }
        chrono::DateTime::from_timestamp_millis(millis as i64)
    }

    pub fn record_error(&self, subscriber_id: &str, reason: impl Into<String>) {
        self.forwarding_errors.fetch_add(1, Ordering::Relaxed);
        let mut errors = self.errors.lock().unwrap();
        if errors.len() >= self.max_retained_errors {
            errors.pop_front();
        }
        errors.push_back(ForwardingError {
            subscriber_id: subscriber_id.to_string(),
            reason: reason.into(),
            timestamp: chrono::Utc::now(),
        });
    }

    #[must_use]
    pub fn recent_errors(&self) -> Vec<ForwardingError> {
        self.errors.lock().unwrap().iter().cloned().collect()
    }

    /// Snapshot, joined with the caller-supplied subscriber count since the
    /// hub (not this struct) owns the subscriber map (§4.8 `subscribedClients`).
    #[must_use]
    pub fn snapshot(&self, subscribed_clients: usize) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            events_ingested: self.events_ingested.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_rate_limited: self.events_rate_limited.load(Ordering::Relaxed),
            events_batched: self.events_batched.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            forwarding_errors: self.forwarding_errors.load(Ordering::Relaxed),
            subscribed_clients,
            last_event_time: self.last_event_time(),
        }
    }
}

/// Point-in-time snapshot of [`HubMetrics`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HubMetricsSnapshot {
    pub events_ingested: u64,
    pub events_dropped: u64,
    pub events_rate_limited: u64,
    pub events_batched: u64,
    pub batches_processed: u64,
    pub events_forwarded: u64,
    pub forwarding_errors: u64,
    pub subscribed_clients: usize,
    pub last_event_time: Option<chrono::DateTime<chrono::Utc>>,
}
