//! The event forwarding hub (§4.8): ingress → rate limiting → batching →
//! per-subscriber filtering → bounded egress, with back-pressure isolated
//! per subscriber and a forwarding-errors ring buffer.

mod batch;
mod ingress;
pub mod metrics;
mod subscription;

pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use subscription::Subscription;

use crate::config::HubConfig;
use crate::types::{HubEvent, SubscriptionFilter, UnifiedId};
use batch::BatchBuffer;
use governor::clock::{Clock, DefaultClock};
use governor::{Quota, RateLimiter};
use ingress::IngressQueue;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use subscription::Subscriber;
use tokio::sync::watch;
use tracing::warn;

/// Drives event ingestion, rate limiting, batching and fan-out to
/// subscribers. `ingest` is cheap and non-blocking; the heavy lifting runs
/// in the background task started by `run`.
pub struct EventHub {
    ingress: IngressQueue,
    limiter: RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>,
    /// Length of one token-bucket replenishment period, the longest an
    /// over-rate event is held before being dropped (§4.8).
    bucket_period: Duration,
    subscribers: RwLock<HashMap<String, Subscriber>>,
    entity_room: RwLock<HashMap<UnifiedId, UnifiedId>>,
    config: HubConfig,
    pub metrics: HubMetrics,
}

impl EventHub {
    #[must_use]
    pub fn new(config: HubConfig) -> Arc<Self> {
        let max_events_per_second = config.max_events_per_second.max(1);
        let quota = Quota::per_second(NonZeroU32::new(max_events_per_second).unwrap());
        Arc::new(Self {
            ingress: IngressQueue::new(config.ingress_capacity),
            limiter: RateLimiter::direct(quota),
            bucket_period: Duration::from_secs_f64(1.0 / f64::from(max_events_per_second)),
            subscribers: RwLock::new(HashMap::new()),
            entity_room: RwLock::new(HashMap::new()),
            metrics: HubMetrics::new(config.max_errors_retained),
            config,
        })
    }

    /// Submit an event for forwarding. Non-blocking: drops the oldest
    /// queued event rather than applying back-pressure to the caller
    /// (§4.8).
    pub fn ingest(&self, event: HubEvent) {
        self.metrics.events_ingested.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.metrics.record_event_time(chrono::Utc::now());
        if self.ingress.push(event) {
            self.metrics.events_dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap().len()
    }

    #[must_use]
    pub fn metrics_snapshot(&self) -> HubMetricsSnapshot {
        self.metrics.snapshot(self.subscriber_count())
    }

    /// Record (or clear) an entity's current room assignment, used by
    /// room-scoped subscription filters (§4.8).
    pub fn set_entity_room(&self, entity_id: UnifiedId, room_id: Option<UnifiedId>) {
        let mut map = self.entity_room.write().unwrap();
        match room_id {
            Some(room_id) => {
                map.insert(entity_id, room_id);
            }
            None => {
                map.remove(&entity_id);
            }
        }
    }

    /// Register a new subscriber with `filter` (empty sets mean
    /// "no filter on that axis").
    pub fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        let (subscriber, handle) = Subscriber::new(filter, self.config.subscriber_capacity);
        self.subscribers.write().unwrap().insert(subscriber.id.clone(), subscriber);
        handle
    }

    pub fn unsubscribe(&self, id: &str) {
        self.subscribers.write().unwrap().remove(id);
    }

    /// Drive the hub until `shutdown` fires: pull ingress batches, rate
    /// limit, coalesce batchable events, then fan out to matching
    /// subscribers.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut buffer = BatchBuffer::new();
        let mut ticker = tokio::time::interval(self.config.batch_window);

        loop {
            tokio::select! {
                batch = self.ingress.recv_batch() => {
                    for event in batch {
                        if let Err(not_until) = self.limiter.check() {
                            // Over-rate: hold the event for up to one bucket
                            // period, then drop it rather than block
                            // forever (§4.8).
                            let wait = not_until.wait_time_from(DefaultClock::default().now()).min(self.bucket_period);
                            tokio::time::sleep(wait).await;
                            if self.limiter.check().is_err() {
                                self.metrics.events_rate_limited.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                                continue;
                            }
                        }
                        if self.config.batch_events && event.is_batchable() {
                            buffer.push(event);
                        } else {
                            self.fan_out(event);
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        let flushed = buffer.drain();
                        self.metrics.events_batched.fetch_add(flushed.len() as u64, std::sync::atomic::Ordering::Relaxed);
                        self.metrics.batches_processed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        for event in flushed {
                            self.fan_out(event);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    fn fan_out(&self, event: HubEvent) {
        let entity_room = self.entity_room.read().unwrap();
        let subscribers = self.subscribers.read().unwrap();
        for subscriber in subscribers.values() {
            if !subscriber.filter.matches(&event, &entity_room) {
                continue;
            }
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => {
                    self.metrics.events_forwarded.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                Err(err) => {
                    warn!(subscriber_id = %subscriber.id, error = %err, "dropping event for slow subscriber");
                    self.metrics.record_error(&subscriber.id, err.to_string());
                }
            }
        }
    }
}
