//! The adapter identity, connection state and observability record (§3, §4.4).

use super::entity::{Capability, EntityType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// The adapter's connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Unhealthy,
}

/// Stable identity of an adapter instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterIdentity {
    pub id: String,
    pub source: String,
    pub name: String,
    pub version: String,
}

/// Rolling health: accumulated issues, an EWMA of response time and a
/// simple error rate, used by the supervisor's three-consecutive-failures
/// rule (§4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterHealth {
    pub issues: Vec<String>,
    pub response_time_ewma_ms: f64,
    pub error_rate: f64,
    pub consecutive_failures: u32,
}

impl AdapterHealth {
    /// Smoothing factor for the response-time EWMA.
    const EWMA_ALPHA: f64 = 0.2;

    /// Record a successful health probe, resetting the failure streak.
    pub fn record_success(&mut self, response_time_ms: f64) {
        self.consecutive_failures = 0;
        self.response_time_ewma_ms = if self.response_time_ewma_ms == 0.0 {
            response_time_ms
        } else {
            Self::EWMA_ALPHA * response_time_ms + (1.0 - Self::EWMA_ALPHA) * self.response_time_ewma_ms
        };
    }

    /// Record a failed health probe.
    pub fn record_failure(&mut self, issue: impl Into<String>) {
        self.consecutive_failures += 1;
        self.issues.push(issue.into());
        if self.issues.len() > 20 {
            self.issues.remove(0);
        }
    }

    /// Whether three consecutive failures have accumulated, the threshold
    /// at which the supervisor marks the adapter `Unhealthy` (§4.4).
    #[must_use]
    pub fn is_unhealthy(&self) -> bool {
        self.consecutive_failures >= 3
    }
}

/// Atomic counters for an adapter's metrics (§9: metric reads must always
/// be consistent, hence atomics rather than a lock around each increment).
#[derive(Debug)]
pub struct AdapterMetrics {
    pub entities_managed: AtomicU64,
    pub rooms_managed: AtomicU64,
    pub actions_executed: AtomicU64,
    pub actions_succeeded: AtomicU64,
    pub actions_failed: AtomicU64,
    pub sync_errors: AtomicU64,
    started_at: Instant,
}

impl Default for AdapterMetrics {
    fn default() -> Self {
        Self {
            entities_managed: AtomicU64::new(0),
            rooms_managed: AtomicU64::new(0),
            actions_executed: AtomicU64::new(0),
            actions_succeeded: AtomicU64::new(0),
            actions_failed: AtomicU64::new(0),
            sync_errors: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }
}

impl AdapterMetrics {
    /// Seconds since this adapter record was created.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Point-in-time snapshot suitable for serialization across the
    /// (out-of-scope) observability facade.
    #[must_use]
    pub fn snapshot(&self) -> AdapterMetricsSnapshot {
        AdapterMetricsSnapshot {
            entities_managed: self.entities_managed.load(Ordering::Relaxed),
            rooms_managed: self.rooms_managed.load(Ordering::Relaxed),
            actions_executed: self.actions_executed.load(Ordering::Relaxed),
            actions_succeeded: self.actions_succeeded.load(Ordering::Relaxed),
            actions_failed: self.actions_failed.load(Ordering::Relaxed),
            sync_errors: self.sync_errors.load(Ordering::Relaxed),
            uptime_seconds: self.uptime_seconds(),
        }
    }
}

/// Serializable snapshot of [`AdapterMetrics`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdapterMetricsSnapshot {
    pub entities_managed: u64,
    pub rooms_managed: u64,
    pub actions_executed: u64,
    pub actions_succeeded: u64,
    pub actions_failed: u64,
    pub sync_errors: u64,
    pub uptime_seconds: u64,
}

/// The full adapter record tracked by the adapter registry.
#[derive(Debug)]
pub struct AdapterRecord {
    pub identity: AdapterIdentity,
    pub connection_state: ConnectionState,
    pub last_sync: Option<DateTime<Utc>>,
    pub supported_entity_types: HashSet<EntityType>,
    pub supported_capabilities: HashSet<Capability>,
    pub supports_realtime: bool,
    pub health: AdapterHealth,
    pub metrics: AdapterMetrics,
}
