//! The adapter registry and lifecycle manager (§4.4).

use super::Adapter;
use crate::error::{HearthError, Result};
use crate::types::{AdapterHealth, AdapterIdentity, AdapterMetrics, AdapterRecord, ConnectionState};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{info, warn};

struct Registered {
    adapter: Arc<dyn Adapter>,
    record: Arc<RwLock<AdapterRecord>>,
}

/// Holds adapters keyed by ID with a secondary index by source. The lock
/// acquisition order `adapter registry → entity registry → room registry →
/// area registry` from §5 starts here: callers must never hold this
/// registry's lock across an adapter I/O call.
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Registered>>,
    by_source: RwLock<HashMap<String, Vec<String>>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: RwLock::new(HashMap::new()),
            by_source: RwLock::new(HashMap::new()),
        }
    }

    /// Register `adapter`, refusing duplicate IDs, then connect it with a
    /// bounded deadline and record the initial health snapshot (§4.4).
    pub async fn register(&self, adapter: Arc<dyn Adapter>, connect_deadline: Duration) -> Result<()> {
        let id = adapter.id().to_string();
        let source = adapter.source().to_string();

        {
            let adapters = self.adapters.read().unwrap();
            if adapters.contains_key(&id) {
                return Err(HearthError::InternalError(format!(
                    "adapter id '{id}' is already registered"
                )));
            }
        }

        let record = AdapterRecord {
            identity: AdapterIdentity {
                id: id.clone(),
                source: source.clone(),
                name: adapter.name().to_string(),
                version: adapter.version().to_string(),
            },
            connection_state: ConnectionState::Connecting,
            last_sync: None,
            supported_entity_types: adapter.supported_entity_types().into_iter().collect(),
            supported_capabilities: adapter.supported_capabilities().into_iter().collect(),
            supports_realtime: adapter.supports_realtime(),
            health: AdapterHealth::default(),
            metrics: AdapterMetrics::default(),
        };

        {
            let mut adapters = self.adapters.write().unwrap();
            adapters.insert(
                id.clone(),
                Registered {
                    adapter: adapter.clone(),
                    record: Arc::new(RwLock::new(record)),
                },
            );
            self.by_source
                .write()
                .unwrap()
                .entry(source.clone())
                .or_default()
                .push(id.clone());
        }

        match adapter.connect(connect_deadline).await {
            Ok(()) => {
                self.set_connection_state(&id, ConnectionState::Connected);
                info!(adapter_id = %id, source = %source, "adapter connected");
                Ok(())
            }
            Err(err) => {
                self.set_connection_state(&id, ConnectionState::Disconnected);
                warn!(adapter_id = %id, source = %source, error = %err, "adapter failed to connect");
                Err(err)
            }
        }
    }

    /// Disconnect and remove an adapter.
    pub async fn unregister(&self, id: &str, disconnect_deadline: Duration) -> Result<()> {
        let adapter = {
            let adapters = self.adapters.read().unwrap();
            adapters
                .get(id)
                .map(|r| r.adapter.clone())
                .ok_or_else(|| HearthError::EntityNotFound(id.to_string()))?
        };

        adapter.disconnect(disconnect_deadline).await?;

        let source = adapter.source().to_string();
        self.adapters.write().unwrap().remove(id);
        if let Some(ids) = self.by_source.write().unwrap().get_mut(&source) {
            ids.retain(|existing| existing != id);
        }
        info!(adapter_id = %id, "adapter unregistered");
        Ok(())
    }

    /// Look up an adapter by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.read().unwrap().get(id).map(|r| r.adapter.clone())
    }

    /// All adapter IDs registered for `source`.
    #[must_use]
    pub fn by_source(&self, source: &str) -> Vec<Arc<dyn Adapter>> {
        let ids = self.by_source.read().unwrap();
        let Some(ids) = ids.get(source) else {
            return Vec::new();
        };
        let adapters = self.adapters.read().unwrap();
        ids.iter()
            .filter_map(|id| adapters.get(id).map(|r| r.adapter.clone()))
            .collect()
    }

    /// Current connection state of an adapter, if registered.
    #[must_use]
    pub fn connection_state(&self, id: &str) -> Option<ConnectionState> {
        self.adapters
            .read()
            .unwrap()
            .get(id)
            .map(|r| r.record.read().unwrap().connection_state)
    }

    fn set_connection_state(&self, id: &str, state: ConnectionState) {
        if let Some(registered) = self.adapters.read().unwrap().get(id) {
            registered.record.write().unwrap().connection_state = state;
        }
    }

    /// Record a sync timestamp against an adapter's record.
    pub fn record_sync(&self, id: &str, when: chrono::DateTime<chrono::Utc>) {
        if let Some(registered) = self.adapters.read().unwrap().get(id) {
            registered.record.write().unwrap().last_sync = Some(when);
        }
    }

    /// Increment an adapter's `sync_errors` counter.
    pub fn record_sync_error(&self, id: &str) {
        if let Some(registered) = self.adapters.read().unwrap().get(id) {
            registered
                .record
                .read()
                .unwrap()
                .metrics
                .sync_errors
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    /// Record the outcome of a dispatched action against an adapter's
    /// metrics (§4.7, §9 atomics mandate).
    pub fn record_action(&self, id: &str, success: bool) {
        if let Some(registered) = self.adapters.read().unwrap().get(id) {
            let record = registered.record.read().unwrap();
            record.metrics.actions_executed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            if success {
                record.metrics.actions_succeeded.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            } else {
                record.metrics.actions_failed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
    }

    /// Apply the result of a health probe, returning `true` if the adapter
    /// crossed into `Unhealthy` as a result (three consecutive failures,
    /// §4.4).
    pub fn apply_health_probe(&self, id: &str, result: &Result<()>, response_time_ms: f64) -> bool {
        let Some(record_lock) = self.adapters.read().unwrap().get(id).map(|r| r.record.clone()) else {
            return false;
        };
        let mut record = record_lock.write().unwrap();
        match result {
            Ok(()) => {
                record.health.record_success(response_time_ms);
                false
            }
            Err(err) => {
                record.health.record_failure(err.to_string());
                if record.health.is_unhealthy() && record.connection_state != ConnectionState::Unhealthy {
                    record.connection_state = ConnectionState::Unhealthy;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Snapshot every adapter's identity, state and metrics, e.g. for the
    /// (out-of-scope) `GET /adapters` endpoint.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(AdapterIdentity, ConnectionState, crate::types::AdapterMetricsSnapshot)> {
        self.adapters
            .read()
            .unwrap()
            .values()
            .map(|r| {
                let record = r.record.read().unwrap();
                (
                    record.identity.clone(),
                    record.connection_state,
                    record.metrics.snapshot(),
                )
            })
            .collect()
    }

    /// All registered adapter IDs.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.adapters.read().unwrap().keys().cloned().collect()
    }
}
