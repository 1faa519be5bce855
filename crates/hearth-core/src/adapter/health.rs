//! Background health supervision (§4.4): polls `health()` on a configured
//! interval and marks an adapter `Unhealthy` after three consecutive
//! failures, emitting an operator alert. No auto-restart — reconnection is
//! the adapter's own responsibility.

use super::registry::AdapterRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

/// Callback invoked when an adapter crosses into `Unhealthy`.
pub type AlertCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Drives periodic health probes against every registered adapter.
pub struct HealthSupervisor {
    registry: Arc<AdapterRegistry>,
    interval: Duration,
    alert: Option<AlertCallback>,
}

impl HealthSupervisor {
    #[must_use]
    pub fn new(registry: Arc<AdapterRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            alert: None,
        }
    }

    /// Attach an alert callback invoked (with the adapter ID) whenever an
    /// adapter newly transitions to `Unhealthy`.
    #[must_use]
    pub fn with_alert(mut self, alert: AlertCallback) -> Self {
        self.alert = Some(alert);
        self
    }

    /// Run the supervisor loop until `shutdown` is triggered. Spawn this as
    /// its own task: it owns no lock across the adapter `health()` call.
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.probe_all().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn probe_all(&self) {
        for id in self.registry.ids() {
            let Some(adapter) = self.registry.get(&id) else {
                continue;
            };

            if !adapter.is_connected() {
                let result = Err(crate::error::HearthError::NotConnected {
                    source: adapter.source().to_string(),
                });
                self.record_probe(&id, &result, 0.0);
                continue;
            }

            let start = Instant::now();
            let snapshot = adapter.health().await;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            let result = if snapshot.issues.is_empty() {
                Ok(())
            } else {
                Err(crate::error::HearthError::UpstreamTransient {
                    source: adapter.source().to_string(),
                    message: snapshot.issues.join("; "),
                })
            };
            self.record_probe(&id, &result, elapsed_ms);
        }
    }

    fn record_probe(&self, id: &str, result: &crate::error::Result<()>, elapsed_ms: f64) {
        let became_unhealthy = self.registry.apply_health_probe(id, result, elapsed_ms);
        if became_unhealthy {
            error!(adapter_id = %id, "adapter marked unhealthy after 3 consecutive failures");
            if let Some(alert) = &self.alert {
                alert(id);
            }
        }
    }
}
