//! The memory/goroutine (task) pressure monitor (§4.9): samples process
//! memory and the async runtime's active task count on a fixed interval and
//! invokes a callback when a configured threshold is crossed. Never
//! mutates registry or adapter state — observation only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, System};
use tokio::sync::watch;
use tracing::warn;

/// One point-in-time resource reading.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub memory_bytes: u64,
    pub active_tasks: usize,
}

/// Abstracts the resource source so tests can inject synthetic readings
/// instead of depending on the real process/runtime (§4.9, §9).
pub trait Sampler: Send + Sync {
    fn sample(&self) -> ResourceSample;
}

/// Default sampler backed by `sysinfo` for memory and a shared atomic
/// counter for the task count, maintained by whoever spawns tracked tasks.
pub struct SysinfoSampler {
    system: std::sync::Mutex<System>,
    pid: Pid,
    active_tasks: Arc<AtomicUsize>,
}

impl SysinfoSampler {
    #[must_use]
    pub fn new(active_tasks: Arc<AtomicUsize>) -> Self {
        Self {
            system: std::sync::Mutex::new(System::new_all()),
            pid: Pid::from_u32(std::process::id()),
            active_tasks,
        }
    }
}

impl Sampler for SysinfoSampler {
    fn sample(&self) -> ResourceSample {
        let mut system = self.system.lock().unwrap();
        system.refresh_process(self.pid);
        let memory_bytes = system.process(self.pid).map(|p| p.memory()).unwrap_or(0);
        ResourceSample {
            memory_bytes,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
        }
    }
}

/// Threshold configuration that triggers a pressure callback.
#[derive(Debug, Clone, Copy)]
pub struct PressureThresholds {
    pub max_memory_bytes: u64,
    pub max_active_tasks: usize,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            max_memory_bytes: 1_073_741_824, // 1 GiB
            max_active_tasks: 10_000,
        }
    }
}

impl From<&crate::config::MonitorConfig> for PressureThresholds {
    fn from(config: &crate::config::MonitorConfig) -> Self {
        Self {
            max_memory_bytes: config.max_memory_bytes,
            max_active_tasks: config.max_active_tasks,
        }
    }
}

/// Callback invoked when a sample crosses a threshold.
pub type PressureCallback = Arc<dyn Fn(ResourceSample) + Send + Sync>;

/// Periodically samples process memory and task pressure, firing
/// `on_pressure` whenever a threshold is exceeded. Read-only: this never
/// reaches into the registries or adapters it observes indirectly through
/// the active-task counter.
pub struct ResourceMonitor {
    sampler: Arc<dyn Sampler>,
    interval: Duration,
    thresholds: PressureThresholds,
    on_pressure: Option<PressureCallback>,
}

impl ResourceMonitor {
    #[must_use]
    pub fn new(sampler: Arc<dyn Sampler>, interval: Duration, thresholds: PressureThresholds) -> Self {
        Self {
            sampler,
            interval,
            thresholds,
            on_pressure: None,
        }
    }

    #[must_use]
    pub fn with_pressure_callback(mut self, callback: PressureCallback) -> Self {
        self.on_pressure = Some(callback);
        self
    }

    /// Run the sampling loop until `shutdown` fires (§4.9 default interval
    /// is 60s, configurable via `interval`).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.sample_once(),
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    fn sample_once(&self) {
        let sample = self.sampler.sample();
        let over_memory = sample.memory_bytes > self.thresholds.max_memory_bytes;
        let over_tasks = sample.active_tasks > self.thresholds.max_active_tasks;

        if over_memory || over_tasks {
            warn!(
                memory_bytes = sample.memory_bytes,
                active_tasks = sample.active_tasks,
                "resource pressure threshold exceeded"
            );
            if let Some(callback) = &self.on_pressure {
                callback(sample);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct FixedSampler(ResourceSample);

    impl Sampler for FixedSampler {
        fn sample(&self) -> ResourceSample {
            self.0
        }
    }

    #[test]
    fn pressure_callback_fires_over_memory_threshold() {
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        let monitor = ResourceMonitor::new(
            Arc::new(FixedSampler(ResourceSample {
                memory_bytes: 2_000_000_000,
                active_tasks: 1,
            })),
            Duration::from_secs(60),
            PressureThresholds::default(),
        )
        .with_pressure_callback(Arc::new(move |_| {
            fired_clone.store(true, Ordering::SeqCst);
        }));

        monitor.sample_once();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn no_callback_under_thresholds() {
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        let monitor = ResourceMonitor::new(
            Arc::new(FixedSampler(ResourceSample {
                memory_bytes: 1_000,
                active_tasks: 1,
            })),
            Duration::from_secs(60),
            PressureThresholds::default(),
        )
        .with_pressure_callback(Arc::new(move |_| {
            fired_clone.store(true, Ordering::SeqCst);
        }));

        monitor.sample_once();
        assert!(!fired.load(Ordering::SeqCst));
    }
}
