//! Typed configuration for the engine (§6, §4.12 ambient supplement).
//!
//! Loading these structs from files or environment bindings is an
//! out-of-scope external collaborator; this module only defines the shapes
//! and their defaults, plus thin env-var override helpers in the style of
//! the teacher's `dotenvy`-backed `config.rs`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// `sync.*` options (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub enabled: bool,
    #[serde(with = "duration_secs")]
    pub full_sync_interval: Duration,
    pub batch_size: usize,
    pub retry_attempts: u32,
    #[serde(with = "duration_millis")]
    pub retry_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            full_sync_interval: Duration::from_secs(300),
            batch_size: 10,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl SyncConfig {
    /// Override `batch_size` from `HEARTH_SYNC_BATCH_SIZE` if it parses,
    /// leaving all other fields at their defaults or prior values.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Ok(raw) = std::env::var("HEARTH_SYNC_BATCH_SIZE") {
            if let Ok(size) = raw.parse() {
                self.batch_size = size;
            }
        }
        self
    }
}

/// `websocket.*` options driving the event hub (§6, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub max_events_per_second: u32,
    #[serde(with = "duration_millis")]
    pub batch_window: Duration,
    pub batch_events: bool,
    pub forward_all_entities: bool,
    pub max_errors_retained: usize,
    /// Bound on the ingress ring buffer before the oldest event is dropped.
    pub ingress_capacity: usize,
    /// Bound on each subscriber's outbound channel.
    pub subscriber_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_events_per_second: 50,
            batch_window: Duration::from_millis(100),
            batch_events: true,
            forward_all_entities: false,
            max_errors_retained: 100,
            ingress_capacity: 1000,
            subscriber_capacity: 256,
        }
    }
}

/// `sync.conflict_resolution` policy (§6, §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolutionPolicy {
    Priority,
    SourceWins(String),
    HighestQuality,
}

impl Default for ConflictResolutionPolicy {
    fn default() -> Self {
        Self::Priority
    }
}

/// `adapter.<source>.priority` table (§6); lower number wins ties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterPriorities(pub HashMap<String, i32>);

impl AdapterPriorities {
    /// Priority for `source`, defaulting to `i32::MAX` (lowest priority) when
    /// unconfigured.
    #[must_use]
    pub fn priority_of(&self, source: &str) -> i32 {
        self.0.get(source).copied().unwrap_or(i32::MAX)
    }
}

/// `monitor.*` options for the resource pressure sampler (§6, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub enabled: bool,
    #[serde(with = "duration_secs")]
    pub sample_interval: Duration,
    pub max_memory_bytes: u64,
    pub max_active_tasks: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_interval: Duration::from_secs(60),
            max_memory_bytes: 1_073_741_824,
            max_active_tasks: 10_000,
        }
    }
}

/// Deadlines named in §5, collected so callers don't hardcode them.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub connect: Duration,
    pub rest_call: Duration,
    pub action_dispatch: Duration,
    pub verification: Duration,
    pub graceful_shutdown: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            rest_call: Duration::from_secs(30),
            action_dispatch: Duration::from_secs(3),
            verification: Duration::from_secs(5),
            graceful_shutdown: Duration::from_secs(20),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let sync = SyncConfig::default();
        assert_eq!(sync.batch_size, 10);
        let hub = HubConfig::default();
        assert_eq!(hub.max_events_per_second, 50);
        assert_eq!(hub.batch_window, Duration::from_millis(100));
    }

    #[test]
    fn unconfigured_source_has_lowest_priority() {
        let priorities = AdapterPriorities::default();
        assert_eq!(priorities.priority_of("shelly"), i32::MAX);
    }
}
