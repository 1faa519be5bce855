//! The adapter contract (§4.2) and the registry/lifecycle manager that
//! owns adapter instances (§4.4).

pub mod health;
pub mod registry;

use crate::error::Result;
use crate::types::{Area, Capability, ConnectionState, Entity, EntityState, EntityType, Room};
use async_trait::async_trait;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;

pub use health::HealthSupervisor;
pub use registry::AdapterRegistry;

/// A unified action, after the dispatcher has resolved and validated it but
/// before it has been mapped to the adapter's upstream call.
pub type Action = crate::types::ActionRequest;
/// The adapter's reply to a dispatched action.
pub type ActionOutcome = crate::types::ActionResult;

/// A lazily-produced sequence of realtime state-change events. Adapters
/// without realtime support return an empty stream (§4.2, §9).
pub type EventStream = Pin<Box<dyn Stream<Item = crate::types::HubEvent> + Send>>;

/// Every upstream integration implements this contract. Conversion methods
/// (`to_*`) MUST be deterministic and side-effect-free; all I/O is confined
/// to `connect`, `disconnect`, `fetch_*_raw`, `execute_action`, and
/// `event_stream`. Adapters never touch the registries directly (§4.2).
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable identifier for this adapter instance.
    fn id(&self) -> &str;

    /// The source tag this adapter federates (e.g. `"homeassistant"`).
    fn source(&self) -> &str;

    /// Human-readable display name.
    fn name(&self) -> &str;

    /// Adapter implementation version.
    fn version(&self) -> &str;

    /// Establish the upstream connection within `deadline`.
    async fn connect(&self, deadline: Duration) -> Result<()>;

    /// Tear down the upstream connection within `deadline`.
    async fn disconnect(&self, deadline: Duration) -> Result<()>;

    /// Fast, non-blocking connectivity check.
    fn is_connected(&self) -> bool;

    /// Current connection state.
    async fn status(&self) -> ConnectionState;

    /// Convert one raw upstream payload into a unified entity. Pure —
    /// adapters strip no network calls in here.
    fn to_entity(&self, raw: &serde_json::Value) -> Result<Entity>;

    /// Convert a batch of raw payloads, skipping (and letting the caller
    /// count/log) any that fail to convert.
    fn to_entities(&self, raw: &[serde_json::Value]) -> Vec<Entity> {
        raw.iter().filter_map(|r| self.to_entity(r).ok()).collect()
    }

    /// Convert one raw upstream payload into a unified room.
    fn to_room(&self, raw: &serde_json::Value) -> Result<Room>;

    /// Convert one raw upstream payload into a unified area.
    fn to_area(&self, raw: &serde_json::Value) -> Result<Area>;

    /// Fetch all raw entity payloads, paginating internally, within
    /// `deadline`. The orchestrator converts these in batches (§4.5).
    async fn fetch_entities_raw(&self, deadline: Duration) -> Result<Vec<serde_json::Value>>;

    /// Fetch all raw room payloads within `deadline`.
    async fn fetch_rooms_raw(&self, deadline: Duration) -> Result<Vec<serde_json::Value>>;

    /// Re-read a single entity's state from the source, used by the
    /// dispatcher's asynchronous verification step (§4.7 step 8).
    async fn query_entity_state(
        &self,
        deadline: Duration,
        source_native_id: &str,
    ) -> Result<EntityState>;

    /// When this adapter last completed a sync.
    fn last_sync_time(&self) -> Option<chrono::DateTime<chrono::Utc>>;

    /// Execute a unified action (already stripped of its source prefix) on
    /// the upstream, returning the adapter's raw result.
    async fn execute_action(&self, deadline: Duration, action: &Action) -> Result<ActionOutcome>;

    /// Entity domains this adapter can produce.
    fn supported_entity_types(&self) -> Vec<EntityType>;

    /// Capabilities this adapter can advertise.
    fn supported_capabilities(&self) -> Vec<Capability>;

    /// Whether this adapter can push realtime events via `event_stream`.
    fn supports_realtime(&self) -> bool {
        false
    }

    /// Current health snapshot.
    async fn health(&self) -> crate::types::AdapterHealth {
        crate::types::AdapterHealth::default()
    }

    /// A realtime event stream. Adapters that don't support realtime return
    /// an empty stream rather than implementing a sentinel (§9).
    fn event_stream(&self) -> EventStream {
        Box::pin(tokio_stream::empty())
    }
}
