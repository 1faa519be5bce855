//! Core federation engine: adapter lifecycle, the unified entity/room/area
//! model, sync and conflict resolution, action dispatch with optimistic
//! prediction, the event forwarding hub, and the resource pressure monitor.
//!
//! This crate has no network or storage facade of its own; it is driven by
//! an outer binary (or tests) that owns adapters, wires the registries
//! together, and drives the background loops (`EventHub::run`,
//! `ResourceMonitor::run`, adapter health supervision) to completion.

pub mod adapter;
pub mod config;
pub mod conflict;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod infrastructure;
pub mod monitor;
pub mod registry;
pub mod sync;
pub mod types;

pub use adapter::{Adapter, AdapterRegistry, HealthSupervisor};
pub use conflict::ConflictResolver;
pub use dispatch::ActionDispatcher;
pub use error::{HearthError, Result};
pub use hub::EventHub;
pub use infrastructure::ShutdownCoordinator;
pub use monitor::ResourceMonitor;
pub use registry::{AreaRegistry, EntityRegistry, RoomRegistry};
pub use sync::SyncOrchestrator;
