//! In-memory mock adapter and fixture builders for exercising the engine
//! without a real upstream integration.

use async_trait::async_trait;
use hearth_core::adapter::{Action, ActionOutcome};
use hearth_core::error::{HearthError, Result};
use hearth_core::types::{
    Area, Capability, ConnectionState, Entity, EntityBase, EntityState, EntityType, Room,
    SourceMetadata,
};
use hearth_core::Adapter;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

/// A fully in-memory [`Adapter`] driven by fixtures supplied at construction
/// time, for use in orchestrator, dispatcher and hub tests.
pub struct MockAdapter {
    id: String,
    source: String,
    name: String,
    version: String,
    state: RwLock<ConnectionState>,
    fail_connect: bool,
    entities_raw: Vec<serde_json::Value>,
    rooms_raw: Vec<serde_json::Value>,
    entity_states: RwLock<HashMap<String, EntityState>>,
    supported_entity_types: Vec<EntityType>,
    supported_capabilities: Vec<Capability>,
    actions: Mutex<Vec<Action>>,
    /// When set, `execute_action` reports success without actually changing
    /// `entity_states`, simulating upstream hardware that accepts a command
    /// but doesn't apply it (e.g. an offline bulb).
    stuck: bool,
    /// When set, `execute_action` always fails with `UpstreamFatal`,
    /// simulating a command the upstream rejects outright.
    fail_execution: bool,
    /// Issues `health()` reports, simulating a degraded upstream the
    /// connection-level `is_connected()` flag can't see.
    health_issues: Vec<String>,
}

impl MockAdapter {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            name: "mock".into(),
            version: "0.0.0".into(),
            state: RwLock::new(ConnectionState::Disconnected),
            fail_connect: false,
            entities_raw: Vec::new(),
            rooms_raw: Vec::new(),
            entity_states: RwLock::new(HashMap::new()),
            supported_entity_types: vec![EntityType::Light, EntityType::Switch],
            supported_capabilities: Vec::new(),
            actions: Mutex::new(Vec::new()),
            stuck: false,
            fail_execution: false,
            health_issues: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_entities_raw(mut self, entities: Vec<serde_json::Value>) -> Self {
        self.entities_raw = entities;
        self
    }

    #[must_use]
    pub fn with_rooms_raw(mut self, rooms: Vec<serde_json::Value>) -> Self {
        self.rooms_raw = rooms;
        self
    }

    #[must_use]
    pub fn with_supported_entity_types(mut self, types: Vec<EntityType>) -> Self {
        self.supported_entity_types = types;
        self
    }

    #[must_use]
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Make `execute_action` report success without applying the state
    /// change, simulating hardware that accepts a command but stays put.
    #[must_use]
    pub fn with_stuck_execution(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Make `execute_action` always fail with `UpstreamFatal`.
    #[must_use]
    pub fn with_failing_execution(mut self) -> Self {
        self.fail_execution = true;
        self
    }

    /// Make `health()` report `issues`, simulating a degraded upstream that
    /// still looks connected at the transport level.
    #[must_use]
    pub fn with_health_issues(mut self, issues: Vec<String>) -> Self {
        self.health_issues = issues;
        self
    }

    /// Seed the state `query_entity_state` returns for `native_id`.
    pub fn set_entity_state(&self, native_id: &str, state: EntityState) {
        self.entity_states.write().unwrap().insert(native_id.to_string(), state);
    }

    /// Actions dispatched against this adapter so far, in order.
    pub fn recorded_actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    fn parse_raw_state(raw: &serde_json::Value) -> EntityState {
        raw.get("state")
            .and_then(|v| v.as_str())
            .and_then(|s| match s {
                "on" => Some(EntityState::On),
                "off" => Some(EntityState::Off),
                "open" => Some(EntityState::Open),
                "closed" => Some(EntityState::Closed),
                "locked" => Some(EntityState::Locked),
                "unlocked" => Some(EntityState::Unlocked),
                "active" => Some(EntityState::Active),
                "idle" => Some(EntityState::Idle),
                "unavailable" => Some(EntityState::Unavailable),
                _ => None,
            })
            .unwrap_or(EntityState::Unknown)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn connect(&self, _deadline: Duration) -> Result<()> {
        if self.fail_connect {
            *self.state.write().unwrap() = ConnectionState::Disconnected;
            return Err(HearthError::UpstreamTransient {
                source: self.source.clone(),
                message: "mock adapter configured to fail connect".into(),
            });
        }
        *self.state.write().unwrap() = ConnectionState::Connected;
        Ok(())
    }

    async fn disconnect(&self, _deadline: Duration) -> Result<()> {
        *self.state.write().unwrap() = ConnectionState::Disconnected;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.state.read().unwrap() == ConnectionState::Connected
    }

    async fn status(&self) -> ConnectionState {
        *self.state.read().unwrap()
    }

    fn to_entity(&self, raw: &serde_json::Value) -> Result<Entity> {
        let native_id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HearthError::ConversionError {
                source: self.source.clone(),
                message: "raw entity payload missing 'id'".into(),
            })?;
        let id = hearth_core::types::UnifiedId::new(&self.source, native_id)?;
        let friendly_name = raw.get("name").and_then(|v| v.as_str()).map(str::to_string);
        let state = Self::parse_raw_state(raw);
        let mut attributes = HashMap::new();
        if state == EntityState::Unknown {
            if let Some(raw_state) = raw.get("state").and_then(|v| v.as_str()) {
                attributes.insert("raw_state".to_string(), serde_json::Value::String(raw_state.to_string()));
            }
        }
        Ok(Entity::Generic(EntityBase {
            id,
            entity_type: EntityType::Generic,
            friendly_name,
            state,
            attributes,
            last_updated: chrono::Utc::now(),
            available: state != EntityState::Unavailable,
            capabilities: Default::default(),
            room_id: None,
            area_id: None,
            device_id: None,
            metadata: SourceMetadata::new(self.source.clone(), native_id.to_string()),
        }))
    }

    fn to_room(&self, raw: &serde_json::Value) -> Result<Room> {
        let native_id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HearthError::ConversionError {
                source: self.source.clone(),
                message: "raw room payload missing 'id'".into(),
            })?;
        let name = raw.get("name").and_then(|v| v.as_str()).unwrap_or(native_id).to_string();
        Ok(Room {
            id: hearth_core::types::UnifiedId::new(&self.source, native_id)?,
            name,
            icon: None,
            description: None,
            entity_ids: Vec::new(),
            area_id: None,
            metadata: SourceMetadata::new(self.source.clone(), native_id.to_string()),
        })
    }

    fn to_area(&self, raw: &serde_json::Value) -> Result<Area> {
        let native_id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HearthError::ConversionError {
                source: self.source.clone(),
                message: "raw area payload missing 'id'".into(),
            })?;
        let name = raw.get("name").and_then(|v| v.as_str()).unwrap_or(native_id).to_string();
        Ok(Area {
            id: hearth_core::types::UnifiedId::new(&self.source, native_id)?,
            name,
            icon: None,
            description: None,
            room_ids: Vec::new(),
            entity_ids: Vec::new(),
            metadata: SourceMetadata::new(self.source.clone(), native_id.to_string()),
        })
    }

    async fn fetch_entities_raw(&self, _deadline: Duration) -> Result<Vec<serde_json::Value>> {
        Ok(self.entities_raw.clone())
    }

    async fn fetch_rooms_raw(&self, _deadline: Duration) -> Result<Vec<serde_json::Value>> {
        Ok(self.rooms_raw.clone())
    }

    async fn query_entity_state(&self, _deadline: Duration, source_native_id: &str) -> Result<EntityState> {
        Ok(self
            .entity_states
            .read()
            .unwrap()
            .get(source_native_id)
            .copied()
            .unwrap_or(EntityState::Unknown))
    }

    fn last_sync_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        None
    }

    async fn execute_action(&self, _deadline: Duration, action: &Action) -> Result<ActionOutcome> {
        self.actions.lock().unwrap().push(action.clone());
        if self.fail_execution {
            return Err(HearthError::UpstreamFatal {
                source: self.source.clone(),
                message: "mock adapter configured to fail execution".into(),
            });
        }
        let native_id = action.entity_id.strip_source();
        let current = self
            .entity_states
            .read()
            .unwrap()
            .get(native_id)
            .copied()
            .unwrap_or(EntityState::Unknown);
        let new_state = match action.action.as_str() {
            "turn_on" | "open" => current.complement().unwrap_or(EntityState::On),
            "turn_off" | "close" => current.complement().unwrap_or(EntityState::Off),
            "toggle" => current.complement().unwrap_or(current),
            "lock" => EntityState::Locked,
            "unlock" => EntityState::Unlocked,
            _ => current,
        };
        if !self.stuck {
            self.entity_states.write().unwrap().insert(native_id.to_string(), new_state);
        }
        Ok(ActionOutcome {
            success: true,
            new_state,
            attributes: HashMap::new(),
        })
    }

    fn supported_entity_types(&self) -> Vec<EntityType> {
        self.supported_entity_types.clone()
    }

    fn supported_capabilities(&self) -> Vec<Capability> {
        self.supported_capabilities.clone()
    }

    async fn health(&self) -> hearth_core::types::AdapterHealth {
        hearth_core::types::AdapterHealth {
            issues: self.health_issues.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_then_convert_round_trips() {
        let adapter = MockAdapter::new("mock-1", "mockhub")
            .with_entities_raw(vec![serde_json::json!({"id": "light.a", "name": "A", "state": "on"})]);
        adapter.connect(Duration::from_secs(1)).await.unwrap();
        assert!(adapter.is_connected());

        let raw = adapter.fetch_entities_raw(Duration::from_secs(1)).await.unwrap();
        let entity = adapter.to_entity(&raw[0]).unwrap();
        assert_eq!(entity.state(), EntityState::On);
        assert_eq!(entity.id().as_str(), "mockhub_light.a");
    }

    #[tokio::test]
    async fn failing_connect_reports_upstream_transient() {
        let adapter = MockAdapter::new("mock-1", "mockhub").failing_connect();
        let err = adapter.connect(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, HearthError::UpstreamTransient { .. }));
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn execute_action_records_and_flips_state() {
        let adapter = MockAdapter::new("mock-1", "mockhub");
        adapter.set_entity_state("light.a", EntityState::Off);
        let request = Action {
            entity_id: hearth_core::types::UnifiedId::new("mockhub", "light.a").unwrap(),
            action: "turn_on".into(),
            parameters: HashMap::new(),
        };
        let outcome = adapter.execute_action(Duration::from_secs(1), &request).await.unwrap();
        assert_eq!(outcome.new_state, EntityState::On);
        assert_eq!(adapter.recorded_actions().len(), 1);
    }

    #[tokio::test]
    async fn stuck_execution_reports_success_without_changing_state() {
        let adapter = MockAdapter::new("mock-1", "mockhub").with_stuck_execution();
        adapter.set_entity_state("light.a", EntityState::Off);
        let request = Action {
            entity_id: hearth_core::types::UnifiedId::new("mockhub", "light.a").unwrap(),
            action: "turn_on".into(),
            parameters: HashMap::new(),
        };
        let outcome = adapter.execute_action(Duration::from_secs(1), &request).await.unwrap();
        assert!(outcome.success);

        let actual = adapter.query_entity_state(Duration::from_secs(1), "light.a").await.unwrap();
        assert_eq!(actual, EntityState::Off);
    }
}
