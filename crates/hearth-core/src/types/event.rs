//! Event types forwarded through the event hub (§4.8) and the subscription
//! filter subscribers declare.

use super::entity::{Entity, EntityState};
use super::primitives::UnifiedId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The axis a subscriber can filter events on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubEventType {
    StateChanged,
    EntityAdded,
    EntityRemoved,
    SyncStatus,
    ServiceCalled,
}

/// `state_changed` payload, used both for genuine upstream changes and for
/// dispatcher correction events (§4.7 step 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangedEvent {
    pub entity_id: UnifiedId,
    pub old_state: EntityState,
    pub new_state: EntityState,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// `entity_added` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAddedEvent {
    pub entity: Entity,
    pub timestamp: DateTime<Utc>,
}

/// `entity_removed` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRemovedEvent {
    pub entity_id: UnifiedId,
    pub timestamp: DateTime<Utc>,
}

/// `sync_status` payload, emitted after each sync run (§4.5 step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusEvent {
    pub source: String,
    pub status: String,
    pub entities_processed: u64,
    pub timestamp: DateTime<Utc>,
}

/// `service_called` payload, emitted once an action has been dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCalledEvent {
    pub entity_id: UnifiedId,
    pub action: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// The envelope the hub fans out. Untagged union of the five event kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HubEvent {
    StateChanged(StateChangedEvent),
    EntityAdded(EntityAddedEvent),
    EntityRemoved(EntityRemovedEvent),
    SyncStatus(SyncStatusEvent),
    ServiceCalled(ServiceCalledEvent),
}

impl HubEvent {
    /// This event's type tag, used for filtering.
    #[must_use]
    pub fn event_type(&self) -> HubEventType {
        match self {
            HubEvent::StateChanged(_) => HubEventType::StateChanged,
            HubEvent::EntityAdded(_) => HubEventType::EntityAdded,
            HubEvent::EntityRemoved(_) => HubEventType::EntityRemoved,
            HubEvent::SyncStatus(_) => HubEventType::SyncStatus,
            HubEvent::ServiceCalled(_) => HubEventType::ServiceCalled,
        }
    }

    /// The entity this event concerns, if any (sync-status events concern no
    /// single entity and so are never entity- or room-filtered out).
    #[must_use]
    pub fn entity_id(&self) -> Option<&UnifiedId> {
        match self {
            HubEvent::StateChanged(e) => Some(&e.entity_id),
            HubEvent::EntityAdded(e) => Some(e.entity.id()),
            HubEvent::EntityRemoved(e) => Some(&e.entity_id),
            HubEvent::ServiceCalled(e) => Some(&e.entity_id),
            HubEvent::SyncStatus(_) => None,
        }
    }

    /// Whether batching applies to this event. Only `state_changed` events
    /// are coalesced (§4.8).
    #[must_use]
    pub fn is_batchable(&self) -> bool {
        matches!(self, HubEvent::StateChanged(_))
    }
}

/// A per-connection subscription. An empty set on any axis means "no filter
/// on that axis" (§4.8).
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub event_types: HashSet<HubEventType>,
    pub entity_ids: HashSet<UnifiedId>,
    pub room_ids: HashSet<UnifiedId>,
}

impl SubscriptionFilter {
    /// Whether `event` matches this filter, given `entity_room`, the
    /// entity→room mapping the hub maintains transactionally.
    #[must_use]
    pub fn matches(&self, event: &HubEvent, entity_room: &HashMap<UnifiedId, UnifiedId>) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type()) {
            return false;
        }

        let Some(entity_id) = event.entity_id() else {
            // Events with no single entity (sync status) bypass entity/room filters.
            return true;
        };

        if !self.entity_ids.is_empty() && !self.entity_ids.contains(entity_id) {
            return false;
        }

        if !self.room_ids.is_empty() {
            match entity_room.get(entity_id) {
                Some(room_id) if self.room_ids.contains(room_id) => {}
                _ => return false,
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state_changed(entity_id: &str) -> HubEvent {
        HubEvent::StateChanged(StateChangedEvent {
            entity_id: UnifiedId::new("homeassistant", entity_id).unwrap(),
            old_state: EntityState::Off,
            new_state: EntityState::On,
            attributes: HashMap::new(),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = SubscriptionFilter::default();
        let event = sample_state_changed("light.kitchen");
        assert!(filter.matches(&event, &HashMap::new()));
    }

    #[test]
    fn entity_allowlist_excludes_other_entities() {
        let mut filter = SubscriptionFilter::default();
        filter
            .entity_ids
            .insert(UnifiedId::new("homeassistant", "light.bedroom").unwrap());
        let event = sample_state_changed("light.kitchen");
        assert!(!filter.matches(&event, &HashMap::new()));
    }

    #[test]
    fn room_filter_uses_entity_room_map() {
        let mut filter = SubscriptionFilter::default();
        let room = UnifiedId::new("homeassistant", "room.kitchen").unwrap();
        filter.room_ids.insert(room.clone());

        let entity_id = UnifiedId::new("homeassistant", "light.kitchen").unwrap();
        let mut map = HashMap::new();
        map.insert(entity_id.clone(), room);

        let event = sample_state_changed("light.kitchen");
        assert!(filter.matches(&event, &map));
        assert!(!filter.matches(&event, &HashMap::new()));
    }

    #[test]
    fn sync_status_bypasses_entity_and_room_filters() {
        let mut filter = SubscriptionFilter::default();
        filter
            .entity_ids
            .insert(UnifiedId::new("homeassistant", "light.bedroom").unwrap());
        let event = HubEvent::SyncStatus(SyncStatusEvent {
            source: "homeassistant".into(),
            status: "complete".into(),
            entities_processed: 10,
            timestamp: Utc::now(),
        });
        assert!(filter.matches(&event, &HashMap::new()));
    }
}
