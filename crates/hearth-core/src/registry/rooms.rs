//! The room registry, indexed by parent area (§4.3).

use crate::types::{Room, UnifiedId};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct Indices {
    rooms: HashMap<UnifiedId, Room>,
    by_area: HashMap<UnifiedId, HashSet<UnifiedId>>,
}

/// Concurrent-read room registry.
#[derive(Default)]
pub struct RoomRegistry {
    inner: RwLock<Indices>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &UnifiedId) -> Option<Room> {
        self.inner.read().unwrap().rooms.get(id).cloned()
    }

    /// Insert or replace a room, updating the by-area index.
    pub fn upsert(&self, room: Room) {
        let mut indices = self.inner.write().unwrap();
        if let Some(previous) = indices.rooms.get(&room.id).cloned() {
            Self::remove_from_index(&mut indices, &previous);
        }
        if let Some(area_id) = &room.area_id {
            indices
                .by_area
                .entry(area_id.clone())
                .or_default()
                .insert(room.id.clone());
        }
        indices.rooms.insert(room.id.clone(), room);
    }

    pub fn remove(&self, id: &UnifiedId) -> Option<Room> {
        let mut indices = self.inner.write().unwrap();
        let removed = indices.rooms.remove(id)?;
        Self::remove_from_index(&mut indices, &removed);
        Some(removed)
    }

    fn remove_from_index(indices: &mut Indices, room: &Room) {
        if let Some(area_id) = &room.area_id {
            if let Some(set) = indices.by_area.get_mut(area_id) {
                set.remove(&room.id);
            }
        }
    }

    /// Add `entity_id` to a room's membership list, keeping it unique and
    /// order-stable (§3 invariant 3).
    pub fn add_entity(&self, room_id: &UnifiedId, entity_id: UnifiedId) {
        let mut indices = self.inner.write().unwrap();
        if let Some(room) = indices.rooms.get_mut(room_id) {
            if !room.entity_ids.contains(&entity_id) {
                room.entity_ids.push(entity_id);
            }
        }
    }

    /// Remove `entity_id` from a room's membership list.
    pub fn remove_entity(&self, room_id: &UnifiedId, entity_id: &UnifiedId) {
        let mut indices = self.inner.write().unwrap();
        if let Some(room) = indices.rooms.get_mut(room_id) {
            room.entity_ids.retain(|id| id != entity_id);
        }
    }

    /// Rooms belonging to `area_id`.
    #[must_use]
    pub fn list_by_area(&self, area_id: &UnifiedId) -> Vec<Room> {
        let indices = self.inner.read().unwrap();
        indices
            .by_area
            .get(area_id)
            .cloned()
            .unwrap_or_default()
            .iter()
            .filter_map(|id| indices.rooms.get(id).cloned())
            .collect()
    }

    #[must_use]
    pub fn list_all(&self) -> Vec<Room> {
        self.inner.read().unwrap().rooms.values().cloned().collect()
    }
}
