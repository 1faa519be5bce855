//! The entity registry with secondary indices by source, type, room and
//! capability (§4.3).

use crate::types::{Capability, Entity, EntityType, UnifiedId};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct Indices {
    entities: HashMap<UnifiedId, Entity>,
    by_source: HashMap<String, HashSet<UnifiedId>>,
    by_type: HashMap<EntityType, HashSet<UnifiedId>>,
    by_room: HashMap<UnifiedId, HashSet<UnifiedId>>,
    by_capability: HashMap<Capability, HashSet<UnifiedId>>,
    /// Source-native ID (source prefix stripped) to the unified IDs
    /// currently stored under it. Lets the sync orchestrator find the
    /// currently-stored observation of the same logical entity across
    /// sources, since two sources may use the same native ID for the same
    /// real-world device (§3 invariant 2, §4.6, scenario S3).
    by_native_id: HashMap<String, HashSet<UnifiedId>>,
}

/// Concurrent-read, single-writer-per-merge entity registry.
#[derive(Default)]
pub struct EntityRegistry {
    inner: RwLock<Indices>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a copy of the stored entity, if present.
    #[must_use]
    pub fn get(&self, id: &UnifiedId) -> Option<Entity> {
        self.inner.read().unwrap().entities.get(id).cloned()
    }

    /// Insert or replace an entity, maintaining every secondary index and
    /// the entity-side room back-reference (§3 invariant 3). Note: the
    /// room's own `entity_ids` list is maintained by the room registry; the
    /// orchestrator keeps both in lockstep within its single write lease.
    pub fn upsert(&self, entity: Entity) {
        let mut indices = self.inner.write().unwrap();
        let id = entity.id().clone();

        if let Some(previous) = indices.entities.get(&id).cloned() {
            Self::remove_from_indices(&mut indices, &previous);
        }

        indices
            .by_source
            .entry(entity.base().metadata.source.clone())
            .or_default()
            .insert(id.clone());
        indices
            .by_type
            .entry(entity.entity_type())
            .or_default()
            .insert(id.clone());
        indices
            .by_native_id
            .entry(id.strip_source().to_string())
            .or_default()
            .insert(id.clone());
        if let Some(room_id) = &entity.base().room_id {
            indices.by_room.entry(room_id.clone()).or_default().insert(id.clone());
        }
        for capability in &entity.base().capabilities {
            indices
                .by_capability
                .entry(*capability)
                .or_default()
                .insert(id.clone());
        }

        indices.entities.insert(id, entity);
    }

    /// Remove an entity and every index entry referencing it.
    pub fn remove(&self, id: &UnifiedId) -> Option<Entity> {
        let mut indices = self.inner.write().unwrap();
        let removed = indices.entities.remove(id)?;
        Self::remove_from_indices(&mut indices, &removed);
        Some(removed)
    }

    fn remove_from_indices(indices: &mut Indices, entity: &Entity) {
        let id = entity.id();
        if let Some(set) = indices.by_source.get_mut(&entity.base().metadata.source) {
            set.remove(id);
        }
        if let Some(set) = indices.by_type.get_mut(&entity.entity_type()) {
            set.remove(id);
        }
        if let Some(set) = indices.by_native_id.get_mut(id.strip_source()) {
            set.remove(id);
        }
        if let Some(room_id) = &entity.base().room_id {
            if let Some(set) = indices.by_room.get_mut(room_id) {
                set.remove(id);
            }
        }
        for capability in &entity.base().capabilities {
            if let Some(set) = indices.by_capability.get_mut(capability) {
                set.remove(id);
            }
        }
    }

    /// All entities from `source`.
    #[must_use]
    pub fn list_by_source(&self, source: &str) -> Vec<Entity> {
        self.collect(|indices| indices.by_source.get(source).cloned().unwrap_or_default())
    }

    /// All entities of `entity_type`.
    #[must_use]
    pub fn list_by_type(&self, entity_type: EntityType) -> Vec<Entity> {
        self.collect(|indices| indices.by_type.get(&entity_type).cloned().unwrap_or_default())
    }

    /// All entities assigned to `room_id`.
    #[must_use]
    pub fn list_by_room(&self, room_id: &UnifiedId) -> Vec<Entity> {
        self.collect(|indices| indices.by_room.get(room_id).cloned().unwrap_or_default())
    }

    /// All entities currently stored under `native_id` (source prefix
    /// stripped), regardless of which source owns them. Normally at most
    /// one, since conflict resolution keeps a single canonical entry per
    /// logical entity; used by the sync orchestrator to find a cross-source
    /// observation to resolve against before insertion.
    #[must_use]
    pub fn list_by_native_id(&self, native_id: &str) -> Vec<Entity> {
        self.collect(|indices| indices.by_native_id.get(native_id).cloned().unwrap_or_default())
    }

    /// All entities advertising `capability`.
    #[must_use]
    pub fn list_by_capability(&self, capability: Capability) -> Vec<Entity> {
        self.collect(|indices| {
            indices
                .by_capability
                .get(&capability)
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Every entity currently stored.
    #[must_use]
    pub fn list_all(&self) -> Vec<Entity> {
        self.inner.read().unwrap().entities.values().cloned().collect()
    }

    /// Number of entities stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect(&self, pick_ids: impl FnOnce(&Indices) -> HashSet<UnifiedId>) -> Vec<Entity> {
        let indices = self.inner.read().unwrap();
        pick_ids(&indices)
            .iter()
            .filter_map(|id| indices.entities.get(id).cloned())
            .collect()
    }
}
