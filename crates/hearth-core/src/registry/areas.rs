//! The flat area registry (§4.3). Areas have no further nesting; rooms hold
//! the area reference.

use crate::types::{Area, UnifiedId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Concurrent-read area registry.
#[derive(Default)]
pub struct AreaRegistry {
    areas: RwLock<HashMap<UnifiedId, Area>>,
}

impl AreaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &UnifiedId) -> Option<Area> {
        self.areas.read().unwrap().get(id).cloned()
    }

    pub fn upsert(&self, area: Area) {
        self.areas.write().unwrap().insert(area.id.clone(), area);
    }

    pub fn remove(&self, id: &UnifiedId) -> Option<Area> {
        self.areas.write().unwrap().remove(id)
    }

    #[must_use]
    pub fn list_all(&self) -> Vec<Area> {
        self.areas.read().unwrap().values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceMetadata;

    fn area(id: &str) -> Area {
        Area {
            id: UnifiedId::new("homeassistant", id).unwrap(),
            name: id.to_string(),
            icon: None,
            description: None,
            room_ids: Vec::new(),
            entity_ids: Vec::new(),
            metadata: SourceMetadata::new("homeassistant", id),
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let registry = AreaRegistry::new();
        let a = area("area.downstairs");
        registry.upsert(a.clone());
        assert_eq!(registry.get(&a.id).unwrap().name, "area.downstairs");
    }

    #[test]
    fn remove_drops_entry() {
        let registry = AreaRegistry::new();
        let a = area("area.downstairs");
        registry.upsert(a.clone());
        registry.remove(&a.id);
        assert!(registry.get(&a.id).is_none());
    }
}
