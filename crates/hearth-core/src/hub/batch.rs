//! State-change coalescing (§4.8): within a batch window, repeated
//! `state_changed` events for the same entity collapse to their latest
//! value. Every other event type passes straight through.

use crate::types::{HubEvent, StateChangedEvent, UnifiedId};
use std::collections::HashMap;

/// Accumulates `state_changed` events for one batch window.
#[derive(Default)]
pub struct BatchBuffer {
    pending: HashMap<UnifiedId, StateChangedEvent>,
    passthrough: Vec<HubEvent>,
}

impl BatchBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `event` into the buffer. Non-batchable events queue in arrival
    /// order; batchable events keep only the most recent value per entity,
    /// preserving the oldest `old_state` seen this window so a subscriber
    /// that only sees the flush still observes the true start of the
    /// transition.
    pub fn push(&mut self, event: HubEvent) {
        let HubEvent::StateChanged(changed) = event else {
            self.passthrough.push(event);
            return;
        };

        match self.pending.get_mut(&changed.entity_id) {
            Some(existing) => {
                let old_state = existing.old_state;
                *existing = changed;
                existing.old_state = old_state;
            }
            None => {
                self.pending.insert(changed.entity_id.clone(), changed);
            }
        }
    }

    /// Drain the buffer, yielding passthrough events first, then one
    /// coalesced `state_changed` event per entity.
    pub fn drain(&mut self) -> Vec<HubEvent> {
        let mut out: Vec<HubEvent> = self.passthrough.drain(..).collect();
        out.extend(self.pending.drain().map(|(_, event)| HubEvent::StateChanged(event)));
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.passthrough.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state_changed(entity: &str, old: crate::types::EntityState, new: crate::types::EntityState) -> HubEvent {
        HubEvent::StateChanged(StateChangedEvent {
            entity_id: UnifiedId::new("homeassistant", entity).unwrap(),
            old_state: old,
            new_state: new,
            attributes: Default::default(),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn repeated_state_changes_collapse_to_one() {
        use crate::types::EntityState::{Off, On};
        let mut buffer = BatchBuffer::new();
        buffer.push(state_changed("light.kitchen", Off, On));
        buffer.push(state_changed("light.kitchen", On, Off));
        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn coalesced_event_keeps_earliest_old_state() {
        use crate::types::EntityState::{Off, On};
        let mut buffer = BatchBuffer::new();
        buffer.push(state_changed("light.kitchen", Off, On));
        buffer.push(state_changed("light.kitchen", On, Off));
        let drained = buffer.drain();
        let HubEvent::StateChanged(event) = &drained[0] else {
            panic!("expected state_changed");
        };
        assert_eq!(event.old_state, Off);
        assert_eq!(event.new_state, Off);
    }

    #[test]
    fn distinct_entities_stay_separate() {
        use crate::types::EntityState::{Off, On};
        let mut buffer = BatchBuffer::new();
        buffer.push(state_changed("light.kitchen", Off, On));
        buffer.push(state_changed("light.bedroom", Off, On));
        assert_eq!(buffer.drain().len(), 2);
    }
}
