//! The sync orchestrator (§4.5): pulls raw payloads from adapters, converts
//! them in bounded batches, resolves conflicts against the current registry
//! contents, and applies the merge plan one entity at a time.

mod outcome;

pub use outcome::{SyncOutcome, SyncStatus};

use crate::adapter::AdapterRegistry;
use crate::conflict::ConflictResolver;
use crate::config::{Deadlines, SyncConfig};
use crate::error::HearthError;
use crate::registry::{AreaRegistry, EntityRegistry, RoomRegistry};
use crate::types::{Entity, HubEvent, Room, SyncStatusEvent, UnifiedId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// What should happen to a converted candidate once compared against the
/// registry's current contents.
enum MergeDecision {
    Insert(Entity),
    Update(Entity),
    /// The incoming observation won against a same-logical-entity record
    /// stored under a different source's unified ID; the old key must be
    /// dropped before the winner is stored under its own (§4.6, S3).
    Replace { old_id: UnifiedId, winner: Entity },
    Discard,
}

/// Drives full and incremental syncs for one or all registered adapters.
/// Holds no adapter-specific state; every call re-reads the registries it
/// needs, honoring the lock order `adapter → entity → room → area` (§5).
pub struct SyncOrchestrator {
    adapters: Arc<AdapterRegistry>,
    entities: Arc<EntityRegistry>,
    rooms: Arc<RoomRegistry>,
    areas: Arc<AreaRegistry>,
    resolver: ConflictResolver,
    config: SyncConfig,
    deadlines: Deadlines,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(
        adapters: Arc<AdapterRegistry>,
        entities: Arc<EntityRegistry>,
        rooms: Arc<RoomRegistry>,
        areas: Arc<AreaRegistry>,
        resolver: ConflictResolver,
        config: SyncConfig,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            adapters,
            entities,
            rooms,
            areas,
            resolver,
            config,
            deadlines,
        }
    }

    /// Sync every entity and room an adapter advertises, returning a partial
    /// result on failure rather than propagating: one misbehaving source
    /// must never block its siblings (§4.5 step 6, invariant 6).
    pub async fn sync_from_source(&self, adapter_id: &str) -> SyncOutcome {
        let Some(adapter) = self.adapters.get(adapter_id) else {
            return SyncOutcome::failed(adapter_id, HearthError::EntityNotFound(adapter_id.to_string()));
        };
        let source = adapter.source().to_string();

        let raw_rooms = match adapter.fetch_rooms_raw(self.deadlines.rest_call).await {
            Ok(rooms) => rooms,
            Err(err) => {
                self.adapters.record_sync_error(adapter_id);
                warn!(adapter_id, error = %err, "room fetch failed, continuing with entities only");
                Vec::new()
            }
        };
        let mut room_errors = 0u64;
        for raw in &raw_rooms {
            match adapter.to_room(raw) {
                Ok(room) => self.apply_room(room),
                Err(err) => {
                    room_errors += 1;
                    warn!(adapter_id, error = %err, "room conversion failed");
                }
            }
        }

        let raw_entities = match adapter.fetch_entities_raw(self.deadlines.rest_call).await {
            Ok(entities) => entities,
            Err(err) => {
                self.adapters.record_sync_error(adapter_id);
                return SyncOutcome::failed(adapter_id, err);
            }
        };

        let mut processed = 0u64;
        let mut conversion_errors = room_errors;
        let mut inserted = 0u64;
        let mut updated = 0u64;

        for batch in raw_entities.chunks(self.config.batch_size.max(1)) {
            let converted = adapter.to_entities(batch);
            conversion_errors += batch.len() as u64 - converted.len() as u64;

            for candidate in converted {
                processed += 1;
                match self.decide(candidate) {
                    MergeDecision::Insert(entity) => {
                        self.entities.upsert(entity.clone());
                        if let Some(room_id) = &entity.base().room_id {
                            self.rooms.add_entity(room_id, entity.id().clone());
                        }
                        inserted += 1;
                    }
                    MergeDecision::Update(entity) => {
                        self.entities.upsert(entity);
                        updated += 1;
                    }
                    MergeDecision::Replace { old_id, winner } => {
                        self.entities.remove(&old_id);
                        self.entities.upsert(winner.clone());
                        if let Some(room_id) = &winner.base().room_id {
                            self.rooms.add_entity(room_id, winner.id().clone());
                        }
                        updated += 1;
                    }
                    MergeDecision::Discard => {}
                }
            }
        }

        self.adapters.record_sync(adapter_id, Utc::now());
        info!(
            adapter_id,
            inserted, updated, conversion_errors, "sync completed"
        );

        SyncOutcome {
            source,
            status: if conversion_errors > 0 {
                SyncStatus::Partial
            } else {
                SyncStatus::Complete
            },
            entities_processed: processed,
            entities_inserted: inserted,
            entities_updated: updated,
            conversion_errors,
            error: None,
        }
    }

    /// Sync every registered adapter, isolating failures per source
    /// (§4.5 step 6).
    pub async fn sync_from_all_sources(&self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        for id in self.adapters.ids() {
            outcomes.push(self.sync_from_source(&id).await);
        }
        outcomes
    }

    /// Build the `sync_status` event for an outcome, for the caller to push
    /// onto the event hub (§4.5 step 5).
    #[must_use]
    pub fn status_event(outcome: &SyncOutcome) -> HubEvent {
        HubEvent::SyncStatus(SyncStatusEvent {
            source: outcome.source.clone(),
            status: outcome.status.as_str().to_string(),
            entities_processed: outcome.entities_processed,
            timestamp: Utc::now(),
        })
    }

    /// Find the currently-stored observation of the same logical entity —
    /// by source-native ID, not by unified ID, since two sources may
    /// describe the same real-world device under the same native ID while
    /// storing it under different source-prefixed keys (§4.6, S3) — and
    /// resolve against it.
    fn decide(&self, candidate: Entity) -> MergeDecision {
        let native_id = candidate.id().strip_source();
        match self.entities.list_by_native_id(native_id).into_iter().next() {
            None => MergeDecision::Insert(candidate),
            Some(current) => {
                let outcome = self.resolver.resolve(&current, &candidate);
                if !outcome.replaced {
                    return MergeDecision::Discard;
                }
                if current.id() == outcome.winner.id() {
                    MergeDecision::Update(outcome.winner)
                } else {
                    MergeDecision::Replace {
                        old_id: current.id().clone(),
                        winner: outcome.winner,
                    }
                }
            }
        }
    }

    fn apply_room(&self, room: Room) {
        self.rooms.upsert(room);
    }

    /// Areas currently known, for callers building a full topology snapshot.
    /// No adapter in this contract produces raw area payloads directly;
    /// areas are populated out-of-band (e.g. seeded alongside rooms) and
    /// this registry is carried here so the dispatcher and hub share one
    /// lock-ordered handle set (§5).
    #[must_use]
    pub fn areas(&self) -> &Arc<AreaRegistry> {
        &self.areas
    }
}
