//! The conflict resolver (§4.6): a pure function over two candidate entity
//! snapshots for the same unified ID, no I/O, no locks held.

use crate::config::{AdapterPriorities, ConflictResolutionPolicy};
use crate::types::Entity;

/// Outcome of resolving a conflict between the entity already in the
/// registry (`current`) and a freshly-synced candidate (`incoming`).
#[derive(Debug, Clone)]
pub struct ConflictOutcome {
    /// The entity that should be written back to the registry.
    pub winner: Entity,
    /// `true` when `incoming` displaced `current`.
    pub replaced: bool,
    /// Why the winner was chosen, for logging/audit.
    pub reason: &'static str,
}

/// Resolves which of two same-ID entity snapshots should win, per the
/// configured policy and the deterministic tie-break order of §4.6:
/// priority, then quality score, then recency, then source name.
pub struct ConflictResolver {
    policy: ConflictResolutionPolicy,
    priorities: AdapterPriorities,
}

impl ConflictResolver {
    #[must_use]
    pub fn new(policy: ConflictResolutionPolicy, priorities: AdapterPriorities) -> Self {
        Self { policy, priorities }
    }

    /// Resolve a conflict between `current` and `incoming`, which must share
    /// a logical identity (the source-native ID, regardless of which source
    /// currently owns it — §4.6's "same logical entity", exercised
    /// cross-source in scenario S3). Panics (a programming error) if the
    /// caller violates this precondition.
    #[must_use]
    pub fn resolve(&self, current: &Entity, incoming: &Entity) -> ConflictOutcome {
        assert_eq!(
            current.id().strip_source(),
            incoming.id().strip_source(),
            "resolve() requires two snapshots of the same logical entity"
        );

        // Same-source updates bypass policy entirely: accept iff not stale
        // (§4.6 step 2, §8 invariant 5). Cross-source conflicts fall through
        // to the configured policy below.
        if current.base().metadata.source == incoming.base().metadata.source {
            return if incoming.base().last_updated >= current.base().last_updated {
                Self::pick(incoming, true, "newer same-source update")
            } else {
                Self::pick(current, false, "stale_same_source_update")
            };
        }

        match &self.policy {
            ConflictResolutionPolicy::SourceWins(source) => {
                if incoming.base().metadata.source == *source {
                    return Self::pick(incoming, true, "configured source wins");
                }
                if current.base().metadata.source == *source {
                    return Self::pick(current, false, "configured source wins");
                }
                self.resolve_by_priority_quality_recency(current, incoming)
            }
            ConflictResolutionPolicy::HighestQuality => {
                let current_score = current.base().metadata.quality_score;
                let incoming_score = incoming.base().metadata.quality_score;
                if incoming_score > current_score {
                    Self::pick(incoming, true, "higher quality score")
                } else if current_score > incoming_score {
                    Self::pick(current, false, "higher quality score")
                } else {
                    self.resolve_by_recency_then_source(current, incoming)
                }
            }
            ConflictResolutionPolicy::Priority => self.resolve_by_priority_quality_recency(current, incoming),
        }
    }

    fn resolve_by_priority_quality_recency(&self, current: &Entity, incoming: &Entity) -> ConflictOutcome {
        let current_priority = self.priorities.priority_of(&current.base().metadata.source);
        let incoming_priority = self.priorities.priority_of(&incoming.base().metadata.source);

        if incoming_priority < current_priority {
            return Self::pick(incoming, true, "higher configured source priority");
        }
        if current_priority < incoming_priority {
            return Self::pick(current, false, "higher configured source priority");
        }

        let current_score = current.base().metadata.quality_score;
        let incoming_score = incoming.base().metadata.quality_score;
        if incoming_score > current_score {
            return Self::pick(incoming, true, "higher quality score");
        }
        if current_score > incoming_score {
            return Self::pick(current, false, "higher quality score");
        }

        self.resolve_by_recency_then_source(current, incoming)
    }

    fn resolve_by_recency_then_source(&self, current: &Entity, incoming: &Entity) -> ConflictOutcome {
        let current_updated = current.base().last_updated;
        let incoming_updated = incoming.base().last_updated;

        if incoming_updated > current_updated {
            return Self::pick(incoming, true, "more recent lastUpdated");
        }
        if current_updated > incoming_updated {
            return Self::pick(current, false, "more recent lastUpdated");
        }

        // Final deterministic tie-break: lexicographically smaller source
        // name wins, so repeated resolution of identical inputs is stable.
        if incoming.base().metadata.source < current.base().metadata.source {
            Self::pick(incoming, true, "source name tie-break")
        } else {
            Self::pick(current, false, "source name tie-break")
        }
    }

    fn pick(winner: &Entity, replaced: bool, reason: &'static str) -> ConflictOutcome {
        ConflictOutcome {
            winner: winner.clone(),
            replaced,
            reason,
        }
    }
}
