//! The metadata record shared by entities, rooms and areas, and the quality
//! score heuristic used as a conflict-resolution tiebreaker (§3 invariant 4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Originating-source bookkeeping carried by every unified record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Source tag (e.g. `"homeassistant"`).
    pub source: String,
    /// The source-native identifier (unprefixed).
    pub source_native_id: String,
    /// The raw upstream payload, preserved for debugging and round-tripping.
    pub source_payload: serde_json::Value,
    /// When this record was last refreshed from its source.
    pub last_synced: DateTime<Utc>,
    /// Heuristic quality in `[0, 1]`, used as a conflict-resolution tiebreaker.
    pub quality_score: f32,
}

impl SourceMetadata {
    /// Construct metadata for a freshly-converted record.
    #[must_use]
    pub fn new(source: impl Into<String>, source_native_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_native_id: source_native_id.into(),
            source_payload: serde_json::Value::Null,
            last_synced: Utc::now(),
            quality_score: 1.0,
        }
    }
}

/// Positive boosts applied when computing a quality score, configurable per
/// deployment.
#[derive(Debug, Clone, Copy)]
pub struct QualityBoosts {
    /// Boost applied when a friendly name is present.
    pub has_friendly_name: f32,
    /// Boost applied when a room or area assignment is present.
    pub has_room_or_area: f32,
    /// Boost applied when a device assignment is present.
    pub has_device: f32,
}

impl Default for QualityBoosts {
    fn default() -> Self {
        Self {
            has_friendly_name: 0.1,
            has_room_or_area: 0.1,
            has_device: 0.05,
        }
    }
}

/// Availability multipliers from §3 invariant 4.
const UNAVAILABLE_MULTIPLIER: f32 = 0.1;
const UNKNOWN_MULTIPLIER: f32 = 0.7;

/// Recompute a quality score for an entity snapshot, honoring invariant 4:
/// availability multiplies the base score, then completeness boosts are
/// applied, and the result is clamped to `[0, 1]`.
#[must_use]
pub fn compute_quality_score(
    available: bool,
    state_is_unknown: bool,
    has_friendly_name: bool,
    has_room_or_area: bool,
    has_device: bool,
    boosts: QualityBoosts,
) -> f32 {
    let mut score = 1.0_f32;
    if !available {
        score *= UNAVAILABLE_MULTIPLIER;
    } else if state_is_unknown {
        score *= UNKNOWN_MULTIPLIER;
    }
    if has_friendly_name {
        score += boosts.has_friendly_name;
    }
    if has_room_or_area {
        score += boosts.has_room_or_area;
    }
    if has_device {
        score += boosts.has_device;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_dominates_completeness_boosts() {
        let score = compute_quality_score(false, false, true, true, true, QualityBoosts::default());
        assert!((score - 0.1).abs() < 1e-6);
    }

    #[test]
    fn clamps_to_one() {
        let score = compute_quality_score(true, false, true, true, true, QualityBoosts::default());
        assert!(score <= 1.0);
    }

    #[test]
    fn unknown_state_multiplies_before_boosts() {
        let score = compute_quality_score(true, true, false, false, false, QualityBoosts::default());
        assert!((score - 0.7).abs() < 1e-6);
    }
}
