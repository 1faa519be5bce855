//! The room record (§3).

use super::metadata::SourceMetadata;
use super::primitives::UnifiedId;
use serde::{Deserialize, Serialize};

/// A room, with an ordered membership list of entity IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: UnifiedId,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    /// Ordered member entity IDs. Kept bidirectionally consistent with each
    /// member entity's `room_id` (§3 invariant 3).
    #[serde(default)]
    pub entity_ids: Vec<UnifiedId>,
    pub area_id: Option<UnifiedId>,
    pub metadata: SourceMetadata,
}
