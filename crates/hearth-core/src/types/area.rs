//! The area record (§3).

use super::metadata::SourceMetadata;
use super::primitives::UnifiedId;
use serde::{Deserialize, Serialize};

/// An area groups rooms and may also hold entities directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: UnifiedId,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub room_ids: Vec<UnifiedId>,
    #[serde(default)]
    pub entity_ids: Vec<UnifiedId>,
    pub metadata: SourceMetadata,
}
