//! Action request/result types for the control path (§4.7).

use super::entity::EntityState;
use super::primitives::UnifiedId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A client-issued command against a single entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub entity_id: UnifiedId,
    pub action: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// The outcome of a dispatched action, returned synchronously with a
/// deterministically predicted post-state (§4.7 step 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub new_state: EntityState,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}
