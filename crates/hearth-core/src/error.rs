//! Error taxonomy for the federation engine (§7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error kinds the engine can produce.
///
/// Adapters convert upstream errors into these kinds at their boundary;
/// the orchestrator and dispatcher propagate without reclassification.
#[derive(Debug, Error)]
pub enum HearthError {
    /// Missing fields or out-of-range parameters on an action. Not retried.
    #[error("invalid action for entity {entity_id}: {message}")]
    InvalidAction {
        /// Entity the action targeted.
        entity_id: String,
        /// What was wrong with it.
        message: String,
    },

    /// The unified action has no upstream equivalent for this entity. Not retried.
    #[error("no upstream mapping for action '{action}' on entity {entity_id}")]
    MappingError {
        /// Entity the action targeted.
        entity_id: String,
        /// Unified action name.
        action: String,
    },

    /// The owning adapter is not connected. Retried at the next sync or reconnect.
    #[error("adapter '{source}' is not connected")]
    NotConnected {
        /// Source tag of the adapter.
        source: String,
    },

    /// Transient upstream failure (timeout, 5xx, 429). Retried with backoff.
    #[error("transient upstream failure from '{source}': {message}")]
    UpstreamTransient {
        /// Source tag of the adapter.
        source: String,
        /// Upstream-provided detail.
        message: String,
    },

    /// Non-retryable upstream failure (4xx other than 429). Not retried.
    #[error("fatal upstream failure from '{source}': {message}")]
    UpstreamFatal {
        /// Source tag of the adapter.
        source: String,
        /// Upstream-provided detail.
        message: String,
    },

    /// Unified ID absent from the registry. Not retried.
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// A raw payload could not be mapped to the unified model. Skipped in bulk, logged, counted.
    #[error("conversion error from '{source}': {message}")]
    ConversionError {
        /// Source tag of the adapter.
        source: String,
        /// Why the payload could not be converted.
        message: String,
    },

    /// Programming bug. Surfaced with full context, never retried.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl HearthError {
    /// Whether the dispatcher/orchestrator should retry an operation that
    /// failed with this error, per the propagation policy of §7.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            HearthError::NotConnected { .. } | HearthError::UpstreamTransient { .. }
        )
    }

    /// Stable machine-readable code for the user-visible error shape.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            HearthError::InvalidAction { .. } => "invalid_action",
            HearthError::MappingError { .. } => "mapping_error",
            HearthError::NotConnected { .. } => "not_connected",
            HearthError::UpstreamTransient { .. } => "upstream_transient",
            HearthError::UpstreamFatal { .. } => "upstream_fatal",
            HearthError::EntityNotFound(_) => "entity_not_found",
            HearthError::ConversionError { .. } => "conversion_error",
            HearthError::InternalError(_) => "internal_error",
        }
    }

    /// Source tag associated with this error, if any.
    #[must_use]
    pub fn source_tag(&self) -> Option<&str> {
        match self {
            HearthError::NotConnected { source }
            | HearthError::UpstreamTransient { source, .. }
            | HearthError::UpstreamFatal { source, .. }
            | HearthError::ConversionError { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Entity ID associated with this error, if any.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            HearthError::InvalidAction { entity_id, .. }
            | HearthError::MappingError { entity_id, .. } => Some(entity_id),
            HearthError::EntityNotFound(id) => Some(id),
            _ => None,
        }
    }

    /// Build the user-visible `{ code, message, source, entityID?, timestamp,
    /// retryable }` shape described in §7.
    #[must_use]
    pub fn to_shape(&self) -> ErrorShape {
        ErrorShape {
            code: self.code().to_string(),
            message: self.to_string(),
            source: self.source_tag().map(str::to_string),
            entity_id: self.entity_id().map(str::to_string),
            timestamp: Utc::now(),
            retryable: self.retryable(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HearthError>;

/// The user-visible error shape surfaced across the (out-of-scope) HTTP/WS
/// facade boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorShape {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Source adapter tag, if applicable.
    pub source: Option<String>,
    /// Entity ID, if applicable.
    #[serde(rename = "entityID")]
    pub entity_id: Option<String>,
    /// When the error occurred.
    pub timestamp: DateTime<Utc>,
    /// Whether the caller should retry.
    pub retryable: bool,
}
