//! The unified ID format and other shared primitives.

use crate::error::{HearthError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A globally unique entity/room/area identifier of the form
/// `<source>_<source-native-id>` (§3 invariant 1). The source prefix is
/// mandatory and unforgeable: [`UnifiedId::new`] is the only constructor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnifiedId(String);

impl UnifiedId {
    /// Build a unified ID from a source tag and the source-native ID.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::InvalidAction`]-shaped validation failure if
    /// either half is empty.
    pub fn new(source: &str, source_native_id: &str) -> Result<Self> {
        if source.is_empty() || source_native_id.is_empty() {
            return Err(HearthError::InternalError(format!(
                "cannot build a unified ID from source '{source}' and native id '{source_native_id}'"
            )));
        }
        Ok(Self(format!("{source}_{source_native_id}")))
    }

    /// The full unified ID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The source tag this ID claims, taken from the prefix before the
    /// first underscore.
    #[must_use]
    pub fn source(&self) -> &str {
        self.0.split_once('_').map_or(self.0.as_str(), |(s, _)| s)
    }

    /// The source-native ID with the source prefix stripped. Adapters MUST
    /// call this (never pass the unified ID) when talking to their
    /// upstream (§4.1).
    #[must_use]
    pub fn strip_source(&self) -> &str {
        self.0
            .split_once('_')
            .map_or(self.0.as_str(), |(_, rest)| rest)
    }
}

impl fmt::Display for UnifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UnifiedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_source_and_native_id() {
        let id = UnifiedId::new("homeassistant", "light.kitchen").unwrap();
        assert_eq!(id.as_str(), "homeassistant_light.kitchen");
        assert_eq!(id.source(), "homeassistant");
        assert_eq!(id.strip_source(), "light.kitchen");
    }

    #[test]
    fn rejects_empty_halves() {
        assert!(UnifiedId::new("", "light.kitchen").is_err());
        assert!(UnifiedId::new("homeassistant", "").is_err());
    }
}
