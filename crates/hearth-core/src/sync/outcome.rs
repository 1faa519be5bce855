//! Result types returned by a sync run (§4.5 step 6).

use crate::error::HearthError;

/// Whether a sync run finished cleanly, partially, or failed outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Complete,
    Partial,
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Complete => "complete",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }
}

/// The outcome of one `sync_from_source` run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub source: String,
    pub status: SyncStatus,
    pub entities_processed: u64,
    pub entities_inserted: u64,
    pub entities_updated: u64,
    pub conversion_errors: u64,
    pub error: Option<String>,
}

impl SyncOutcome {
    /// Build a wholesale-failure outcome, e.g. when the raw entity fetch
    /// itself errored.
    #[must_use]
    pub fn failed(source: &str, err: HearthError) -> Self {
        Self {
            source: source.to_string(),
            status: SyncStatus::Failed,
            entities_processed: 0,
            entities_inserted: 0,
            entities_updated: 0,
            conversion_errors: 0,
            error: Some(err.to_string()),
        }
    }
}
