//! Resolution status snapshots
//!
//! Serializable view of engine progress. "Still pending" is observable state
//! here, not an error anywhere else.

use serde::{Deserialize, Serialize};

/// Snapshot of a resolver's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverStatus {
    /// True once a tick ended with zero unresolved records; cleared by the
    /// next definition.
    pub completed: bool,
    /// Keys in the global solved set.
    pub solved: usize,
    /// Records with a published namespace.
    pub loaded: usize,
    /// Detail for every record not yet loaded.
    pub pending: Vec<PendingModule>,
}

/// One not-yet-loaded record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingModule {
    pub key: String,
    /// Keys of dependencies still unsolved.
    pub missing: Vec<String>,
    /// Unsuccessful resolution attempts so far.
    pub fails: u32,
    /// Whether external acquisition has been dispatched.
    pub fetched: bool,
}

impl ResolverStatus {
    /// True when nothing is waiting.
    pub fn is_resolved(&self) -> bool {
        self.pending.is_empty()
    }
}
