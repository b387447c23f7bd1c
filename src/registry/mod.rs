//! Module registry
//!
//! Keyed records, the global solved set, and the bookkeeping that keeps every
//! record's pending dependencies consistent with it.

pub mod record;

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use record::{DepSpec, ModuleRecord};

/// Reserved key resolving to the engine's own handle instead of a namespace.
/// Never tracked as a dependency and never given a record.
pub const REQUIRE_PATH: &str = "require";

/// The registry: one record per mentioned key plus the global solved set.
///
/// Iteration order is the key order, which keeps scheduling deterministic.
#[derive(Debug, Default)]
pub struct Registry {
    records: BTreeMap<String, ModuleRecord>,
    solved: HashSet<String>,
    anonymous_seq: u64,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Synthesize the next anonymous key. Keys are unique per engine.
    pub fn next_anonymous_key(&mut self) -> String {
        let key = format!("anonymous{}", self.anonymous_seq);
        self.anonymous_seq += 1;
        key
    }

    /// Install a freshly defined record.
    ///
    /// Filters already-solved targets out of the pending list, replaces any
    /// existing record under the same key (last definition wins), and creates
    /// placeholder records for forward-referenced targets so they can be
    /// located or acquired later.
    pub fn install(&mut self, mut record: ModuleRecord) {
        record.pending_deps = record
            .declared_deps
            .iter()
            .filter(|dep| dep.key != REQUIRE_PATH && !self.solved.contains(&dep.key))
            .cloned()
            .collect();

        let key = record.key.clone();
        let declared = record.declared_deps.clone();
        if self.records.insert(key.clone(), record).is_some() {
            debug!("redefining module '{}'", key);
        }

        for dep in &declared {
            if dep.key == REQUIRE_PATH || self.records.contains_key(&dep.key) {
                continue;
            }
            debug!("forward reference to '{}' recorded", dep.key);
            self.records.insert(
                dep.key.clone(),
                ModuleRecord::placeholder(&dep.key, dep.pull.clone()),
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<&ModuleRecord> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ModuleRecord> {
        self.records.get_mut(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.values()
    }

    /// Keys of records not yet loaded, in registry order.
    pub fn unloaded_keys(&self) -> Vec<String> {
        self.records
            .values()
            .filter(|record| !record.loaded)
            .map(|record| record.key.clone())
            .collect()
    }

    /// Mark a key solved and sweep it out of every record's pending list.
    /// The one cross-record mutation in the system.
    pub fn mark_solved(&mut self, key: &str) {
        self.solved.insert(key.to_string());
        let mut swept = 0;
        for record in self.records.values_mut() {
            let before = record.pending_deps.len();
            record.pending_deps.retain(|dep| dep.key != key);
            swept += before - record.pending_deps.len();
        }
        if swept > 0 {
            debug!("'{}' satisfied {} waiting dependency entries", key, swept);
        }
    }

    pub fn is_solved(&self, key: &str) -> bool {
        self.solved.contains(key)
    }

    pub fn solved_count(&self) -> usize {
        self.solved.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.records.values().filter(|record| record.loaded).count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.records.values().filter(|record| !record.loaded).count()
    }
}
