//! Resolution scheduling
//!
//! The state machine behind the engine mutex: fixed-point planning passes
//! over the registry, argument resolution, publication, and escalation to
//! external acquisition. Factory invocation itself happens outside the lock;
//! a pass only collects the work.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::acquire;
use crate::config::ResolverConfig;
use crate::engine::backoff::FibonacciBackoff;
use crate::engine::ResolverHandle;
use crate::namespace::{Context, Value};
use crate::registry::record::{Body, DepSpec, Factory, ResolvedVia};
use crate::registry::{Registry, REQUIRE_PATH};

/// Work collected under the lock, executed outside it.
pub(crate) enum WorkItem {
    CallFactory {
        key: String,
        factory: Factory,
        namespace: Value,
        args: Vec<Value>,
    },
    Acquire {
        key: String,
        resource: String,
    },
}

/// Outcome of one planning pass.
pub(crate) struct PassOutcome {
    pub jobs: Vec<WorkItem>,
    /// Whether the pass published anything directly under the lock.
    pub progressed: bool,
}

/// Per-tick accounting: a record takes at most one fail mark per tick.
#[derive(Default)]
pub(crate) struct TickCtx {
    failed: HashSet<String>,
}

/// Everything the engine mutex protects.
pub(crate) struct EngineState {
    pub registry: Registry,
    pub local: Context,
    pub host: Context,
    pub backoff: FibonacciBackoff,
    /// A tick is running; nested arm requests fold into it.
    pub traversing: bool,
    /// A tick ended with zero unresolved records; cleared by new work.
    pub completed: bool,
    /// A deferred worker task is live.
    pub worker_armed: bool,
    pub on_complete: Option<Box<dyn FnOnce() + Send>>,
}

impl EngineState {
    pub(crate) fn new(config: &ResolverConfig, local: Context, host: Context) -> EngineState {
        EngineState {
            registry: Registry::new(),
            local,
            host,
            backoff: FibonacciBackoff::new(config.backoff_unit()),
            traversing: false,
            completed: false,
            worker_armed: false,
            on_complete: None,
        }
    }

    /// One planning pass: publish what can be published under the lock,
    /// collect factory calls and acquisitions for execution outside it.
    pub(crate) fn plan_pass(
        &mut self,
        config: &ResolverConfig,
        handle: &ResolverHandle,
        tick: &mut TickCtx,
    ) -> PassOutcome {
        let mut jobs = Vec::new();
        let mut progressed = false;

        for key in self.registry.unloaded_keys() {
            let Some(record) = self.registry.get(&key) else {
                continue;
            };

            if !record.pending_deps.is_empty() {
                self.mark_fail(&key, tick);
                continue;
            }

            match record.body.clone() {
                Body::Value(value) => {
                    self.publish(&key, value, ResolvedVia::Value);
                    progressed = true;
                }
                Body::Text(text) => {
                    self.publish(&key, Value::Text(text), ResolvedVia::Text);
                    progressed = true;
                }
                Body::Factory(factory) => {
                    let declared = record.declared_deps.clone();
                    let args = declared
                        .iter()
                        .map(|dep| self.resolve_arg(dep, handle))
                        .collect();
                    jobs.push(WorkItem::CallFactory {
                        key: key.clone(),
                        factory,
                        namespace: Value::object(),
                        args,
                    });
                }
                Body::Pending => {
                    let wait_for = record.wait_for.clone();
                    match self.locate_external(&key, &wait_for) {
                        Some((value, via)) => {
                            self.publish(&key, value, via);
                            progressed = true;
                        }
                        None => {
                            self.mark_fail(&key, tick);
                            if let Some(record) = self.registry.get_mut(&key) {
                                let starved = !record.fetched
                                    && record.fails > config.fail_threshold
                                    && record.wait_for.len() <= 1;
                                if starved {
                                    record.fetched = true;
                                    jobs.push(WorkItem::Acquire {
                                        key: key.clone(),
                                        resource: acquire::resource_id(&key, config),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        PassOutcome { jobs, progressed }
    }

    /// Write the resolved value into the local context and close the record.
    pub(crate) fn publish(&mut self, key: &str, value: Value, via: ResolvedVia) {
        if let Err(err) = self.local.write(key, value.clone()) {
            warn!("failed to publish namespace for '{}': {}", key, err);
        }
        if let Some(record) = self.registry.get_mut(key) {
            record.namespace = Some(value);
            record.loaded = true;
            record.resolved_via = Some(via);
            debug!("module '{}' resolved via {:?}", key, via);
        }
        self.registry.mark_solved(key);
    }

    /// Resolve one declared dependency to its argument value.
    pub(crate) fn resolve_arg(&self, dep: &DepSpec, handle: &ResolverHandle) -> Value {
        if dep.key == REQUIRE_PATH {
            return Value::Resolver(handle.clone());
        }

        if let Some(record) = self.registry.get(&dep.key) {
            if record.loaded {
                let base = record.namespace.clone().unwrap_or(Value::Null);
                let locally = record
                    .resolved_via
                    .map(ResolvedVia::is_local_instantiation)
                    .unwrap_or(false);
                if dep.pull.is_empty() || !locally {
                    return base;
                }
                return match base.read_path(&dep.pull) {
                    Ok(value) => value,
                    Err(err) => {
                        debug!("argument extraction from '{}' failed: {}", dep.key, err);
                        Value::Null
                    }
                };
            }
        }

        let Some(base) = self.lookup_value(&dep.key) else {
            debug!("dependency '{}' unresolvable at argument time", dep.key);
            return Value::Null;
        };
        if dep.pull.is_empty() {
            base
        } else {
            match base.read_path(&dep.pull) {
                Ok(value) => value,
                Err(err) => {
                    debug!("argument extraction from '{}' failed: {}", dep.key, err);
                    Value::Null
                }
            }
        }
    }

    /// Lookup-order context read: host first, then local.
    pub(crate) fn lookup_value(&self, path: &str) -> Option<Value> {
        self.host
            .read(path)
            .ok()
            .or_else(|| self.local.read(path).ok())
    }

    /// Locate an undefined record in the contexts: local first, then host,
    /// extracting the awaited segments from the located base. When the key
    /// itself never appears, a non-empty wait chain is read as a root-level
    /// path instead.
    fn locate_external(&self, key: &str, wait_for: &[String]) -> Option<(Value, ResolvedVia)> {
        let base = self
            .local
            .read(key)
            .ok()
            .map(|value| (value, ResolvedVia::LocalContext))
            .or_else(|| {
                self.host
                    .read(key)
                    .ok()
                    .map(|value| (value, ResolvedVia::HostContext))
            });

        match base {
            Some((base, via)) => {
                if wait_for.is_empty() {
                    Some((base, via))
                } else {
                    base.read_path(wait_for).ok().map(|value| (value, via))
                }
            }
            None if !wait_for.is_empty() => self
                .local
                .root()
                .read_path(wait_for)
                .ok()
                .map(|value| (value, ResolvedVia::LocalContext))
                .or_else(|| {
                    self.host
                        .root()
                        .read_path(wait_for)
                        .ok()
                        .map(|value| (value, ResolvedVia::HostContext))
                }),
            None => None,
        }
    }

    fn mark_fail(&mut self, key: &str, tick: &mut TickCtx) {
        if tick.failed.insert(key.to_string()) {
            if let Some(record) = self.registry.get_mut(key) {
                record.fails += 1;
                debug!("module '{}' unsatisfied (attempt {})", key, record.fails);
            }
        }
    }
}
