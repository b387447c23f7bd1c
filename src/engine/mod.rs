//! The resolution engine
//!
//! Public resolver API: unit definition, namespace lookup, completion
//! notification, introspection, and the scheduling that drives records from
//! pending to loaded. Engines are explicit instances; several can coexist in
//! one process without sharing anything.

pub mod backoff;
pub mod definition;
mod scheduler;
pub mod status;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

use crate::acquire::{AcquiredSource, DenyAcquirer, ResourceAcquirer};
use crate::config::{ResolverConfig, ScheduleMode};
use crate::namespace::{Context, Value};
use crate::registry::record::{Body, ModuleRecord, ResolvedVia};
use crate::registry::REQUIRE_PATH;

pub use definition::Definition;
pub use status::{PendingModule, ResolverStatus};

use scheduler::{EngineState, TickCtx, WorkItem};

pub(crate) struct ResolverShared {
    state: Mutex<EngineState>,
    config: ResolverConfig,
    acquirer: Arc<dyn ResourceAcquirer>,
}

impl ResolverShared {
    fn state_guard(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A dependency-graph resolution engine.
///
/// Cloning shares the engine; the last clone dropped retires any worker task.
#[derive(Clone)]
pub struct Resolver {
    shared: Arc<ResolverShared>,
}

/// Configures and builds a [`Resolver`].
pub struct ResolverBuilder {
    config: ResolverConfig,
    acquirer: Arc<dyn ResourceAcquirer>,
    local: Context,
    host: Context,
}

impl ResolverBuilder {
    pub fn config(mut self, config: ResolverConfig) -> ResolverBuilder {
        self.config = config;
        self
    }

    /// Install the acquisition collaborator consulted for starved records.
    pub fn acquirer(mut self, acquirer: Arc<dyn ResourceAcquirer>) -> ResolverBuilder {
        self.acquirer = acquirer;
        self
    }

    pub fn local_context(mut self, context: Context) -> ResolverBuilder {
        self.local = context;
        self
    }

    pub fn host_context(mut self, context: Context) -> ResolverBuilder {
        self.host = context;
        self
    }

    pub fn build(self) -> Resolver {
        let state = EngineState::new(&self.config, self.local, self.host);
        Resolver {
            shared: Arc::new(ResolverShared {
                state: Mutex::new(state),
                config: self.config,
                acquirer: self.acquirer,
            }),
        }
    }
}

impl Resolver {
    /// An engine with the given configuration and the refusing default
    /// acquirer.
    pub fn new(config: ResolverConfig) -> Resolver {
        Resolver::builder().config(config).build()
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder {
            config: ResolverConfig::default(),
            acquirer: Arc::new(DenyAcquirer),
            local: Context::new(),
            host: Context::new(),
        }
    }

    /// Register a unit. Never blocks on resolution and never errors;
    /// progress is observable through [`status`](Resolver::status), lookups,
    /// and the completion callback.
    pub fn define(&self, definition: Definition) {
        let (key, deps, body) = definition.into_parts();
        {
            let mut st = self.shared.state_guard();
            let key = match key {
                Some(key) => key,
                None => st.registry.next_anonymous_key(),
            };
            debug!("defining module '{}' with {} dependencies", key, deps.len());
            st.registry.install(ModuleRecord::defined(key, deps, body));
            st.completed = false;
        }
        self.arm();
    }

    /// The published namespace of a loaded unit, otherwise a direct context
    /// read (host first, then local). The reserved `require` path yields the
    /// engine's own handle.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        if key == REQUIRE_PATH {
            return Some(Value::Resolver(self.handle()));
        }
        let st = self.shared.state_guard();
        if let Some(record) = st.registry.get(key) {
            if record.loaded {
                return record.namespace.clone();
            }
        }
        st.lookup_value(key)
    }

    /// Register the completion callback. It fires exactly once, on the next
    /// transition to zero unresolved records, and is then cleared. A later
    /// registration waits for the next transition.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut st = self.shared.state_guard();
        if st.on_complete.is_some() {
            debug!("replacing pending completion callback");
        }
        st.on_complete = Some(Box::new(callback));
    }

    /// A weak handle to this engine, suitable for use inside factories.
    pub fn handle(&self) -> ResolverHandle {
        ResolverHandle {
            inner: Arc::downgrade(&self.shared),
        }
    }

    /// Snapshot of resolution progress.
    pub fn status(&self) -> ResolverStatus {
        let st = self.shared.state_guard();
        let pending = st
            .registry
            .records()
            .filter(|record| !record.loaded)
            .map(|record| PendingModule {
                key: record.key.clone(),
                missing: record
                    .pending_deps
                    .iter()
                    .map(|dep| dep.key.clone())
                    .collect(),
                fails: record.fails,
                fetched: record.fetched,
            })
            .collect();
        ResolverStatus {
            completed: st.completed,
            solved: st.registry.solved_count(),
            loaded: st.registry.loaded_count(),
            pending,
        }
    }

    /// The context loaded units are published into.
    pub fn local_context(&self) -> Context {
        self.shared.state_guard().local.clone()
    }

    pub fn set_local_context(&self, context: Context) {
        self.shared.state_guard().local = context;
        self.arm();
    }

    pub fn set_host_context(&self, context: Context) {
        self.shared.state_guard().host = context;
        self.arm();
    }

    /// Request scheduling. Immediate mode ticks in-line unless a tick is
    /// already running; deferred mode ensures a worker task is live.
    fn arm(&self) {
        match self.shared.config.mode {
            ScheduleMode::Immediate => {
                {
                    let st = self.shared.state_guard();
                    if st.traversing {
                        return;
                    }
                }
                self.run_tick();
            }
            ScheduleMode::Deferred => {
                {
                    let mut st = self.shared.state_guard();
                    if st.worker_armed {
                        return;
                    }
                    st.worker_armed = true;
                }
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(worker_loop(Arc::downgrade(&self.shared)));
                    }
                    Err(_) => {
                        warn!("deferred scheduling without a tokio runtime; ticking inline once");
                        self.shared.state_guard().worker_armed = false;
                        self.run_tick();
                    }
                }
            }
        }
    }

    /// One full tick: fixed-point planning passes with factory execution and
    /// acquisition dispatch between them. Returns the number of records still
    /// unresolved.
    fn run_tick(&self) -> usize {
        let config = &self.shared.config;
        let handle = self.handle();
        {
            let mut st = self.shared.state_guard();
            if st.traversing {
                return st.registry.unresolved_count();
            }
            st.traversing = true;
        }

        let mut tick = TickCtx::default();
        let mut passes = 0u32;
        loop {
            passes += 1;
            let outcome = {
                let mut st = self.shared.state_guard();
                st.plan_pass(config, &handle, &mut tick)
            };

            let mut job_progress = false;
            for job in outcome.jobs {
                match job {
                    WorkItem::CallFactory {
                        key,
                        factory,
                        namespace,
                        args,
                    } => {
                        debug!("instantiating module '{}'", key);
                        let produced = factory(&namespace, &args);
                        let value = produced.unwrap_or(namespace);
                        self.shared
                            .state_guard()
                            .publish(&key, value, ResolvedVia::Factory);
                        job_progress = true;
                    }
                    WorkItem::Acquire { key, resource } => {
                        if self.dispatch_acquisition(&key, &resource) {
                            job_progress = true;
                        }
                    }
                }
            }

            if !(outcome.progressed || job_progress) {
                break;
            }
            if passes >= config.max_passes_per_tick {
                warn!(
                    "resolution tick stopped after {} passes without reaching a fixed point",
                    passes
                );
                break;
            }
        }

        let callback;
        let unresolved;
        {
            let mut st = self.shared.state_guard();
            st.traversing = false;
            unresolved = st.registry.unresolved_count();
            if unresolved == 0 && !st.completed {
                st.completed = true;
                callback = st.on_complete.take();
                info!(
                    "resolution complete: {} modules loaded",
                    st.registry.loaded_count()
                );
            } else {
                callback = None;
            }
        }
        if let Some(callback) = callback {
            callback();
        }
        unresolved
    }

    /// Hand a starved record to the acquisition collaborator. Returns true
    /// when the result landed synchronously.
    fn dispatch_acquisition(&self, key: &str, resource: &str) -> bool {
        info!("module '{}' starved; acquiring '{}'", key, resource);
        match self.shared.config.mode {
            ScheduleMode::Immediate => self.acquire_blocking(key, resource),
            ScheduleMode::Deferred => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let weak = Arc::downgrade(&self.shared);
                    let acquirer = Arc::clone(&self.shared.acquirer);
                    let key = key.to_string();
                    let resource = resource.to_string();
                    handle.spawn(async move {
                        match acquirer.acquire(&resource).await {
                            Ok(source) => {
                                if let Some(shared) = weak.upgrade() {
                                    let resolver = Resolver { shared };
                                    resolver.install_acquired(&key, source);
                                    resolver.arm();
                                }
                            }
                            Err(err) => {
                                warn!("acquisition of '{}' failed: {}", resource, err);
                            }
                        }
                    });
                    false
                }
                Err(_) => self.acquire_blocking(key, resource),
            },
        }
    }

    fn acquire_blocking(&self, key: &str, resource: &str) -> bool {
        match futures::executor::block_on(self.shared.acquirer.acquire(resource)) {
            Ok(source) => {
                self.install_acquired(key, source);
                true
            }
            Err(err) => {
                warn!("acquisition of '{}' failed: {}", resource, err);
                false
            }
        }
    }

    /// Store acquired content as the record's body. Stale results for records
    /// redefined since dispatch are discarded.
    fn install_acquired(&self, key: &str, source: AcquiredSource) {
        let mut st = self.shared.state_guard();
        let Some(record) = st.registry.get_mut(key) else {
            return;
        };
        if !record.fetched || !matches!(record.body, Body::Pending) {
            debug!("discarding stale acquisition result for '{}'", key);
            return;
        }
        match source {
            AcquiredSource::Text(text) => {
                debug!("acquired {} bytes of source for '{}'", text.len(), key);
                record.body = Body::Text(text);
            }
            AcquiredSource::Exports(value) => {
                debug!("acquired evaluated exports for '{}'", key);
                record.body = Body::Value(value);
            }
        }
        st.completed = false;
    }
}

impl Default for Resolver {
    fn default() -> Resolver {
        Resolver::builder().build()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.state_guard();
        f.debug_struct("Resolver")
            .field("completed", &st.completed)
            .field("unresolved", &st.registry.unresolved_count())
            .finish()
    }
}

/// Deferred-mode worker: upgrade, tick, sleep, repeat. The weak reference is
/// re-upgraded every turn so dropping the engine retires the worker; the
/// worker also retires once resolution is quiescent.
async fn worker_loop(weak: Weak<ResolverShared>) {
    loop {
        let delay = match weak.upgrade() {
            Some(shared) => shared.state_guard().backoff.next_delay(),
            None => return,
        };
        tokio::time::sleep(delay).await;

        let Some(shared) = weak.upgrade() else {
            return;
        };
        let resolver = Resolver { shared };
        resolver.run_tick();

        // Exit check and worker_armed reset must be atomic, or a definition
        // arriving between them would see an armed worker that is gone.
        let mut st = resolver.shared.state_guard();
        if st.registry.unresolved_count() == 0 {
            st.worker_armed = false;
            debug!("resolution quiescent; scheduler worker retiring");
            return;
        }
    }
}

/// Weak, cloneable handle to an engine. This is the value behind the reserved
/// `require` path and the tool factories use for re-entrant definition and
/// dynamic lookup.
#[derive(Clone)]
pub struct ResolverHandle {
    inner: Weak<ResolverShared>,
}

impl ResolverHandle {
    /// The engine, if it is still alive.
    pub fn upgrade(&self) -> Option<Resolver> {
        self.inner.upgrade().map(|shared| Resolver { shared })
    }

    /// Lookup through the live engine. `None` when the engine is gone or the
    /// key is unresolvable.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        self.upgrade()?.lookup(key)
    }

    /// Define through the live engine. Returns false when the engine is gone.
    pub fn define(&self, definition: Definition) -> bool {
        match self.upgrade() {
            Some(resolver) => {
                resolver.define(definition);
                true
            }
            None => false,
        }
    }

    /// A handle attached to no engine; every operation reports the engine
    /// gone.
    pub(crate) fn detached() -> ResolverHandle {
        ResolverHandle { inner: Weak::new() }
    }
}

impl fmt::Debug for ResolverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl PartialEq for ResolverHandle {
    fn eq(&self, other: &ResolverHandle) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}
