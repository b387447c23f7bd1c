use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use quiver::{
    AcquireError, AcquiredSource, Definition, Resolver, ResolverConfig, ResourceAcquirer,
    ScheduleMode, Value,
};

/// Acquirer that records every requested resource and serves canned text.
pub struct ScriptedAcquirer {
    responses: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedAcquirer {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_source(mut self, resource: &str, text: &str) -> Self {
        self.responses.insert(resource.to_string(), text.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ResourceAcquirer for ScriptedAcquirer {
    async fn acquire(&self, resource: &str) -> Result<AcquiredSource, AcquireError> {
        self.requests.lock().unwrap().push(resource.to_string());
        match self.responses.get(resource) {
            Some(text) => Ok(AcquiredSource::Text(text.clone())),
            None => Err(AcquireError::NotFound(resource.to_string())),
        }
    }
}

/// An immediate-mode resolver with default settings.
pub fn immediate_resolver() -> Resolver {
    Resolver::new(ResolverConfig::immediate())
}

/// A deferred-mode resolver ticking fast enough for tests.
pub fn deferred_resolver() -> Resolver {
    let mut config = ResolverConfig::default();
    config.mode = ScheduleMode::Deferred;
    config.backoff_unit_ms = 1;
    Resolver::new(config)
}

/// A factory definition that counts its invocations and publishes `value`.
pub fn counting_factory(key: &str, counter: Arc<AtomicUsize>, value: Value) -> Definition {
    Definition::named(key).factory(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(value.clone())
    })
}

/// Drive an immediate-mode resolver through extra ticks: each definition
/// re-arms the scheduler, and anonymous value units resolve instantly.
pub fn pump_ticks(resolver: &Resolver, ticks: usize) {
    for _ in 0..ticks {
        resolver.define(Definition::anonymous().value(Value::Null));
    }
}
