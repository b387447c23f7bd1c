//! Module records
//!
//! One record exists per unit key, created on first mention (definition or
//! forward reference) and kept for the engine's lifetime.

use std::fmt;
use std::sync::Arc;

use crate::namespace::path;
use crate::namespace::Value;

/// Factory closure: receives the record's pre-created namespace object and the
/// resolved dependency values in declared order. Returning `Some` replaces the
/// published namespace.
pub type Factory = Arc<dyn Fn(&Value, &[Value]) -> Option<Value> + Send + Sync>;

/// A dependency specifier: the target key plus an optional chain of
/// sub-namespace segments to pull out of the target's resolved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepSpec {
    pub key: String,
    pub pull: Vec<String>,
}

impl DepSpec {
    /// Parse the `targetKey[:sub1[:sub2...]]` grammar. Returns `None` for
    /// specifiers with no usable key.
    pub fn parse(spec: &str) -> Option<DepSpec> {
        let (key, pull) = path::split_specifier(spec)?;
        Some(DepSpec { key, pull })
    }
}

/// How a unit's body is expressed.
#[derive(Clone)]
pub enum Body {
    /// Instantiated by calling a factory once dependencies are satisfied.
    Factory(Factory),
    /// A ready-made value, published as-is.
    Value(Value),
    /// Literal source text, published as a text value.
    Text(String),
    /// No body yet: the unit is expected from a context or acquisition.
    Pending,
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Factory(_) => f.write_str("Factory"),
            Body::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Body::Text(s) => f.debug_tuple("Text").field(&s.len()).finish(),
            Body::Pending => f.write_str("Pending"),
        }
    }
}

/// How a record came to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    /// Factory invocation here.
    Factory,
    /// Ready-made value body.
    Value,
    /// Source text body.
    Text,
    /// Located in the local context.
    LocalContext,
    /// Located in the host context.
    HostContext,
}

impl ResolvedVia {
    /// True when the record was instantiated here rather than located in a
    /// context. Argument-time pull chains only apply to these; located
    /// records publish already-extracted values.
    pub fn is_local_instantiation(self) -> bool {
        matches!(self, ResolvedVia::Factory | ResolvedVia::Value | ResolvedVia::Text)
    }
}

/// Registry entry for one unit key.
#[derive(Debug)]
pub struct ModuleRecord {
    pub key: String,
    /// Dependency specifiers exactly as declared, in order.
    pub declared_deps: Vec<DepSpec>,
    /// Subset of `declared_deps` still unsolved. Only ever shrinks.
    pub pending_deps: Vec<DepSpec>,
    /// Segments to extract from a located value before the record counts as
    /// resolved. Set when the record is created as a forward reference.
    pub wait_for: Vec<String>,
    pub body: Body,
    /// The published result once resolved.
    pub namespace: Option<Value>,
    /// Terminal once true.
    pub loaded: bool,
    pub resolved_via: Option<ResolvedVia>,
    /// Unsuccessful resolution attempts, at most one per tick.
    pub fails: u32,
    /// True once external acquisition has been dispatched. Sticky.
    pub fetched: bool,
}

impl ModuleRecord {
    /// A record freshly built from a definition.
    pub fn defined(key: String, declared_deps: Vec<DepSpec>, body: Body) -> ModuleRecord {
        ModuleRecord {
            key,
            declared_deps,
            pending_deps: Vec::new(),
            wait_for: Vec::new(),
            body,
            namespace: None,
            loaded: false,
            resolved_via: None,
            fails: 0,
            fetched: false,
        }
    }

    /// A placeholder for a forward-referenced key, carrying the pull chain of
    /// the specifier that first mentioned it.
    pub fn placeholder(key: &str, wait_for: Vec<String>) -> ModuleRecord {
        ModuleRecord {
            key: key.to_string(),
            declared_deps: Vec::new(),
            pending_deps: Vec::new(),
            wait_for,
            body: Body::Pending,
            namespace: None,
            loaded: false,
            resolved_via: None,
            fails: 0,
            fetched: false,
        }
    }
}
