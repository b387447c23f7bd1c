//! Definition shapes
//!
//! Normalizes the ways a unit can be declared: named or anonymous, with a
//! structured dependency list or chained single specifiers, and with a
//! factory, a ready value, literal source text, or no body at all.

use std::sync::Arc;
use tracing::debug;

use crate::namespace::Value;
use crate::registry::record::{Body, DepSpec, Factory};

/// A normalized unit declaration, built with chained calls and handed to
/// [`Resolver::define`](crate::Resolver::define).
///
/// Malformed shapes are normalized rather than rejected: an empty key becomes
/// anonymous and unusable dependency specifiers are dropped.
pub struct Definition {
    key: Option<String>,
    deps: Vec<DepSpec>,
    body: Body,
}

impl Definition {
    /// Declare a unit under an explicit key.
    pub fn named(key: impl Into<String>) -> Definition {
        let key = key.into();
        Definition {
            key: if key.is_empty() { None } else { Some(key) },
            deps: Vec::new(),
            body: Body::Pending,
        }
    }

    /// Declare a unit with a synthesized key.
    pub fn anonymous() -> Definition {
        Definition {
            key: None,
            deps: Vec::new(),
            body: Body::Pending,
        }
    }

    /// Replace the dependency list with a structured sequence of specifiers.
    pub fn dependencies<I, S>(mut self, specs: I) -> Definition
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.deps.clear();
        for spec in specs {
            self = self.dependency(spec.as_ref());
        }
        self
    }

    /// Append one dependency specifier (the trailing-argument grammar).
    pub fn dependency(mut self, spec: &str) -> Definition {
        match DepSpec::parse(spec) {
            Some(dep) => self.deps.push(dep),
            None => debug!("dropping unusable dependency specifier '{}'", spec),
        }
        self
    }

    /// Instantiate by calling a factory once dependencies are satisfied.
    pub fn factory<F>(mut self, factory: F) -> Definition
    where
        F: Fn(&Value, &[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        self.body = Body::Factory(Arc::new(factory) as Factory);
        self
    }

    /// Publish a ready-made value.
    pub fn value(mut self, value: Value) -> Definition {
        self.body = Body::Value(value);
        self
    }

    /// Publish literal source text.
    pub fn source_text(mut self, text: impl Into<String>) -> Definition {
        self.body = Body::Text(text.into());
        self
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Vec<DepSpec>, Body) {
        (self.key, self.deps, self.body)
    }
}
