//! Hierarchical namespace contexts
//!
//! A context is a shared mutable tree of values rooted at an object. The
//! resolver publishes loaded modules into its local context and consults a
//! host context for externally provided namespaces.

use thiserror::Error;
use tracing::trace;

use crate::namespace::path;
use crate::namespace::value::Value;

/// Namespace traversal failure. A frequent, recoverable condition during
/// resolution; callers decide whether to retry, fall back, or surface it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("empty namespace path")]
    EmptyPath,

    #[error("segment '{segment}' not found in '{path}'")]
    Missing { path: String, segment: String },

    #[error("segment '{segment}' in '{path}' is not a container")]
    NotAContainer { path: String, segment: String },
}

/// A shared namespace tree. Cloning shares the root, so every clone observes
/// the same mutations.
#[derive(Debug, Clone)]
pub struct Context {
    root: Value,
}

impl Context {
    /// Create an empty context rooted at a fresh object.
    pub fn new() -> Context {
        Context {
            root: Value::object(),
        }
    }

    /// Wrap an existing value as a context root. Reads and writes against a
    /// non-container root fail with `NotAContainer`.
    pub fn from_value(root: Value) -> Context {
        Context { root }
    }

    /// The root value of this context.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Read a path from the root. Dotted notation splits on dots, anything
    /// else splits on slashes.
    pub fn read(&self, path: &str) -> Result<Value, LookupError> {
        if path.is_empty() {
            return Err(LookupError::EmptyPath);
        }
        let segments = path::read_segments(path);
        let result = self.root.read_path(&segments);
        if let Err(ref err) = result {
            trace!("context read miss at '{}': {}", path, err);
        }
        result
    }

    /// Write a value at a slash-separated path, creating intermediate objects
    /// as needed. Only a non-container intermediate is an error.
    pub fn write(&self, path: &str, value: Value) -> Result<(), LookupError> {
        if path.is_empty() {
            return Err(LookupError::EmptyPath);
        }
        let segments = path::write_segments(path);
        let (last, intermediates) = segments
            .split_last()
            .ok_or(LookupError::EmptyPath)?;

        let mut current = self.root.clone();
        for segment in intermediates {
            match current.get(segment) {
                Some(next) if next.is_container() => current = next,
                Some(_) => {
                    return Err(LookupError::NotAContainer {
                        path: path.to_string(),
                        segment: (*segment).to_string(),
                    });
                }
                None => {
                    let fresh = Value::object();
                    if !current.set(segment, fresh.clone()) {
                        return Err(LookupError::NotAContainer {
                            path: path.to_string(),
                            segment: (*segment).to_string(),
                        });
                    }
                    current = fresh;
                }
            }
        }

        if !current.set(last, value) {
            return Err(LookupError::NotAContainer {
                path: path.to_string(),
                segment: (*last).to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}
