//! Namespace value model
//!
//! Values published into resolver namespaces. Containers (`Object`, `List`)
//! are shared by reference: cloning a `Value` clones the handle, so every
//! consumer of a published namespace observes the same underlying object and
//! factories can populate their namespace by side effect.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::engine::ResolverHandle;
use crate::namespace::context::LookupError;

/// Shared list container.
pub type SharedList = Arc<RwLock<Vec<Value>>>;

/// Shared object container, keyed by member name.
pub type SharedMap = Arc<RwLock<BTreeMap<String, Value>>>;

/// A value held in a resolver namespace.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(SharedList),
    Object(SharedMap),
    /// Handle to the owning resolver, published under the reserved path.
    Resolver(ResolverHandle),
}

impl Value {
    /// Create a fresh empty object container.
    pub fn object() -> Value {
        Value::Object(Arc::new(RwLock::new(BTreeMap::new())))
    }

    /// Create a fresh empty list container.
    pub fn list() -> Value {
        Value::List(Arc::new(RwLock::new(Vec::new())))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for the container variants that can hold members.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Read a member of a container. Lists accept numeric segments.
    pub fn get(&self, member: &str) -> Option<Value> {
        match self {
            Value::Object(map) => {
                let map = map.read().unwrap_or_else(PoisonError::into_inner);
                map.get(member).cloned()
            }
            Value::List(items) => {
                let index: usize = member.parse().ok()?;
                let items = items.read().unwrap_or_else(PoisonError::into_inner);
                items.get(index).cloned()
            }
            _ => None,
        }
    }

    /// Assign a member of a container. Returns false when `self` cannot hold
    /// members; list assignment only replaces existing indices.
    pub fn set(&self, member: &str, value: Value) -> bool {
        match self {
            Value::Object(map) => {
                let mut map = map.write().unwrap_or_else(PoisonError::into_inner);
                map.insert(member.to_string(), value);
                true
            }
            Value::List(items) => {
                let Ok(index) = member.parse::<usize>() else {
                    return false;
                };
                let mut items = items.write().unwrap_or_else(PoisonError::into_inner);
                let len = items.len();
                match items.get_mut(index) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None if index == len => {
                        items.push(value);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// Walk a chain of member segments starting from this value.
    pub fn read_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Value, LookupError> {
        if segments.is_empty() {
            return Err(LookupError::EmptyPath);
        }
        let path = || {
            segments
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join("/")
        };
        let mut current = self.clone();
        for segment in segments {
            let segment = segment.as_ref();
            if !current.is_container() {
                return Err(LookupError::NotAContainer {
                    path: path(),
                    segment: segment.to_string(),
                });
            }
            current = current.get(segment).ok_or_else(|| LookupError::Missing {
                path: path(),
                segment: segment.to_string(),
            })?;
        }
        Ok(current)
    }

    /// Identity comparison for shared containers.
    pub fn same_identity(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => Arc::ptr_eq(x, y),
            (Value::List(x), Value::List(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Build a value tree from JSON. Objects and lists become fresh shared
    /// containers; numbers become `Int` when they fit, `Float` otherwise.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                let converted: Vec<Value> = items.iter().map(Value::from_json).collect();
                Value::List(Arc::new(RwLock::new(converted)))
            }
            serde_json::Value::Object(map) => {
                let converted: BTreeMap<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect();
                Value::Object(Arc::new(RwLock::new(converted)))
            }
        }
    }

    /// Render this value as JSON. Resolver handles have no JSON form and
    /// render as null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                let items = items.read().unwrap_or_else(PoisonError::into_inner);
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => {
                let map = map.read().unwrap_or_else(PoisonError::into_inner);
                let rendered = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                serde_json::Value::Object(rendered)
            }
            Value::Resolver(_) => serde_json::Value::Null,
        }
    }
}

/// Scalars compare structurally; containers and resolver handles compare by
/// identity, matching the sharing semantics of published namespaces.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Resolver(a), Value::Resolver(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Text(s)
    }
}
