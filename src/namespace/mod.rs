//! Hierarchical namespaces
//!
//! The value model, path splitting rules, and the shared context trees the
//! resolver reads from and publishes into.

pub mod context;
pub mod path;
pub mod value;

pub use context::{Context, LookupError};
pub use value::{SharedList, SharedMap, Value};
