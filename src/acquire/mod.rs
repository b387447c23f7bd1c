//! External source acquisition
//!
//! When a record stays starved past the failure threshold, the engine derives
//! a resource identifier from its key and delegates fetching to a
//! collaborator behind this seam. How the bytes move (filesystem, HTTP,
//! something else entirely) is none of the engine's business.

pub mod fs;
#[cfg(feature = "http-acquire")]
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ResolverConfig;
use crate::namespace::Value;

pub use fs::FsAcquirer;
#[cfg(feature = "http-acquire")]
pub use http::HttpAcquirer;

/// What an acquisition produced.
#[derive(Debug, Clone)]
pub enum AcquiredSource {
    /// Literal source text; published as a text value.
    Text(String),
    /// An already-evaluated export object.
    Exports(Value),
}

/// Acquisition failures. A failed acquisition leaves the record permanently
/// pending; the engine never retries.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("acquisition refused: {0}")]
    Refused(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("i/o error reading '{resource}': {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error for '{resource}': {detail}")]
    Transport { resource: String, detail: String },
}

/// Collaborator interface for fetching a unit's definition from an external
/// source. Synchronous implementations simply return a ready value.
#[async_trait]
pub trait ResourceAcquirer: Send + Sync {
    async fn acquire(&self, resource: &str) -> Result<AcquiredSource, AcquireError>;
}

/// Default collaborator: refuses every request, reducing escalation to the
/// logged-failure path.
#[derive(Debug, Default)]
pub struct DenyAcquirer;

#[async_trait]
impl ResourceAcquirer for DenyAcquirer {
    async fn acquire(&self, resource: &str) -> Result<AcquiredSource, AcquireError> {
        Err(AcquireError::Refused(format!(
            "no acquirer configured for '{}'",
            resource
        )))
    }
}

/// Derive the resource identifier for a key: the configured source root
/// joined as a plain prefix, plus the source extension when the key does not
/// already carry it. The cache token is left to collaborators.
pub fn resource_id(key: &str, config: &ResolverConfig) -> String {
    let suffix = format!(".{}", config.source_extension);
    if config.source_extension.is_empty() || key.ends_with(&suffix) {
        format!("{}{}", config.source_root, key)
    } else {
        format!("{}{}{}", config.source_root, key, suffix)
    }
}
