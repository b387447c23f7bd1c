//! # quiver
//!
//! Dynamic dependency-graph resolver: units are registered incrementally
//! (named or anonymous, in any order, with forward references), the engine
//! discovers when each unit's dependencies are satisfied, instantiates it
//! exactly once, publishes the result under a hierarchical namespace, and
//! notifies dependents. Units that stay starved past a failure threshold
//! escalate to an external acquisition collaborator.
//!
//! ```
//! use quiver::{Definition, Resolver, ResolverConfig, Value};
//!
//! let resolver = Resolver::new(ResolverConfig::immediate());
//!
//! resolver.define(Definition::named("greeting").value(Value::from("hello")));
//! resolver.define(
//!     Definition::named("app")
//!         .dependency("greeting")
//!         .factory(|ns, deps| {
//!             ns.set("message", deps[0].clone());
//!             None
//!         }),
//! );
//!
//! let app = resolver.lookup("app").expect("app is loaded");
//! assert_eq!(app.get("message"), Some(Value::from("hello")));
//! ```
//!
//! Engines are explicit instances configured through [`ResolverConfig`]:
//! deferred mode ticks on a spawned tokio task with Fibonacci backoff between
//! ticks, immediate mode resolves synchronously at every definition.

pub mod acquire;
pub mod config;
pub mod engine;
pub mod namespace;
pub mod registry;

#[cfg(feature = "http-acquire")]
pub use acquire::HttpAcquirer;
pub use acquire::{AcquireError, AcquiredSource, DenyAcquirer, FsAcquirer, ResourceAcquirer};
pub use config::{ConfigError, ResolverConfig, ScheduleMode};
pub use engine::{
    Definition, PendingModule, Resolver, ResolverBuilder, ResolverHandle, ResolverStatus,
};
pub use namespace::{Context, LookupError, Value};
pub use registry::record::{Body, DepSpec, Factory, ResolvedVia};
pub use registry::REQUIRE_PATH;
