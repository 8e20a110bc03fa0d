//! # ferrous-scopes
//!
//! Scoped object lifecycle cache for stateful, view-oriented servers.
//!
//! Hosts that render many logical views per user session need objects that
//! live exactly as long as a view: created lazily the first time a view asks
//! for them, shared by every request touching that view, and torn down
//! deterministically when the view goes away. This crate provides:
//!
//! - **Object stores**: per-scope maps from a factory identity to one managed
//!   instance, with at-most-once creation under concurrency
//! - **Scope directories**: bounded per-session registries of stores that
//!   evict the least recently used scope once capacity is exceeded
//! - **Deterministic teardown**: every instance is destroyed exactly once,
//!   newest first, and one failing `destroy` never stops the others
//! - **Passivation**: stores and directories can be detached and restored
//!   elsewhere, with factories re-bound lazily on first use
//! - **Observability**: `tracing` diagnostics, pluggable observers and
//!   counters
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_scopes::{ScopeDirectory, FnFactory, Context};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct FormState {
//!     fields: Vec<String>,
//! }
//!
//! static DESTROYED: AtomicUsize = AtomicUsize::new(0);
//!
//! let factory = FnFactory::new(|_| FormState { fields: Vec::new() })
//!     .with_stable_id("form-state")
//!     .on_destroy(|_, _| {
//!         DESTROYED.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .into_arc();
//!
//! let directory = ScopeDirectory::new(2).unwrap();
//!
//! // Two requests against the same view share one instance.
//! let a = directory.store_for("view-1").get_or_create_typed::<FormState>(&factory, Context::empty()).unwrap();
//! let b = directory.store_for("view-1").get_or_create_typed::<FormState>(&factory, Context::empty()).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert!(a.fields.is_empty());
//!
//! // Ending the view tears its objects down.
//! let report = directory.end("view-1").unwrap();
//! assert_eq!(report.destroyed, 1);
//! assert_eq!(DESTROYED.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Capacity
//!
//! A directory built with [`ScopeDirectory::from_config`] reads its capacity
//! from the first defined key of [`config::MAX_ACTIVE_SCOPES_KEYS`] and falls
//! back to [`config::DEFAULT_MAX_ACTIVE_SCOPES`]. A value that is not a
//! positive integer fails with [`CacheError::CapacityMisconfigured`].
//!
//! ## Features
//!
//! - `ahash`: faster hashing for internal maps
//! - `serde`: `Serialize`/`Deserialize` for keys and configuration values
//! - `config`: JSON configuration files
//! - `performance`: enables `ahash`

// Module declarations
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod identity;
pub mod key;
pub mod metrics;
pub mod observer;
pub mod registry;
pub mod store;
pub mod traits;

// Internal modules
mod internal;

// Re-export core types
pub use config::{
    CacheConfig, ConfigProvider, ConfigSource, ConfigValue, EnvironmentConfigSource, MemoryConfigSource,
};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use context::{Context, ContextFactory, EmptyContextFactory};
pub use directory::{DirectoryPassivation, ScopeDirectory, ScopeDirectoryBuilder};
pub use error::{BoxError, CacheError, CacheResult};
pub use identity::IdentityCache;
pub use key::{FactoryIdentity, IdentitySource, ScopeId, SessionId};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use observer::{CacheObserver, LoggingObserver};
pub use registry::SessionRegistry;
pub use store::{ObjectStore, PassivatedEntry, PassivatedStore, TeardownReport};
pub use traits::{Dispose, Factory, FactoryResolver, FnFactory, Instance};
