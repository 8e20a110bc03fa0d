//! Error types for the scoped-object cache.

use thiserror::Error;

/// Boxed error returned by caller-supplied factory callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Scoped-object cache errors
///
/// Callback failures are flattened to their messages so the error stays
/// `Clone` and can be carried in a [`TeardownReport`](crate::TeardownReport).
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{CacheError, ObjectStore, FnFactory, Context};
///
/// let store = ObjectStore::new();
/// let failing = FnFactory::<u32>::fallible(|_| Err("backend offline".into()))
///     .with_stable_id("counter")
///     .into_arc();
///
/// match store.get_or_create(&failing, Context::empty()) {
///     Err(CacheError::CreationFailed { identity, message }) => {
///         assert_eq!(identity, "counter");
///         assert_eq!(message, "backend offline");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Factory exposes neither a stable id nor a type name
    #[error("Factory identity unavailable: {0}")]
    IdentityUnavailable(String),
    /// Factory `create` returned an error or panicked
    #[error("Creation failed for {identity}: {message}")]
    CreationFailed { identity: String, message: String },
    /// Factory `destroy` returned an error or panicked (reported, never raised)
    #[error("Destroy failed for {identity}: {message}")]
    DestroyFailed { identity: String, message: String },
    /// Maximum active scope count is missing a usable positive value
    #[error("Capacity misconfigured: {0}")]
    CapacityMisconfigured(String),
    /// Stored instance is not of the requested type
    #[error("Type mismatch for {identity}: expected {expected}")]
    TypeMismatch {
        identity: String,
        expected: &'static str,
    },
    /// Configuration source could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Identity the error refers to, when it refers to a single managed object.
    pub fn identity(&self) -> Option<&str> {
        match self {
            CacheError::CreationFailed { identity, .. }
            | CacheError::DestroyFailed { identity, .. }
            | CacheError::TypeMismatch { identity, .. } => Some(identity),
            _ => None,
        }
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
