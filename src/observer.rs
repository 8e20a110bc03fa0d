//! Lifecycle observers for scopes and managed objects.
//!
//! Observers see every scope creation, eviction and end, and every instance
//! creation and teardown, including the failures the cache swallows. Calls
//! are made synchronously on the thread that triggered the event, so keep
//! implementations cheap.

use std::sync::Arc;
use std::time::Duration;

use crate::key::{FactoryIdentity, ScopeId};

/// Observer trait for cache lifecycle events.
///
/// Every method has a no-op default, so implementations only override what
/// they care about. `scope` is `None` for stores created outside a
/// [`ScopeDirectory`](crate::ScopeDirectory).
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{CacheObserver, ScopeDirectory, ScopeId};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct EvictionCounter(AtomicUsize);
///
/// impl CacheObserver for EvictionCounter {
///     fn scope_evicted(&self, _scope: &ScopeId) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let counter = Arc::new(EvictionCounter::default());
/// let directory = ScopeDirectory::builder()
///     .max_active_scopes(1)
///     .observer(counter.clone())
///     .build()
///     .unwrap();
///
/// directory.store_for("view-1");
/// directory.store_for("view-2");
/// assert_eq!(counter.0.load(Ordering::SeqCst), 1);
/// ```
pub trait CacheObserver: Send + Sync {
    /// A new scope entry and its store were created.
    fn scope_created(&self, _scope: &ScopeId) {}

    /// A scope was evicted to honor the capacity bound. Called before its
    /// store is torn down.
    fn scope_evicted(&self, _scope: &ScopeId) {}

    /// A scope was ended explicitly or by session teardown. Called before
    /// its store is torn down.
    fn scope_ended(&self, _scope: &ScopeId) {}

    /// A factory created and the store kept a new instance.
    fn instance_created(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity, _duration: Duration) {}

    /// A factory failed to create an instance; nothing was stored.
    fn creation_failed(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity, _message: &str) {}

    /// An instance was torn down successfully.
    fn instance_destroyed(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity) {}

    /// Tearing an instance down failed. The failure was swallowed.
    fn destroy_failed(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity, _message: &str) {}
}

/// Observer that emits every event through `tracing`.
///
/// Successful events are logged at `debug`, failures at `warn`.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{LoggingObserver, ScopeDirectory};
/// use std::sync::Arc;
///
/// let directory = ScopeDirectory::builder()
///     .observer(Arc::new(LoggingObserver::with_prefix("cart-service")))
///     .build()
///     .unwrap();
/// directory.store_for("view-1");
/// ```
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a logging observer with the default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-scopes".to_string(),
        }
    }

    /// Creates a logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn scope_label(scope: Option<&ScopeId>) -> &str {
    scope.map(ScopeId::as_str).unwrap_or("<unscoped>")
}

impl CacheObserver for LoggingObserver {
    fn scope_created(&self, scope: &ScopeId) {
        tracing::debug!(prefix = %self.prefix, scope = %scope, "scope created");
    }

    fn scope_evicted(&self, scope: &ScopeId) {
        tracing::debug!(prefix = %self.prefix, scope = %scope, "scope evicted");
    }

    fn scope_ended(&self, scope: &ScopeId) {
        tracing::debug!(prefix = %self.prefix, scope = %scope, "scope ended");
    }

    fn instance_created(&self, scope: Option<&ScopeId>, identity: &FactoryIdentity, duration: Duration) {
        tracing::debug!(
            prefix = %self.prefix,
            scope = scope_label(scope),
            identity = %identity,
            ?duration,
            "instance created"
        );
    }

    fn creation_failed(&self, scope: Option<&ScopeId>, identity: &FactoryIdentity, message: &str) {
        tracing::warn!(
            prefix = %self.prefix,
            scope = scope_label(scope),
            identity = %identity,
            error = message,
            "instance creation failed"
        );
    }

    fn instance_destroyed(&self, scope: Option<&ScopeId>, identity: &FactoryIdentity) {
        tracing::debug!(
            prefix = %self.prefix,
            scope = scope_label(scope),
            identity = %identity,
            "instance destroyed"
        );
    }

    fn destroy_failed(&self, scope: Option<&ScopeId>, identity: &FactoryIdentity, message: &str) {
        tracing::warn!(
            prefix = %self.prefix,
            scope = scope_label(scope),
            identity = %identity,
            error = message,
            "instance destroy failed"
        );
    }
}

/// Fan-out over the observers registered with a directory or store.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Arc<Vec<Arc<dyn CacheObserver>>>,
}

impl Observers {
    pub(crate) fn new(observers: Vec<Arc<dyn CacheObserver>>) -> Self {
        Self {
            observers: Arc::new(observers),
        }
    }

    pub(crate) fn with(&self, observer: Arc<dyn CacheObserver>) -> Self {
        let mut observers = self.observers.as_ref().clone();
        observers.push(observer);
        Self::new(observers)
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn each(&self, f: impl Fn(&dyn CacheObserver)) {
        for observer in self.observers.iter() {
            f(observer.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        created: AtomicUsize,
    }

    impl CacheObserver for Counting {
        fn scope_created(&self, _scope: &ScopeId) {
            self.created.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fan_out_reaches_every_observer() {
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        let observers = Observers::default().with(first.clone()).with(second.clone());
        assert_eq!(observers.len(), 2);

        let scope = ScopeId::from("view-1");
        observers.each(|o| o.scope_created(&scope));
        assert_eq!(first.created.load(Ordering::SeqCst), 1);
        assert_eq!(second.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_logging_observer_defaults() {
        let observer = LoggingObserver::default();
        assert_eq!(observer.prefix, "ferrous-scopes");
        // Emitting with no subscriber installed is a no-op.
        observer.destroy_failed(None, &FactoryIdentity::from("cart"), "closed");
    }
}
