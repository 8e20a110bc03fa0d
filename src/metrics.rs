//! Counters for scope and instance lifecycle events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::key::{FactoryIdentity, ScopeId};
use crate::observer::CacheObserver;

/// Observer that counts lifecycle events with atomic counters.
///
/// Register it with a directory builder and read a [`MetricsSnapshot`]
/// whenever needed.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{CacheMetrics, ScopeDirectory, FnFactory, Context};
/// use std::sync::Arc;
///
/// let metrics = Arc::new(CacheMetrics::new());
/// let directory = ScopeDirectory::builder()
///     .max_active_scopes(2)
///     .observer(metrics.clone())
///     .build()
///     .unwrap();
///
/// let factory = FnFactory::new(|_| 0u8).with_stable_id("byte").into_arc();
/// for view in ["a", "b", "c"] {
///     directory.store_for(view).get_or_create(&factory, Context::empty()).unwrap();
/// }
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.scopes_created, 3);
/// assert_eq!(snapshot.scopes_evicted, 1);
/// assert_eq!(snapshot.active_scopes(), 2);
/// assert_eq!(snapshot.instances_destroyed, 1);
/// ```
#[derive(Debug, Default)]
pub struct CacheMetrics {
    scopes_created: AtomicU64,
    scopes_evicted: AtomicU64,
    scopes_ended: AtomicU64,
    instances_created: AtomicU64,
    creation_failures: AtomicU64,
    instances_destroyed: AtomicU64,
    destroy_failures: AtomicU64,
    creation_nanos: AtomicU64,
}

/// Point-in-time copy of [`CacheMetrics`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub scopes_created: u64,
    pub scopes_evicted: u64,
    pub scopes_ended: u64,
    pub instances_created: u64,
    pub creation_failures: u64,
    pub instances_destroyed: u64,
    pub destroy_failures: u64,
    /// Total time spent inside successful `create` calls
    pub creation_time: Duration,
}

impl MetricsSnapshot {
    /// Scopes created and not yet evicted or ended.
    pub fn active_scopes(&self) -> u64 {
        self.scopes_created
            .saturating_sub(self.scopes_evicted + self.scopes_ended)
    }

    /// Instances created and not yet torn down (successfully or not).
    pub fn live_instances(&self) -> u64 {
        self.instances_created
            .saturating_sub(self.instances_destroyed + self.destroy_failures)
    }

    /// Average duration of a successful `create` call.
    pub fn average_creation_time(&self) -> Duration {
        if self.instances_created == 0 {
            return Duration::ZERO;
        }
        let nanos = self.creation_time.as_nanos() / u128::from(self.instances_created);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scopes_created: self.scopes_created.load(Ordering::Relaxed),
            scopes_evicted: self.scopes_evicted.load(Ordering::Relaxed),
            scopes_ended: self.scopes_ended.load(Ordering::Relaxed),
            instances_created: self.instances_created.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            instances_destroyed: self.instances_destroyed.load(Ordering::Relaxed),
            destroy_failures: self.destroy_failures.load(Ordering::Relaxed),
            creation_time: Duration::from_nanos(self.creation_nanos.load(Ordering::Relaxed)),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.scopes_created,
            &self.scopes_evicted,
            &self.scopes_ended,
            &self.instances_created,
            &self.creation_failures,
            &self.instances_destroyed,
            &self.destroy_failures,
            &self.creation_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl CacheObserver for CacheMetrics {
    fn scope_created(&self, _scope: &ScopeId) {
        self.scopes_created.fetch_add(1, Ordering::Relaxed);
    }

    fn scope_evicted(&self, _scope: &ScopeId) {
        self.scopes_evicted.fetch_add(1, Ordering::Relaxed);
    }

    fn scope_ended(&self, _scope: &ScopeId) {
        self.scopes_ended.fetch_add(1, Ordering::Relaxed);
    }

    fn instance_created(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity, duration: Duration) {
        self.instances_created.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.creation_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn creation_failed(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity, _message: &str) {
        self.creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn instance_destroyed(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity) {
        self.instances_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    fn destroy_failed(&self, _scope: Option<&ScopeId>, _identity: &FactoryIdentity, _message: &str) {
        self.destroy_failures.fetch_add(1, Ordering::Relaxed);
    }
}
