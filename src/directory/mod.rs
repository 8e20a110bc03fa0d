//! Scope directories: bounded, least-recently-used registries of object
//! stores.
//!
//! A [`ScopeDirectory`] maps each [`ScopeId`] to one [`ObjectStore`]. Every
//! entry goes `ABSENT -> ACTIVE -> EVICTED | ENDED`; the last two are
//! terminal, and touching the same id afterwards creates a brand-new store.
//! The number of active entries never exceeds the configured maximum: the
//! call that would exceed it evicts the least recently used other entry and
//! tears its store down before returning.

mod builder;
mod recency;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ConfigProvider;
use crate::internal::FastMap;
use crate::key::ScopeId;
use crate::store::{ObjectStore, PassivatedStore, StoreShared, TeardownReport};
use crate::CacheResult;

use self::recency::RecencyIndex;

pub use builder::ScopeDirectoryBuilder;

/// Everything needed to create directories that behave alike.
#[derive(Clone)]
pub(crate) struct DirectorySettings {
    pub(crate) max_active_scopes: NonZeroUsize,
    pub(crate) shared: StoreShared,
}

struct DirectoryInner {
    stores: FastMap<ScopeId, Arc<ObjectStore>>,
    recency: RecencyIndex<ScopeId>,
}

/// Bounded registry of per-scope object stores.
///
/// One directory typically serves one session. All bookkeeping is guarded by
/// a single lock per directory; store teardown triggered by eviction or
/// [`end`](ScopeDirectory::end) runs on the calling thread after that lock is
/// released. There is no background thread.
///
/// Dropping a directory ends every scope still active in it.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{ScopeDirectory, FnFactory, Context};
/// use std::sync::Arc;
///
/// let directory = ScopeDirectory::new(1).unwrap();
/// let factory = FnFactory::new(|_| String::from("form state"))
///     .with_stable_id("form")
///     .into_arc();
///
/// let view_1 = directory.store_for("view-1");
/// let original = view_1.get_or_create(&factory, Context::empty()).unwrap();
///
/// // Capacity 1: touching a second view evicts the first.
/// directory.store_for("view-2");
/// assert!(!directory.contains("view-1"));
/// assert!(view_1.is_empty());
///
/// // Returning to view-1 yields a fresh store and a fresh object.
/// let again = directory
///     .store_for("view-1")
///     .get_or_create(&factory, Context::empty())
///     .unwrap();
/// assert!(!Arc::ptr_eq(&original, &again));
/// ```
pub struct ScopeDirectory {
    inner: Mutex<DirectoryInner>,
    settings: DirectorySettings,
}

/// Contents of a passivated [`ScopeDirectory`], least recently used scope
/// first.
#[derive(Debug, Clone, Default)]
pub struct DirectoryPassivation {
    scopes: Vec<(ScopeId, PassivatedStore)>,
}

impl DirectoryPassivation {
    /// Rebuilds passivated contents the host deserialized.
    pub fn from_scopes(scopes: impl IntoIterator<Item = (ScopeId, PassivatedStore)>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
        }
    }

    pub fn scopes(&self) -> &[(ScopeId, PassivatedStore)] {
        &self.scopes
    }

    pub fn into_scopes(self) -> Vec<(ScopeId, PassivatedStore)> {
        self.scopes
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl ScopeDirectory {
    /// Creates a directory holding at most `max_active_scopes` scopes.
    ///
    /// Fails with [`CacheError::CapacityMisconfigured`](crate::CacheError::CapacityMisconfigured)
    /// when `max_active_scopes` is zero.
    pub fn new(max_active_scopes: usize) -> CacheResult<Self> {
        Self::builder().max_active_scopes(max_active_scopes).build()
    }

    /// Creates a directory whose capacity is resolved from `provider`.
    pub fn from_config(provider: &ConfigProvider) -> CacheResult<Self> {
        Self::builder().config_provider(provider)?.build()
    }

    pub fn builder() -> ScopeDirectoryBuilder {
        ScopeDirectoryBuilder::new()
    }

    pub(crate) fn from_settings(settings: DirectorySettings) -> Self {
        Self {
            inner: Mutex::new(DirectoryInner {
                stores: FastMap::default(),
                recency: RecencyIndex::new(),
            }),
            settings,
        }
    }

    /// Maximum number of simultaneously active scopes.
    pub fn max_active_scopes(&self) -> usize {
        self.settings.max_active_scopes.get()
    }

    /// Returns the store for `scope`, creating it if absent, and marks the
    /// scope most recently used.
    ///
    /// Creating a scope beyond capacity evicts the least recently used other
    /// scope and tears its store down before this call returns.
    pub fn store_for(&self, scope: impl Into<ScopeId>) -> Arc<ObjectStore> {
        let scope = scope.into();
        let (store, evicted) = {
            let mut inner = self.inner.lock();
            if let Some(store) = inner.stores.get(&scope).cloned() {
                inner.recency.touch(&scope);
                return store;
            }

            let store = Arc::new(ObjectStore::with_shared(
                Some(scope.clone()),
                self.settings.shared.clone(),
            ));
            inner.stores.insert(scope.clone(), store.clone());
            inner.recency.touch(&scope);

            let mut evicted = Vec::new();
            while inner.stores.len() > self.max_active_scopes() {
                let Some(victim) = inner.recency.least_recent_except(&scope).cloned() else {
                    break;
                };
                inner.recency.remove(&victim);
                if let Some(victim_store) = inner.stores.remove(&victim) {
                    evicted.push((victim, victim_store));
                }
            }
            debug_assert_eq!(inner.recency.len(), inner.stores.len());
            (store, evicted)
        };

        self.settings.shared.observers.each(|o| o.scope_created(&scope));

        for (victim, victim_store) in evicted {
            tracing::debug!(
                evicted = %victim,
                admitted = %scope,
                max_active_scopes = self.max_active_scopes(),
                "evicting least recently used scope"
            );
            self.settings.shared.observers.each(|o| o.scope_evicted(&victim));
            let report = victim_store.retire();
            if !report.is_clean() {
                tracing::debug!(
                    evicted = %victim,
                    destroyed = report.destroyed,
                    failed = report.failures.len(),
                    "evicted scope torn down with failures"
                );
            }
        }

        store
    }

    /// Returns the store for `scope` without creating it or touching its
    /// recency.
    pub fn get(&self, scope: impl Into<ScopeId>) -> Option<Arc<ObjectStore>> {
        let scope: ScopeId = scope.into();
        self.inner.lock().stores.get(&scope).cloned()
    }

    pub fn contains(&self, scope: impl Into<ScopeId>) -> bool {
        let scope: ScopeId = scope.into();
        self.inner.lock().stores.contains_key(&scope)
    }

    /// Ends `scope`: removes it and tears its store down.
    ///
    /// Returns `None` without doing anything if the scope is not active,
    /// so redundant end signals are harmless.
    pub fn end(&self, scope: impl Into<ScopeId>) -> Option<TeardownReport> {
        let scope = scope.into();
        let store = {
            let mut inner = self.inner.lock();
            let store = inner.stores.remove(&scope)?;
            inner.recency.remove(&scope);
            store
        };

        self.settings.shared.observers.each(|o| o.scope_ended(&scope));
        Some(store.retire())
    }

    /// Ends every active scope, least recently used first.
    pub fn end_all(&self) -> TeardownReport {
        self.detach_all()
            .into_iter()
            .map(|(scope, store)| {
                self.settings.shared.observers.each(|o| o.scope_ended(&scope));
                store.retire()
            })
            .collect()
    }

    /// Number of active scopes.
    pub fn len(&self) -> usize {
        self.inner.lock().stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active scopes from least to most recently used.
    pub fn scope_ids(&self) -> Vec<ScopeId> {
        self.inner.lock().recency.iter().cloned().collect()
    }

    /// Detaches every scope without destroying anything, least recently
    /// used first.
    pub fn passivate(self) -> DirectoryPassivation {
        DirectoryPassivation::from_scopes(
            self.detach_all()
                .into_iter()
                .map(|(scope, store)| (scope, store.passivate())),
        )
    }

    /// Removes every scope, least recently used first, without tearing
    /// anything down.
    fn detach_all(&self) -> Vec<(ScopeId, Arc<ObjectStore>)> {
        let mut inner = self.inner.lock();
        let order = inner.recency.drain();
        let mut detached = Vec::with_capacity(order.len());
        for scope in order {
            if let Some(store) = inner.stores.remove(&scope) {
                detached.push((scope, store));
            }
        }
        detached
    }

    pub(crate) fn restore(&self, passivation: DirectoryPassivation) {
        for (scope, passivated) in passivation.into_scopes() {
            self.store_for(scope).restore(passivated);
        }
    }
}

impl Drop for ScopeDirectory {
    fn drop(&mut self) {
        let report = self.end_all();
        if !report.is_empty() {
            tracing::debug!(
                destroyed = report.destroyed,
                failed = report.failures.len(),
                "scope directory dropped with active scopes"
            );
        }
    }
}

impl fmt::Debug for ScopeDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeDirectory")
            .field("max_active_scopes", &self.max_active_scopes())
            .field("scopes", &self.scope_ids())
            .finish()
    }
}
