//! Builder for [`ScopeDirectory`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::config::{CacheConfig, ConfigProvider};
use crate::context::ContextFactory;
use crate::identity::IdentityCache;
use crate::observer::CacheObserver;
use crate::traits::FactoryResolver;
use crate::store::StoreShared;
use crate::{CacheError, CacheResult};

use super::{DirectoryPassivation, DirectorySettings, ScopeDirectory};

/// Configures and builds a [`ScopeDirectory`].
///
/// An explicit [`max_active_scopes`](ScopeDirectoryBuilder::max_active_scopes)
/// wins over a [`config`](ScopeDirectoryBuilder::config); without either the
/// default from [`CacheConfig::default`] applies.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{ScopeDirectory, IdentityCache, LoggingObserver, Context};
/// use std::sync::Arc;
///
/// let identities = IdentityCache::shared();
/// let directory = ScopeDirectory::builder()
///     .max_active_scopes(10)
///     .identity_cache(identities.clone())
///     .context_factory(Arc::new(|_: &ferrous_scopes::FactoryIdentity| Context::new("teardown")))
///     .observer(Arc::new(LoggingObserver::new()))
///     .build()
///     .unwrap();
///
/// assert_eq!(directory.max_active_scopes(), 10);
/// assert!(ScopeDirectory::builder().max_active_scopes(0).build().is_err());
/// ```
#[derive(Default)]
pub struct ScopeDirectoryBuilder {
    max_active_scopes: Option<usize>,
    config: Option<CacheConfig>,
    shared: StoreShared,
}

impl ScopeDirectoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of active scopes. Zero is rejected by
    /// [`build`](ScopeDirectoryBuilder::build).
    pub fn max_active_scopes(mut self, max_active_scopes: usize) -> Self {
        self.max_active_scopes = Some(max_active_scopes);
        self
    }

    /// Takes capacity from an already resolved configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Resolves capacity from `provider`.
    pub fn config_provider(self, provider: &ConfigProvider) -> CacheResult<Self> {
        Ok(self.config(CacheConfig::load(provider)?))
    }

    /// Shares an identity cache with other stores or directories.
    pub fn identity_cache(mut self, identities: Arc<IdentityCache>) -> Self {
        self.shared.identities = identities;
        self
    }

    /// Supplies teardown contexts for instances whose creation context is gone.
    pub fn context_factory(mut self, contexts: Arc<dyn ContextFactory>) -> Self {
        self.shared.contexts = contexts;
        self
    }

    /// Supplies factories for restored instances torn down before any
    /// caller rebound them.
    pub fn factory_resolver(mut self, factories: Arc<dyn FactoryResolver>) -> Self {
        self.shared.factories = Some(factories);
        self
    }

    /// Adds a lifecycle observer. May be called several times.
    pub fn observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.shared.observers = self.shared.observers.with(observer);
        self
    }

    pub(crate) fn settings(self) -> CacheResult<DirectorySettings> {
        let max_active_scopes = match (self.max_active_scopes, self.config) {
            (Some(max), _) => NonZeroUsize::new(max).ok_or_else(|| {
                CacheError::CapacityMisconfigured("max_active_scopes must be at least 1, got 0".to_string())
            })?,
            (None, Some(config)) => config.max_active_scopes,
            (None, None) => CacheConfig::default().max_active_scopes,
        };

        Ok(DirectorySettings {
            max_active_scopes,
            shared: self.shared,
        })
    }

    /// Builds the directory.
    pub fn build(self) -> CacheResult<ScopeDirectory> {
        let settings = self.settings()?;
        tracing::debug!(
            max_active_scopes = settings.max_active_scopes.get(),
            observers = settings.shared.observers.len(),
            "scope directory created"
        );
        Ok(ScopeDirectory::from_settings(settings))
    }

    /// Builds the directory and restores passivated scopes into it, oldest
    /// first. Scopes beyond capacity are evicted as they would be live.
    pub fn activate(self, passivation: DirectoryPassivation) -> CacheResult<ScopeDirectory> {
        let directory = self.build()?;
        directory.restore(passivation);
        Ok(directory)
    }
}
