//! Factory identity resolution and memoization.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::internal::FastMap;
use crate::key::{FactoryIdentity, IdentitySource};
use crate::traits::Factory;
use crate::{CacheError, CacheResult};

/// Memoizes resolved factory identities so repeated lookups share one
/// allocation per identity.
///
/// The cache is injected into stores and directories rather than living in a
/// global, so an embedding host can [`clear`](IdentityCache::clear) it at its
/// own reload boundary and tests can start from an empty cache.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{IdentityCache, IdentitySource, FnFactory};
///
/// struct Cart;
///
/// let cache = IdentityCache::new();
/// let stable = FnFactory::new(|_| Cart).with_stable_id("cart");
/// let by_type = FnFactory::new(|_| Cart);
///
/// let (id, source) = cache.resolve_with_source(&stable).unwrap();
/// assert_eq!(id.as_str(), "cart");
/// assert_eq!(source, IdentitySource::Stable);
///
/// let (id, source) = cache.resolve_with_source(&by_type).unwrap();
/// assert!(id.as_str().ends_with("Cart"));
/// assert_eq!(source, IdentitySource::TypeName);
/// ```
#[derive(Debug, Default)]
pub struct IdentityCache {
    stable: RwLock<FastMap<Box<str>, FactoryIdentity>>,
    by_type: RwLock<FastMap<&'static str, FactoryIdentity>>,
}

impl IdentityCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache ready for sharing between stores.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Resolves the identity of `factory`.
    ///
    /// A non-empty [`Factory::stable_id`] wins; otherwise the
    /// [`Factory::type_name`] is used. Fails with
    /// [`CacheError::IdentityUnavailable`] when neither is usable.
    pub fn resolve(&self, factory: &dyn Factory) -> CacheResult<FactoryIdentity> {
        self.resolve_with_source(factory).map(|(identity, _)| identity)
    }

    /// Resolves the identity of `factory` and reports where it came from.
    pub fn resolve_with_source(
        &self,
        factory: &dyn Factory,
    ) -> CacheResult<(FactoryIdentity, IdentitySource)> {
        if let Some(id) = factory.stable_id().filter(|id| !id.is_empty()) {
            return Ok((self.intern_stable(id), IdentitySource::Stable));
        }

        match factory.type_name().filter(|name| !name.is_empty()) {
            Some(name) => Ok((self.intern_type(name), IdentitySource::TypeName)),
            None => Err(CacheError::IdentityUnavailable(
                "factory declares no stable id and no type name".to_string(),
            )),
        }
    }

    fn intern_stable(&self, id: &str) -> FactoryIdentity {
        if let Some(identity) = self.stable.read().get(id) {
            return identity.clone();
        }
        self.stable
            .write()
            .entry(Box::from(id))
            .or_insert_with(|| FactoryIdentity::from(id))
            .clone()
    }

    fn intern_type(&self, name: &'static str) -> FactoryIdentity {
        if let Some(identity) = self.by_type.read().get(name) {
            return identity.clone();
        }
        self.by_type
            .write()
            .entry(name)
            .or_insert_with(|| FactoryIdentity::from(name))
            .clone()
    }

    /// Number of memoized identities.
    pub fn len(&self) -> usize {
        self.stable.read().len() + self.by_type.read().len()
    }

    /// Whether nothing has been memoized yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every memoized identity.
    pub fn clear(&self) {
        self.stable.write().clear();
        self.by_type.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, Context, Instance};

    struct Anonymous;

    impl Factory for Anonymous {
        fn create(&self, _ctx: &Context) -> Result<Instance, BoxError> {
            Ok(Arc::new(()))
        }

        fn type_name(&self) -> Option<&'static str> {
            None
        }
    }

    struct EmptyStable;

    impl Factory for EmptyStable {
        fn create(&self, _ctx: &Context) -> Result<Instance, BoxError> {
            Ok(Arc::new(()))
        }

        fn stable_id(&self) -> Option<&str> {
            Some("")
        }
    }

    #[test]
    fn test_unavailable_identity() {
        let cache = IdentityCache::new();
        assert!(matches!(
            cache.resolve(&Anonymous),
            Err(CacheError::IdentityUnavailable(_))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_empty_stable_id_falls_back_to_type_name() {
        let cache = IdentityCache::new();
        let (identity, source) = cache.resolve_with_source(&EmptyStable).unwrap();
        assert_eq!(source, IdentitySource::TypeName);
        assert!(identity.as_str().ends_with("EmptyStable"));
    }

    #[test]
    fn test_memoization_and_clear() {
        let cache = IdentityCache::new();
        let a = cache.resolve(&EmptyStable).unwrap();
        let b = cache.resolve(&EmptyStable).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.resolve(&EmptyStable).unwrap(), a);
    }
}
