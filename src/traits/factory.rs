//! The factory capability and its closure-based implementation.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::BoxError;
use crate::key::FactoryIdentity;
use crate::traits::Dispose;

/// A managed object as stored by the cache.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Capability that creates and destroys one kind of managed object.
///
/// The cache never introspects a factory beyond these four methods. The
/// store key is derived from [`stable_id`](Factory::stable_id) when present,
/// otherwise from [`type_name`](Factory::type_name).
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{Factory, Instance, Context, BoxError, ObjectStore};
/// use std::sync::Arc;
///
/// struct Greeter;
///
/// impl Factory for Greeter {
///     fn create(&self, _ctx: &Context) -> Result<Instance, BoxError> {
///         Ok(Arc::new(String::from("hello")))
///     }
///
///     fn stable_id(&self) -> Option<&str> {
///         Some("greeter")
///     }
/// }
///
/// let store = ObjectStore::new();
/// let factory: Arc<dyn Factory> = Arc::new(Greeter);
/// let greeting = store.get_or_create_typed::<String>(&factory, Context::empty()).unwrap();
/// assert_eq!(greeting.as_str(), "hello");
/// ```
pub trait Factory: Send + Sync {
    /// Creates a new instance. Called at most once per identity per store.
    fn create(&self, ctx: &Context) -> Result<Instance, BoxError>;

    /// Tears an instance down. Called exactly once per stored instance.
    fn destroy(&self, instance: &Instance, ctx: &Context) -> Result<(), BoxError> {
        let _ = (instance, ctx);
        Ok(())
    }

    /// Identity that stays valid across process restarts and passivation.
    fn stable_id(&self) -> Option<&str> {
        None
    }

    /// Process-local fallback identity.
    fn type_name(&self) -> Option<&'static str> {
        Some(type_name::<Self>())
    }
}

/// Supplies a factory for an identity that has none bound.
///
/// Instances restored from a passivated store carry no factory. A store
/// consults its resolver when such an instance must be torn down before any
/// caller rebound it. Any `Fn(&FactoryIdentity) -> Option<Arc<dyn Factory>>`
/// closure is a resolver.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{Context, FactoryIdentity, FactoryResolver, FnFactory, ObjectStore};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// static CLOSED: AtomicBool = AtomicBool::new(false);
///
/// let factory = FnFactory::new(|_| 1u8)
///     .with_stable_id("conn")
///     .on_destroy(|_, _| {
///         CLOSED.store(true, Ordering::SeqCst);
///         Ok(())
///     })
///     .into_arc();
///
/// let store = ObjectStore::new();
/// store.get_or_create(&factory, Context::empty()).unwrap();
///
/// let registry = factory.clone();
/// let resolver = move |identity: &FactoryIdentity| (identity.as_str() == "conn").then(|| registry.clone());
/// assert!(resolver.factory_for(&FactoryIdentity::from("other")).is_none());
///
/// let restored = ObjectStore::activate(store.passivate()).with_factory_resolver(Arc::new(resolver));
/// assert!(restored.destroy_all().is_clean());
/// assert!(CLOSED.load(Ordering::SeqCst));
/// ```
pub trait FactoryResolver: Send + Sync {
    /// Factory able to destroy the object named `identity`, if known.
    fn factory_for(&self, identity: &FactoryIdentity) -> Option<Arc<dyn Factory>>;
}

impl<F> FactoryResolver for F
where
    F: Fn(&FactoryIdentity) -> Option<Arc<dyn Factory>> + Send + Sync,
{
    fn factory_for(&self, identity: &FactoryIdentity) -> Option<Arc<dyn Factory>> {
        self(identity)
    }
}

type CreateFn<T> = dyn Fn(&Context) -> Result<T, BoxError> + Send + Sync;
type DestroyFn<T> = dyn Fn(&T, &Context) -> Result<(), BoxError> + Send + Sync;

/// [`Factory`] built from closures producing values of type `T`.
///
/// Without a stable id its identity is the type name of `T`, so two
/// closure factories producing the same type name the same logical object.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{FnFactory, ObjectStore, Context};
///
/// struct Wizard { step: u32 }
///
/// let factory = FnFactory::new(|_| Wizard { step: 1 })
///     .with_stable_id("checkout-wizard")
///     .on_destroy(|wizard, _ctx| {
///         assert_eq!(wizard.step, 1);
///         Ok(())
///     })
///     .into_arc();
///
/// let store = ObjectStore::new();
/// let wizard = store.get_or_create_typed::<Wizard>(&factory, Context::empty()).unwrap();
/// assert_eq!(wizard.step, 1);
/// assert!(store.destroy_all().is_clean());
/// ```
pub struct FnFactory<T> {
    create: Box<CreateFn<T>>,
    destroy: Option<Box<DestroyFn<T>>>,
    stable_id: Option<String>,
}

impl<T: Send + Sync + 'static> FnFactory<T> {
    /// Factory from an infallible constructor.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&Context) -> T + Send + Sync + 'static,
    {
        Self::fallible(move |ctx| Ok(create(ctx)))
    }

    /// Factory from a constructor that may fail.
    pub fn fallible<F>(create: F) -> Self
    where
        F: Fn(&Context) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            create: Box::new(create),
            destroy: None,
            stable_id: None,
        }
    }

    /// Sets the teardown callback.
    pub fn on_destroy<D>(mut self, destroy: D) -> Self
    where
        D: Fn(&T, &Context) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.destroy = Some(Box::new(destroy));
        self
    }

    /// Declares a stable identity.
    pub fn with_stable_id(mut self, id: impl Into<String>) -> Self {
        self.stable_id = Some(id.into());
        self
    }

    /// Erases the factory for use with a store.
    pub fn into_arc(self) -> Arc<dyn Factory> {
        Arc::new(self)
    }
}

impl<T: Dispose> FnFactory<T> {
    /// Tears instances down through their [`Dispose`] implementation.
    pub fn dispose_on_destroy(self) -> Self {
        self.on_destroy(|value: &T, _ctx| {
            value.dispose();
            Ok(())
        })
    }
}

impl<T: Send + Sync + 'static> Factory for FnFactory<T> {
    fn create(&self, ctx: &Context) -> Result<Instance, BoxError> {
        let value = (self.create)(ctx)?;
        Ok(Arc::new(value))
    }

    fn destroy(&self, instance: &Instance, ctx: &Context) -> Result<(), BoxError> {
        let Some(destroy) = &self.destroy else {
            return Ok(());
        };
        let value = (**instance).downcast_ref::<T>().ok_or_else(|| {
            BoxError::from(format!("stored instance is not a {}", type_name::<T>()))
        })?;
        destroy(value, ctx)
    }

    fn stable_id(&self) -> Option<&str> {
        self.stable_id.as_deref()
    }

    fn type_name(&self) -> Option<&'static str> {
        Some(type_name::<T>())
    }
}

impl<T> fmt::Debug for FnFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory")
            .field("type", &type_name::<T>())
            .field("stable_id", &self.stable_id)
            .field("has_destroy", &self.destroy.is_some())
            .finish()
    }
}
