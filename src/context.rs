//! Creation contexts handed to factories.
//!
//! A [`Context`] travels with an instance from `create` to `destroy`. It is
//! not part of a passivated store, so a store that lost an instance's
//! original context asks its [`ContextFactory`] for a fresh one right before
//! teardown.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::FactoryIdentity;

/// Opaque value passed to [`Factory::create`](crate::Factory::create) and
/// [`Factory::destroy`](crate::Factory::destroy).
///
/// # Examples
///
/// ```
/// use ferrous_scopes::Context;
///
/// struct RequestInfo { user: &'static str }
///
/// let ctx = Context::new(RequestInfo { user: "ada" });
/// assert_eq!(ctx.get::<RequestInfo>().unwrap().user, "ada");
/// assert!(ctx.get::<u32>().is_none());
/// assert!(!ctx.is_rehydrated());
/// ```
#[derive(Clone, Default)]
pub struct Context {
    value: Option<Arc<dyn Any + Send + Sync>>,
    rehydrated: bool,
}

impl Context {
    /// A context carrying nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A context carrying `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// A context sharing an existing value.
    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            value: Some(value),
            rehydrated: false,
        }
    }

    /// Borrows the carried value if it is a `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.value.as_deref()?.downcast_ref::<T>()
    }

    /// Whether the context carries no value.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Whether this context was obtained from a [`ContextFactory`] because
    /// the original creation context was unavailable.
    pub fn is_rehydrated(&self) -> bool {
        self.rehydrated
    }

    pub(crate) fn into_rehydrated(mut self) -> Self {
        self.rehydrated = true;
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("empty", &self.is_empty())
            .field("rehydrated", &self.rehydrated)
            .finish()
    }
}

/// Supplies contexts for teardown when the creation context is gone.
///
/// Any `Fn(&FactoryIdentity) -> Context` closure is a context factory.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{Context, ContextFactory, FactoryIdentity};
///
/// let contexts = |identity: &FactoryIdentity| Context::new(identity.to_string());
/// let ctx = contexts.obtain(&FactoryIdentity::from("cart"));
/// assert_eq!(ctx.get::<String>().unwrap(), "cart");
/// ```
pub trait ContextFactory: Send + Sync {
    /// Obtains a context suitable for destroying the object named `identity`.
    fn obtain(&self, identity: &FactoryIdentity) -> Context;
}

impl<F> ContextFactory for F
where
    F: Fn(&FactoryIdentity) -> Context + Send + Sync,
{
    fn obtain(&self, identity: &FactoryIdentity) -> Context {
        self(identity)
    }
}

/// Context factory that always yields [`Context::empty`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyContextFactory;

impl ContextFactory for EmptyContextFactory {
    fn obtain(&self, _identity: &FactoryIdentity) -> Context {
        Context::empty()
    }
}
