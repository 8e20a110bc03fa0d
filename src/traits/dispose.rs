//! Disposal trait for managed objects that own their teardown.

/// Trait for synchronous teardown of a managed object.
///
/// Implement this for objects that know how to release their own resources
/// (flushing buffers, closing connections) and build their factory with
/// [`FnFactory::dispose_on_destroy`](crate::FnFactory::dispose_on_destroy);
/// the store then calls `dispose` exactly once when the owning scope ends or
/// is evicted.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{Dispose, FnFactory, ObjectStore, Context};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Connection {
///     closed: Arc<AtomicBool>,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
/// let factory = FnFactory::new(move |_| Connection { closed: flag.clone() })
///     .dispose_on_destroy()
///     .into_arc();
///
/// let store = ObjectStore::new();
/// store.get_or_create(&factory, Context::empty()).unwrap();
/// store.destroy_all();
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release the object's resources.
    fn dispose(&self);
}
