//! Object stores: per-scope containers of managed objects.
//!
//! An [`ObjectStore`] maps each [`FactoryIdentity`] to at most one managed
//! instance. Creation is serialized per identity, so concurrent callers asking
//! for the same identity observe exactly one `create` call, while callers for
//! different identities never wait on each other. Teardown runs under its own
//! lock, separate from the creation path.

mod entry;
mod passivation;
mod report;

use std::any::{type_name, Any};
use std::cmp::Reverse;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::context::{Context, ContextFactory, EmptyContextFactory};
use crate::identity::IdentityCache;
use crate::internal::{guarded, FastMap};
use crate::key::{FactoryIdentity, IdentitySource, ScopeId};
use crate::observer::{CacheObserver, Observers};
use crate::traits::{Factory, FactoryResolver, Instance};
use crate::{CacheError, CacheResult};

use self::entry::{ManagedEntry, Slot};

pub use passivation::{PassivatedEntry, PassivatedStore};
pub use report::TeardownReport;

/// Collaborators shared by every store of one directory.
#[derive(Clone)]
pub(crate) struct StoreShared {
    pub(crate) identities: Arc<IdentityCache>,
    pub(crate) contexts: Arc<dyn ContextFactory>,
    pub(crate) factories: Option<Arc<dyn FactoryResolver>>,
    pub(crate) observers: Observers,
}

impl Default for StoreShared {
    fn default() -> Self {
        Self {
            identities: IdentityCache::shared(),
            contexts: Arc::new(EmptyContextFactory),
            factories: None,
            observers: Observers::default(),
        }
    }
}

/// Container of managed objects for one scope.
///
/// Stores handed out by a [`ScopeDirectory`](crate::ScopeDirectory) are torn
/// down by the directory. A standalone store is torn down only when
/// [`destroy_all`](ObjectStore::destroy_all) is called.
///
/// # Creation semantics
///
/// [`get_or_create`](ObjectStore::get_or_create) invokes `create` at most once
/// per identity: racing callers block on the identity's slot and receive the
/// winner's instance. A failed `create` stores nothing, and a later call tries
/// again.
///
/// # Teardown semantics
///
/// [`destroy_all`](ObjectStore::destroy_all) destroys every instance exactly
/// once, newest first, even when called concurrently from several threads.
/// Failures in one `destroy` never stop the others. A lookup racing a
/// teardown may still hand out an instance that is about to be destroyed.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{ObjectStore, FnFactory, Context};
/// use std::sync::Arc;
///
/// struct ShoppingCart { items: Vec<String> }
///
/// let factory = FnFactory::new(|_| ShoppingCart { items: Vec::new() })
///     .with_stable_id("cart")
///     .into_arc();
///
/// let store = ObjectStore::new();
/// let first = store.get_or_create(&factory, Context::empty()).unwrap();
/// let second = store.get_or_create(&factory, Context::empty()).unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
///
/// let report = store.destroy_all();
/// assert_eq!(report.destroyed, 1);
/// assert!(store.is_empty());
/// ```
pub struct ObjectStore {
    scope: Option<ScopeId>,
    slots: Mutex<FastMap<FactoryIdentity, Arc<Slot>>>,
    teardown: Mutex<()>,
    sequence: AtomicU64,
    retired: AtomicBool,
    shared: StoreShared,
}

impl ObjectStore {
    /// Creates an empty standalone store.
    pub fn new() -> Self {
        Self::with_shared(None, StoreShared::default())
    }

    /// Creates a store holding the given passivated contents. Restored
    /// entries get their factory back from the first
    /// [`get_or_create`](ObjectStore::get_or_create) or
    /// [`bind_factory`](ObjectStore::bind_factory) naming their identity.
    pub fn activate(passivated: PassivatedStore) -> Self {
        let store = Self::new();
        store.restore(passivated);
        store
    }

    pub(crate) fn with_shared(scope: Option<ScopeId>, shared: StoreShared) -> Self {
        Self {
            scope,
            slots: Mutex::new(FastMap::default()),
            teardown: Mutex::new(()),
            sequence: AtomicU64::new(1),
            retired: AtomicBool::new(false),
            shared,
        }
    }

    /// Uses `identities` to resolve factory identities.
    pub fn with_identity_cache(mut self, identities: Arc<IdentityCache>) -> Self {
        self.shared.identities = identities;
        self
    }

    /// Uses `contexts` when an instance must be destroyed without its
    /// creation context.
    pub fn with_context_factory(mut self, contexts: Arc<dyn ContextFactory>) -> Self {
        self.shared.contexts = contexts;
        self
    }

    /// Uses `factories` to tear down restored instances that were never
    /// rebound.
    pub fn with_factory_resolver(mut self, factories: Arc<dyn FactoryResolver>) -> Self {
        self.shared.factories = Some(factories);
        self
    }

    /// Adds a lifecycle observer.
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.shared.observers = self.shared.observers.with(observer);
        self
    }

    /// Scope this store belongs to, if it came from a directory.
    pub fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    /// Returns the instance for `factory`'s identity, creating it with
    /// `ctx` if absent.
    pub fn get_or_create(&self, factory: &Arc<dyn Factory>, ctx: Context) -> CacheResult<Instance> {
        let (identity, source) = self.shared.identities.resolve_with_source(factory.as_ref())?;
        if source == IdentitySource::TypeName {
            tracing::trace!(identity = %identity, "using process-local type name identity");
        }
        self.get_or_create_with_identity(identity, factory, ctx)
    }

    /// Like [`get_or_create`](ObjectStore::get_or_create) with a
    /// caller-supplied identity.
    pub fn get_or_create_with_identity(
        &self,
        identity: impl Into<FactoryIdentity>,
        factory: &Arc<dyn Factory>,
        ctx: Context,
    ) -> CacheResult<Instance> {
        let identity = identity.into();
        let mut ctx = Some(ctx);

        loop {
            let slot = self.slot_for(&identity);
            let mut created = false;
            let result = slot.cell.get_or_try_init(|| {
                created = true;
                self.create_entry(&identity, factory, ctx.take().unwrap_or_default())
            });

            // A failed create leaves the slot empty and in place: the next
            // waiter on the same cell retries, and later callers queue on it.
            let entry = result?;

            if created {
                self.settle_created(&identity, &slot, entry);
                return Ok(entry.instance.clone());
            }

            // Torn down under our feet; drop the stale slot and create anew.
            if entry.is_destroyed() {
                self.discard_slot(&identity, &slot);
                continue;
            }

            if entry.bind_if_unbound(factory) {
                tracing::debug!(
                    scope = self.scope_label(),
                    identity = %identity,
                    "factory rebound to restored instance"
                );
            }
            return Ok(entry.instance.clone());
        }
    }

    /// Typed [`get_or_create`](ObjectStore::get_or_create).
    pub fn get_or_create_typed<T: Any + Send + Sync>(
        &self,
        factory: &Arc<dyn Factory>,
        ctx: Context,
    ) -> CacheResult<Arc<T>> {
        let identity = self.shared.identities.resolve(factory.as_ref())?;
        let instance = self.get_or_create_with_identity(identity.clone(), factory, ctx)?;
        downcast(&identity, instance)
    }

    /// Looks up the instance for `factory`'s identity without creating it.
    pub fn get(&self, factory: &dyn Factory) -> CacheResult<Option<Instance>> {
        let identity = self.shared.identities.resolve(factory)?;
        Ok(self.get_by_identity(identity.as_str()))
    }

    /// Typed [`get`](ObjectStore::get).
    pub fn get_typed<T: Any + Send + Sync>(&self, factory: &dyn Factory) -> CacheResult<Option<Arc<T>>> {
        let identity = self.shared.identities.resolve(factory)?;
        self.get_by_identity(identity.as_str())
            .map(|instance| downcast(&identity, instance))
            .transpose()
    }

    /// Looks up an instance by identity alone.
    pub fn get_by_identity(&self, identity: &str) -> Option<Instance> {
        let slot = self.slots.lock().get(identity).cloned()?;
        slot.live().map(|entry| entry.instance.clone())
    }

    /// Whether a live instance exists for `identity`.
    pub fn contains(&self, identity: &str) -> bool {
        self.get_by_identity(identity).is_some()
    }

    /// Binds a fresh factory to a restored instance without creating
    /// anything. Returns whether an unbound instance was found.
    pub fn bind_factory(&self, factory: &Arc<dyn Factory>) -> CacheResult<bool> {
        let identity = self.shared.identities.resolve(factory.as_ref())?;
        let slot = self.slots.lock().get(&identity).cloned();
        Ok(slot
            .as_deref()
            .and_then(Slot::live)
            .is_some_and(|entry| entry.bind_if_unbound(factory)))
    }

    /// Identities of restored instances still waiting for a factory.
    pub fn unbound_identities(&self) -> Vec<FactoryIdentity> {
        self.live_entries()
            .into_iter()
            .filter(|(_, slot)| slot.live().is_some_and(|entry| !entry.is_bound()))
            .map(|(identity, _)| identity)
            .collect()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.live().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identities of live instances, oldest first.
    pub fn identities(&self) -> Vec<FactoryIdentity> {
        self.live_entries().into_iter().map(|(identity, _)| identity).collect()
    }

    /// Destroys every instance exactly once, newest first, and empties the
    /// store.
    ///
    /// Each `destroy` runs with the instance's creation context, or with one
    /// obtained from the store's [`ContextFactory`] when that context did not
    /// survive passivation. Errors and panics from `destroy` are logged,
    /// reported to observers and collected in the returned report; they never
    /// interrupt the teardown. A concurrent second call waits for the first
    /// and then finds nothing left to destroy.
    pub fn destroy_all(&self) -> TeardownReport {
        let _teardown = self.teardown.lock();
        let mut drained: Vec<(FactoryIdentity, Arc<Slot>)> = self.slots.lock().drain().collect();
        drained.sort_by_key(|(_, slot)| Reverse(slot.sequence()));

        let mut report = TeardownReport::default();
        for (identity, slot) in &drained {
            if let Some(entry) = slot.cell.get() {
                self.destroy_entry(identity, entry, &mut report);
            }
        }

        if !report.is_empty() {
            tracing::debug!(
                scope = self.scope_label(),
                destroyed = report.destroyed,
                failed = report.failures.len(),
                "object store torn down"
            );
        }
        report
    }

    /// Detaches every live instance without destroying it.
    ///
    /// The store is left empty; the returned contents can be handed to
    /// [`ObjectStore::activate`] or [`ObjectStore::restore`] elsewhere.
    pub fn passivate(&self) -> PassivatedStore {
        let _teardown = self.teardown.lock();
        let mut drained: Vec<(FactoryIdentity, Arc<Slot>)> = self.slots.lock().drain().collect();
        drained.sort_by_key(|(_, slot)| slot.sequence());

        PassivatedStore::from_entries(drained.into_iter().filter_map(|(identity, slot)| {
            // Claim the entry so nothing else destroys what was handed off.
            let entry = slot.live()?;
            entry.mark_destroyed().then(|| PassivatedEntry {
                identity,
                instance: entry.instance.clone(),
            })
        }))
    }

    /// Adds passivated contents to this store as unbound entries. Identities
    /// already present keep their current instance. Returns the number of
    /// entries restored.
    pub fn restore(&self, passivated: PassivatedStore) -> usize {
        let mut slots = self.slots.lock();
        let mut restored = 0;
        for PassivatedEntry { identity, instance } in passivated.into_entries() {
            if slots.get(&identity).is_some_and(|slot| slot.live().is_some()) {
                continue;
            }
            let entry = ManagedEntry::restored(instance, self.next_sequence());
            slots.insert(identity, Arc::new(Slot::holds(entry)));
            restored += 1;
        }
        restored
    }

    fn slot_for(&self, identity: &FactoryIdentity) -> Arc<Slot> {
        self.slots.lock().entry(identity.clone()).or_default().clone()
    }

    /// Removes `slot` from the map if it is still the slot for `identity`.
    fn discard_slot(&self, identity: &FactoryIdentity, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock();
        if slots.get(identity).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(identity);
        }
    }

    fn create_entry(&self, identity: &FactoryIdentity, factory: &Arc<dyn Factory>, ctx: Context) -> CacheResult<ManagedEntry> {
        let started = Instant::now();
        match guarded(|| factory.create(&ctx)) {
            Ok(instance) => {
                let elapsed = started.elapsed();
                self.shared
                    .observers
                    .each(|o| o.instance_created(self.scope.as_ref(), identity, elapsed));
                Ok(ManagedEntry::created(instance, self.next_sequence(), factory.clone(), ctx))
            }
            Err(message) => {
                tracing::debug!(
                    scope = self.scope_label(),
                    identity = %identity,
                    error = %message,
                    "instance creation failed"
                );
                self.shared
                    .observers
                    .each(|o| o.creation_failed(self.scope.as_ref(), identity, &message));
                Err(CacheError::CreationFailed {
                    identity: identity.to_string(),
                    message,
                })
            }
        }
    }

    /// Tears the store down for good. Instances created afterwards through
    /// a stale handle are destroyed as soon as they are created.
    pub(crate) fn retire(&self) -> TeardownReport {
        self.retired.store(true, Ordering::Release);
        self.destroy_all()
    }

    /// A teardown may have drained `slot` while its instance was being
    /// created. Put the slot back so the instance is not orphaned, or destroy
    /// the instance if a newer slot already took its place or the store was
    /// retired.
    fn settle_created(&self, identity: &FactoryIdentity, slot: &Arc<Slot>, entry: &ManagedEntry) {
        let orphaned = {
            let mut slots = self.slots.lock();
            let current = slots.get(identity).map(|current| Arc::ptr_eq(current, slot));
            if self.retired.load(Ordering::Acquire) {
                if current == Some(true) {
                    slots.remove(identity);
                }
                true
            } else {
                match current {
                    Some(ours) => !ours,
                    None => {
                        if !entry.is_destroyed() {
                            slots.insert(identity.clone(), slot.clone());
                        }
                        false
                    }
                }
            }
        };

        if orphaned {
            let mut report = TeardownReport::default();
            self.destroy_entry(identity, entry, &mut report);
        }
    }

    fn destroy_entry(&self, identity: &FactoryIdentity, entry: &ManagedEntry, report: &mut TeardownReport) {
        if !entry.mark_destroyed() {
            return;
        }

        let (factory, context) = entry.take_binding();
        let factory = match factory {
            Some(factory) => Ok(factory),
            None => self.resolve_unbound(identity),
        };
        let outcome = factory.and_then(|factory| {
            guarded(|| {
                let context = match context {
                    Some(context) => context,
                    None => self.shared.contexts.obtain(identity).into_rehydrated(),
                };
                factory.destroy(&entry.instance, &context)
            })
        });

        match outcome {
            Ok(()) => {
                report.destroyed += 1;
                self.shared
                    .observers
                    .each(|o| o.instance_destroyed(self.scope.as_ref(), identity));
            }
            Err(message) => {
                tracing::warn!(
                    scope = self.scope_label(),
                    identity = %identity,
                    error = %message,
                    "destroy failed; continuing teardown"
                );
                self.shared
                    .observers
                    .each(|o| o.destroy_failed(self.scope.as_ref(), identity, &message));
                report.failures.push(CacheError::DestroyFailed {
                    identity: identity.to_string(),
                    message,
                });
            }
        }
    }

    /// Factory for a restored instance nobody rebound, from the resolver.
    fn resolve_unbound(&self, identity: &FactoryIdentity) -> Result<Arc<dyn Factory>, String> {
        let Some(resolver) = &self.shared.factories else {
            return Err("no factory was bound after activation".to_string());
        };
        guarded(|| Ok(resolver.factory_for(identity)))?
            .ok_or_else(|| format!("no factory resolvable for {identity} after activation"))
    }

    fn live_entries(&self) -> Vec<(FactoryIdentity, Arc<Slot>)> {
        let mut entries: Vec<(FactoryIdentity, Arc<Slot>)> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.live().is_some())
            .map(|(identity, slot)| (identity.clone(), slot.clone()))
            .collect();
        entries.sort_by_key(|(_, slot)| slot.sequence());
        entries
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn scope_label(&self) -> &str {
        self.scope.as_ref().map_or("<unscoped>", ScopeId::as_str)
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStore")
            .field("scope", &self.scope)
            .field("identities", &self.identities())
            .finish()
    }
}

fn downcast<T: Any + Send + Sync>(identity: &FactoryIdentity, instance: Instance) -> CacheResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| CacheError::TypeMismatch {
        identity: identity.to_string(),
        expected: type_name::<T>(),
    })
}
