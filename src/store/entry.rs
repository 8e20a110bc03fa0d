//! Per-identity slots and the managed entries they hold.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::context::Context;
use crate::traits::{Factory, Instance};

/// Slot reserved for one identity. The once-cell serializes creation so only
/// one caller ever runs the factory for a given slot.
#[derive(Default)]
pub(crate) struct Slot {
    pub(crate) cell: OnceCell<ManagedEntry>,
}

impl Slot {
    pub(crate) fn holds(entry: ManagedEntry) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(entry);
        Self { cell }
    }

    /// Creation order of the held entry; empty slots sort first.
    pub(crate) fn sequence(&self) -> u64 {
        self.cell.get().map_or(0, |entry| entry.sequence)
    }

    /// The held entry, unless it has already been torn down.
    pub(crate) fn live(&self) -> Option<&ManagedEntry> {
        self.cell.get().filter(|entry| !entry.is_destroyed())
    }
}

struct Binding {
    factory: Option<Arc<dyn Factory>>,
    context: Option<Context>,
}

pub(crate) struct ManagedEntry {
    pub(crate) instance: Instance,
    pub(crate) sequence: u64,
    binding: Mutex<Binding>,
    destroyed: AtomicBool,
}

impl ManagedEntry {
    pub(crate) fn created(
        instance: Instance,
        sequence: u64,
        factory: Arc<dyn Factory>,
        context: Context,
    ) -> Self {
        Self::with_binding(instance, sequence, Some(factory), Some(context))
    }

    /// Entry restored from a passivated store: no factory, no context.
    pub(crate) fn restored(instance: Instance, sequence: u64) -> Self {
        Self::with_binding(instance, sequence, None, None)
    }

    fn with_binding(
        instance: Instance,
        sequence: u64,
        factory: Option<Arc<dyn Factory>>,
        context: Option<Context>,
    ) -> Self {
        Self {
            instance,
            sequence,
            binding: Mutex::new(Binding { factory, context }),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Binds `factory` if the entry has none. Returns whether it did.
    pub(crate) fn bind_if_unbound(&self, factory: &Arc<dyn Factory>) -> bool {
        let mut binding = self.binding.lock();
        if binding.factory.is_some() {
            return false;
        }
        binding.factory = Some(factory.clone());
        true
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.binding.lock().factory.is_some()
    }

    /// Factory and creation context to destroy with, taking the context.
    pub(crate) fn take_binding(&self) -> (Option<Arc<dyn Factory>>, Option<Context>) {
        let mut binding = self.binding.lock();
        (binding.factory.clone(), binding.context.take())
    }

    /// Marks the entry destroyed. Only the first caller gets `true`.
    pub(crate) fn mark_destroyed(&self) -> bool {
        !self.destroyed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}
