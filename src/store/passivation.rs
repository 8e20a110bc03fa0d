//! Detached store contents for relocating the owning container.
//!
//! Passivation drains a store without destroying anything. Only the
//! (identity, instance) pairs travel; factories and creation contexts do not.
//! Serializing the instances themselves is up to the host.

use crate::key::FactoryIdentity;
use crate::traits::Instance;

/// One passivated managed object.
#[derive(Clone)]
pub struct PassivatedEntry {
    pub identity: FactoryIdentity,
    pub instance: Instance,
}

impl std::fmt::Debug for PassivatedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassivatedEntry")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Contents of a passivated [`ObjectStore`](crate::ObjectStore), oldest
/// entry first.
///
/// # Examples
///
/// ```
/// use ferrous_scopes::{ObjectStore, FnFactory, Context};
///
/// let factory = FnFactory::new(|_| vec![1, 2, 3]).with_stable_id("numbers").into_arc();
/// let store = ObjectStore::new();
/// let before = store.get_or_create(&factory, Context::empty()).unwrap();
///
/// let passivated = store.passivate();
/// assert!(store.is_empty());
/// assert_eq!(passivated.identities(), vec!["numbers"]);
///
/// let restored = ObjectStore::activate(passivated);
/// let after = restored.get_or_create(&factory, Context::empty()).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&before, &after));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PassivatedStore {
    entries: Vec<PassivatedEntry>,
}

impl PassivatedStore {
    /// Rebuilds passivated contents from entries the host deserialized.
    pub fn from_entries(entries: impl IntoIterator<Item = PassivatedEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[PassivatedEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PassivatedEntry> {
        self.entries
    }

    /// Identities in creation order.
    pub fn identities(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.identity.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
