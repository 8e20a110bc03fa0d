//! Key types for object stores and scope directories.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! opaque_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(Arc<str>);

        impl $name {
            /// Creates a key from any string-like value.
            pub fn new(value: impl Into<Arc<str>>) -> Self {
                Self(value.into())
            }

            /// Returns the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), &*self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(Arc::from(value))
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(Arc::from(value))
            }
        }

        impl From<&$name> for $name {
            fn from(value: &$name) -> Self {
                value.clone()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_key! {
    /// Stable key naming "the same" logical managed object across creations.
    ///
    /// Two factories that resolve to the same identity share one entry in an
    /// [`ObjectStore`](crate::ObjectStore). The identity is independent of the
    /// factory's in-memory address, so it survives passivation when it was
    /// derived from a stable id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_scopes::FactoryIdentity;
    ///
    /// let id = FactoryIdentity::from("cart");
    /// assert_eq!(id.as_str(), "cart");
    /// assert_eq!(id.to_string(), "cart");
    /// ```
    FactoryIdentity
}

opaque_key! {
    /// Opaque token naming one logical scope (for example a view) inside a
    /// session, issued by the embedding framework.
    ScopeId
}

opaque_key! {
    /// Opaque token naming one session in a [`SessionRegistry`](crate::SessionRegistry).
    SessionId
}

/// Where a [`FactoryIdentity`] came from.
///
/// Only [`IdentitySource::Stable`] identities are guaranteed to mean the same
/// thing after the owning container is passivated and restored in another
/// process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentitySource {
    /// Declared by the factory through [`Factory::stable_id`](crate::Factory::stable_id)
    Stable,
    /// Derived from [`Factory::type_name`](crate::Factory::type_name); process-local
    TypeName,
}

impl IdentitySource {
    /// Whether identities from this source survive passivation.
    pub fn survives_passivation(self) -> bool {
        matches!(self, IdentitySource::Stable)
    }
}
