//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Identifiers are
//! opaque strings owned by the remote cart store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use cartsync_core::define_id;
/// define_id!(ProductId);
/// define_id!(CartItemId);
///
/// let product_id = ProductId::new("p-1");
/// let item_id = CartItemId::new("p-1");
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = item_id;
/// assert_eq!(product_id.as_str(), item_id.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(CartItemId);

/// Identifier synthesized locally for an item the remote store has not
/// assigned an id to yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalItemId(Uuid);

impl LocalItemId {
    /// Generate a fresh random local identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl core::fmt::Display for LocalItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "local:{}", self.0)
    }
}

/// Identity of a cart item.
///
/// Server-assigned identifiers only exist once a reconciliation has seen the
/// item; until then the item carries a locally synthesized one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum ItemIdentity {
    /// Synthesized locally, not yet confirmed by the remote store.
    Unconfirmed(LocalItemId),
    /// Assigned by the remote store.
    Confirmed(CartItemId),
}

impl ItemIdentity {
    /// Create a fresh unconfirmed identity.
    #[must_use]
    pub fn unconfirmed() -> Self {
        Self::Unconfirmed(LocalItemId::generate())
    }

    /// Whether the remote store has assigned this identity.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// The server-assigned id, if confirmed.
    #[must_use]
    pub const fn confirmed_id(&self) -> Option<&CartItemId> {
        match self {
            Self::Confirmed(id) => Some(id),
            Self::Unconfirmed(_) => None,
        }
    }
}

impl core::fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unconfirmed(id) => id.fmt(f),
            Self::Confirmed(id) => id.fmt(f),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = ProductId::new("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");
        let back: ProductId = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(CartItemId::from("line-7").to_string(), "line-7");
    }

    #[test]
    fn test_unconfirmed_identity_is_unique() {
        let a = ItemIdentity::unconfirmed();
        let b = ItemIdentity::unconfirmed();
        assert_ne!(a, b);
        assert!(!a.is_confirmed());
        assert!(a.confirmed_id().is_none());
    }

    #[test]
    fn test_confirmed_identity() {
        let identity = ItemIdentity::Confirmed(CartItemId::new("srv-1"));
        assert!(identity.is_confirmed());
        assert_eq!(identity.confirmed_id().unwrap().as_str(), "srv-1");
        assert_eq!(identity.to_string(), "srv-1");
    }

    #[test]
    fn test_local_id_display_prefix() {
        let id = LocalItemId::generate();
        assert!(id.to_string().starts_with("local:"));
    }
}
