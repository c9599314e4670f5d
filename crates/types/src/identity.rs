//! Catalog identifiers and composite identity keys.
//!
//! A catalog entry is identified by its short ID together with its tenancy
//! scope. The same literal ID in two scopes names two unrelated entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tenancy::TenancyScope;

/// Generates a newtype wrapper around `String` for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<&str>` / `From<String>` conversions and `AsRef<str>`
/// - `Display` printing the raw identifier
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the raw identifier.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a service instance registered on a node.
    ServiceId
);

define_id!(
    /// Identifier of a health check registered on a node.
    CheckId
);

/// Composite identity of a catalog entry: short ID plus tenancy scope.
///
/// Two keys name the same entry iff both `id` and `scope` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey<I> {
    /// Short, human-chosen identifier.
    pub id: I,
    /// Partition and namespace the identifier lives in.
    #[serde(default)]
    pub scope: TenancyScope,
}

impl<I> IdentityKey<I> {
    /// Creates a key in the given scope.
    pub fn new(id: impl Into<I>, scope: TenancyScope) -> Self {
        Self { id: id.into(), scope }
    }

    /// Creates a key in the default scope.
    pub fn in_default_scope(id: impl Into<I>) -> Self {
        Self { id: id.into(), scope: TenancyScope::default() }
    }
}

impl<I: fmt::Display> fmt::Display for IdentityKey<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_default() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.id, self.scope)
        }
    }
}

/// Identity of a service entry.
pub type ServiceKey = IdentityKey<ServiceId>;

/// Identity of a check entry.
pub type CheckKey = IdentityKey<CheckId>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_same_id_different_scope_is_distinct() {
        let a = ServiceKey::in_default_scope("web");
        let b = ServiceKey::new("web", TenancyScope::new("team-a", "default"));
        assert_ne!(a, b);

        let set: HashSet<_> = [a.clone(), b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ServiceKey::in_default_scope("web").to_string(), "web");
        assert_eq!(
            CheckKey::new("disk", TenancyScope::new("p1", "ns1")).to_string(),
            "disk (p1/ns1)"
        );
    }

    #[test]
    fn test_key_serde_defaults_scope() {
        let key: ServiceKey = serde_json::from_str(r#"{"id":"web"}"#).unwrap();
        assert_eq!(key, ServiceKey::in_default_scope("web"));

        let json = serde_json::to_string(&CheckKey::in_default_scope("mem")).unwrap();
        assert_eq!(json, r#"{"id":"mem","scope":{"partition":"default","namespace":"default"}}"#);
    }

    #[test]
    fn test_keys_order_by_id_then_scope() {
        let mut keys = vec![
            ServiceKey::new("web", TenancyScope::new("b", "default")),
            ServiceKey::in_default_scope("api"),
            ServiceKey::new("web", TenancyScope::new("a", "default")),
        ];
        keys.sort();
        assert_eq!(keys[0].id.as_str(), "api");
        assert_eq!(keys[1].scope.partition(), "a");
        assert_eq!(keys[2].scope.partition(), "b");
    }
}
