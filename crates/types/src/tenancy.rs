//! Tenancy scopes and the resolvers that compare them.
//!
//! A [`TenancyScope`] qualifies a catalog identifier with a partition and a
//! namespace. How two scopes compare depends on the deployment:
//!
//! - [`SingleTenant`]: every scope collapses to the default scope, so all scopes compare equal.
//! - [`MultiTenant`]: scopes compare by structural equality on `(partition, namespace)`.
//!
//! Callers never branch on the deployment mode. They hold an
//! `Arc<dyn TenancyResolver>` built from [`TenancyMode::resolver`].

use std::{fmt, sync::Arc};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Partition name every deployment starts with.
pub const DEFAULT_PARTITION: &str = "default";

/// Namespace name every partition starts with.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Partition and namespace qualifying a catalog identifier.
///
/// Empty components normalize to [`DEFAULT_PARTITION`] / [`DEFAULT_NAMESPACE`],
/// both at construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "ScopeParts")]
pub struct TenancyScope {
    partition: String,
    namespace: String,
}

impl TenancyScope {
    /// Creates a scope, substituting defaults for empty components.
    pub fn new(partition: impl Into<String>, namespace: impl Into<String>) -> Self {
        let partition = partition.into();
        let namespace = namespace.into();
        Self {
            partition: if partition.is_empty() { DEFAULT_PARTITION.to_string() } else { partition },
            namespace: if namespace.is_empty() { DEFAULT_NAMESPACE.to_string() } else { namespace },
        }
    }

    /// Returns the partition component.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Returns the namespace component.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether this is the `default/default` scope.
    pub fn is_default(&self) -> bool {
        self.partition == DEFAULT_PARTITION && self.namespace == DEFAULT_NAMESPACE
    }
}

impl Default for TenancyScope {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION, DEFAULT_NAMESPACE)
    }
}

impl fmt::Display for TenancyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.namespace)
    }
}

#[derive(Deserialize)]
struct ScopeParts {
    #[serde(default)]
    partition: String,
    #[serde(default)]
    namespace: String,
}

impl From<ScopeParts> for TenancyScope {
    fn from(parts: ScopeParts) -> Self {
        Self::new(parts.partition, parts.namespace)
    }
}

/// Resolves and compares tenancy scopes for one deployment mode.
///
/// `default_scope` is total: resolving the default never fails.
pub trait TenancyResolver: fmt::Debug + Send + Sync {
    /// Scope that unqualified identifiers belong to.
    fn default_scope(&self) -> TenancyScope;

    /// Maps a scope to the canonical value it denotes in this deployment.
    fn normalize(&self, scope: &TenancyScope) -> TenancyScope;

    /// Whether two scopes denote the same tenancy.
    fn equal(&self, a: &TenancyScope, b: &TenancyScope) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    /// Whether `scope` denotes the default tenancy.
    fn is_default(&self, scope: &TenancyScope) -> bool {
        self.equal(scope, &self.default_scope())
    }
}

/// Resolver for builds without partitions or namespaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleTenant;

impl TenancyResolver for SingleTenant {
    fn default_scope(&self) -> TenancyScope {
        TenancyScope::default()
    }

    fn normalize(&self, _scope: &TenancyScope) -> TenancyScope {
        TenancyScope::default()
    }

    fn equal(&self, _a: &TenancyScope, _b: &TenancyScope) -> bool {
        true
    }
}

/// Resolver for partitioned, namespaced deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiTenant;

impl TenancyResolver for MultiTenant {
    fn default_scope(&self) -> TenancyScope {
        TenancyScope::default()
    }

    fn normalize(&self, scope: &TenancyScope) -> TenancyScope {
        scope.clone()
    }

    fn equal(&self, a: &TenancyScope, b: &TenancyScope) -> bool {
        a == b
    }
}

/// Deployment tenancy mode, selected by configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TenancyMode {
    /// One implicit tenant; scopes are ignored.
    #[default]
    Single,
    /// Partitions and namespaces are significant.
    Multi,
}

impl TenancyMode {
    /// Builds the resolver for this mode.
    pub fn resolver(self) -> Arc<dyn TenancyResolver> {
        match self {
            Self::Single => Arc::new(SingleTenant),
            Self::Multi => Arc::new(MultiTenant),
        }
    }
}
