//! Catalog records and request metadata.
//!
//! These are the values the catalog store holds per node and the origin tags
//! carried by every mutation request.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::identity::{CheckKey, ServiceId, ServiceKey};

/// A service instance registered on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct ServiceEntry {
    /// Service identity.
    pub key: ServiceKey,
    /// Logical service name (several instances may share it).
    #[builder(into)]
    pub name: String,
    /// Free-form tags.
    #[serde(default)]
    #[builder(default)]
    pub tags: Vec<String>,
    /// Address the instance listens on; empty means the node address.
    #[serde(default)]
    #[builder(default, into)]
    pub address: String,
    /// Port the instance listens on.
    #[serde(default)]
    #[builder(default)]
    pub port: u16,
    /// Arbitrary metadata.
    #[serde(default)]
    #[builder(default)]
    pub meta: BTreeMap<String, String>,
}

impl ServiceEntry {
    /// Whether two records describe the same registration.
    pub fn is_same(&self, other: &Self) -> bool {
        self == other
    }
}

/// Health state reported by a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The check succeeded.
    Passing,
    /// The check succeeded with a warning.
    Warning,
    /// The check failed. New checks start here until their first run.
    #[default]
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passing => "passing",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A health check registered on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct CheckEntry {
    /// Check identity.
    pub key: CheckKey,
    /// Node the check belongs to.
    #[builder(into)]
    pub node: String,
    /// Display name.
    #[builder(into)]
    pub name: String,
    /// Current status.
    #[serde(default)]
    #[builder(default)]
    pub status: HealthStatus,
    /// Output of the last run.
    #[serde(default)]
    #[builder(default, into)]
    pub output: String,
    /// Service this check is bound to; `None` for node-level checks.
    #[serde(default)]
    pub service_id: Option<ServiceId>,
}

impl CheckEntry {
    /// Whether two records describe the same registration.
    pub fn is_same(&self, other: &Self) -> bool {
        self == other
    }
}

/// Outcome of a store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// No entry existed under the key.
    Created,
    /// An existing entry was replaced.
    Updated,
}

/// Internal subsystems that legitimately own reserved entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalPath {
    /// The agent registering itself as a service.
    SelfRegistration,
    /// The liveness check synthesizer fed by membership events.
    LivenessSynthesis,
    /// Removal of a whole node (left, reaped, or operator-driven).
    NodeDeregistration,
    /// The anti-entropy syncer pushing local state.
    AntiEntropy,
}

impl fmt::Display for InternalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SelfRegistration => "self_registration",
            Self::LivenessSynthesis => "liveness_synthesis",
            Self::NodeDeregistration => "node_deregistration",
            Self::AntiEntropy => "anti_entropy",
        };
        f.write_str(s)
    }
}

/// Where a mutation request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOrigin {
    /// An ordinary client; subject to reserved-identity policy.
    Client,
    /// A trusted internal path; exempt from reserved-identity policy.
    Internal(InternalPath),
}

impl RequestOrigin {
    /// Whether the request bypasses reserved-identity policy.
    pub const fn is_trusted(self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Internal(path) => write!(f, "internal:{path}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::identity::CheckKey;

    #[test]
    fn test_only_internal_origins_are_trusted() {
        assert!(!RequestOrigin::Client.is_trusted());
        for path in [
            InternalPath::SelfRegistration,
            InternalPath::LivenessSynthesis,
            InternalPath::NodeDeregistration,
            InternalPath::AntiEntropy,
        ] {
            assert!(RequestOrigin::Internal(path).is_trusted());
        }
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(RequestOrigin::Client.to_string(), "client");
        assert_eq!(
            RequestOrigin::Internal(InternalPath::NodeDeregistration).to_string(),
            "internal:node_deregistration"
        );
    }

    #[test]
    fn test_service_builder_defaults() {
        let entry = ServiceEntry::builder()
            .key(ServiceKey::in_default_scope("web-1"))
            .name("web")
            .build();
        assert!(entry.tags.is_empty());
        assert_eq!(entry.port, 0);
        assert!(entry.is_same(&entry.clone()));

        let moved = ServiceEntry { port: 8080, ..entry.clone() };
        assert!(!entry.is_same(&moved));
    }

    #[test]
    fn test_check_defaults_to_critical() {
        let check = CheckEntry::builder()
            .key(CheckKey::in_default_scope("mem"))
            .node("node-1")
            .name("Memory")
            .build();
        assert_eq!(check.status, HealthStatus::Critical);
        assert_eq!(check.service_id, None);
    }

    #[test]
    fn test_health_status_serde() {
        assert_eq!(serde_json::to_string(&HealthStatus::Passing).unwrap(), r#""passing""#);
        let status: HealthStatus = serde_json::from_str(r#""warning""#).unwrap();
        assert_eq!(status, HealthStatus::Warning);
    }
}
