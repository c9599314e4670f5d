//! Proptest strategies for catalog identities and entries.
//!
//! Generated scopes pass scope validation and generated IDs pass ID
//! validation with the default limits. Reserved IDs are mixed in on purpose
//! so properties exercise both sides of the classifier.
//!
//! # Usage
//!
//! ```no_run
//! use catalog_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(key in strategies::arb_service_key()) {
//!         // test invariant with a random service identity
//!     }
//! }
//! ```

use catalog_types::{
    CheckEntry, CheckKey, HealthStatus, InternalPath, RequestOrigin, ServiceEntry, ServiceKey,
    TenancyScope,
};
use proptest::prelude::*;

/// Generates a DNS-safe scope component, `"default"` about half of the time.
pub fn arb_scope_name() -> impl Strategy<Value = String> {
    prop_oneof![Just("default".to_string()), "[a-z][a-z0-9]{0,10}",]
}

/// Generates a tenancy scope, the default scope about a quarter of the time.
pub fn arb_scope() -> impl Strategy<Value = TenancyScope> {
    (arb_scope_name(), arb_scope_name())
        .prop_map(|(partition, namespace)| TenancyScope::new(partition, namespace))
}

/// Generates a printable ID that is never one of the reserved literals.
pub fn arb_plain_id() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_.-]{0,23}"
        .prop_filter("reserved literal", |id| id != "consul" && id != "serfHealth")
}

/// Generates an ID that is a reserved literal about a third of the time.
pub fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![
        2 => arb_plain_id(),
        1 => prop::sample::select(vec!["consul".to_string(), "serfHealth".to_string()]),
    ]
}

/// Generates a service identity.
pub fn arb_service_key() -> impl Strategy<Value = ServiceKey> {
    (arb_id(), arb_scope()).prop_map(|(id, scope)| ServiceKey::new(id, scope))
}

/// Generates a check identity.
pub fn arb_check_key() -> impl Strategy<Value = CheckKey> {
    (arb_id(), arb_scope()).prop_map(|(id, scope)| CheckKey::new(id, scope))
}

/// Generates a health status.
pub fn arb_health_status() -> impl Strategy<Value = HealthStatus> {
    prop_oneof![
        Just(HealthStatus::Passing),
        Just(HealthStatus::Warning),
        Just(HealthStatus::Critical),
    ]
}

/// Generates a request origin, a client about half of the time.
pub fn arb_origin() -> impl Strategy<Value = RequestOrigin> {
    prop_oneof![
        4 => Just(RequestOrigin::Client),
        1 => Just(RequestOrigin::Internal(InternalPath::SelfRegistration)),
        1 => Just(RequestOrigin::Internal(InternalPath::LivenessSynthesis)),
        1 => Just(RequestOrigin::Internal(InternalPath::NodeDeregistration)),
        1 => Just(RequestOrigin::Internal(InternalPath::AntiEntropy)),
    ]
}

/// Generates a service entry with a random identity, port and tags.
pub fn arb_service_entry() -> impl Strategy<Value = ServiceEntry> {
    (arb_service_key(), any::<u16>(), prop::collection::vec("[a-z]{1,8}", 0..3)).prop_map(
        |(key, port, tags)| {
            ServiceEntry::builder().name(key.id.as_str()).key(key).port(port).tags(tags).build()
        },
    )
}

/// Generates a node-level check entry on `node`.
pub fn arb_check_entry(node: &'static str) -> impl Strategy<Value = CheckEntry> {
    (arb_check_key(), arb_health_status()).prop_map(move |(key, status)| {
        CheckEntry::builder().name(key.id.as_str()).key(key).node(node).status(status).build()
    })
}
