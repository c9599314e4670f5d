//! Reserved catalog identities and their classification.
//!
//! Two identities belong to the catalog itself rather than to its clients:
//!
//! - the self-registration service (`consul`), the agent's own service record on server nodes;
//! - the liveness check (`serfHealth`), synthesized from membership events.
//!
//! Both are reserved only in the default tenancy scope. The same literal ID in
//! another partition or namespace is an ordinary user-owned entry.

use std::sync::Arc;

use crate::{
    identity::{CheckKey, ServiceKey},
    tenancy::{TenancyResolver, TenancyScope},
};

static BUILTIN: ReservedIdentitySet = ReservedIdentitySet {
    self_service_id: "consul",
    self_service_name: "consul",
    liveness_check_id: "serfHealth",
    liveness_check_name: "Serf Health Status",
    liveness_alive_output: "Agent alive and reachable",
    liveness_failed_output: "Agent not live or unreachable",
};

/// Well-known sentinel identifiers owned by the catalog.
///
/// Fixed at build time and identical on every node. Obtain it through
/// [`ReservedIdentitySet::builtin`] or [`ReservedIdentityClassifier::reserved`].
#[derive(Debug, PartialEq, Eq)]
pub struct ReservedIdentitySet {
    self_service_id: &'static str,
    self_service_name: &'static str,
    liveness_check_id: &'static str,
    liveness_check_name: &'static str,
    liveness_alive_output: &'static str,
    liveness_failed_output: &'static str,
}

impl ReservedIdentitySet {
    /// Returns the process-wide reserved identity set.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// ID of the self-registration service.
    pub const fn self_service_id(&self) -> &'static str {
        self.self_service_id
    }

    /// Service name of the self-registration service.
    pub const fn self_service_name(&self) -> &'static str {
        self.self_service_name
    }

    /// ID of the membership-derived liveness check.
    pub const fn liveness_check_id(&self) -> &'static str {
        self.liveness_check_id
    }

    /// Display name of the liveness check.
    pub const fn liveness_check_name(&self) -> &'static str {
        self.liveness_check_name
    }

    /// Check output recorded while the member is alive.
    pub const fn liveness_alive_output(&self) -> &'static str {
        self.liveness_alive_output
    }

    /// Check output recorded once the member has failed.
    pub const fn liveness_failed_output(&self) -> &'static str {
        self.liveness_failed_output
    }
}

/// Pure predicates deciding whether an identity is a reserved system entry.
///
/// Holds no mutable state; share it behind an `Arc` across threads.
#[derive(Debug, Clone)]
pub struct ReservedIdentityClassifier {
    reserved: &'static ReservedIdentitySet,
    tenancy: Arc<dyn TenancyResolver>,
}

impl ReservedIdentityClassifier {
    /// Creates a classifier over the builtin reserved set.
    pub fn new(tenancy: Arc<dyn TenancyResolver>) -> Self {
        Self { reserved: ReservedIdentitySet::builtin(), tenancy }
    }

    /// Returns the reserved identity set consulted by this classifier.
    pub fn reserved(&self) -> &'static ReservedIdentitySet {
        self.reserved
    }

    /// Returns the tenancy resolver used for scope comparisons.
    pub fn tenancy(&self) -> &Arc<dyn TenancyResolver> {
        &self.tenancy
    }

    /// Whether `key` is the self-registration service in the default scope.
    pub fn is_reserved_service(&self, key: &ServiceKey) -> bool {
        key.id.as_str() == self.reserved.self_service_id && self.tenancy.is_default(&key.scope)
    }

    /// Whether `key` is the liveness check in the default scope.
    pub fn is_reserved_check(&self, key: &CheckKey) -> bool {
        key.id.as_str() == self.reserved.liveness_check_id && self.tenancy.is_default(&key.scope)
    }

    /// Key of the self-registration service.
    pub fn self_service_key(&self) -> ServiceKey {
        ServiceKey::new(self.reserved.self_service_id, self.default_scope())
    }

    /// Key of the liveness check.
    pub fn liveness_check_key(&self) -> CheckKey {
        CheckKey::new(self.reserved.liveness_check_id, self.default_scope())
    }

    fn default_scope(&self) -> TenancyScope {
        self.tenancy.default_scope()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::tenancy::{MultiTenant, SingleTenant, TenancyMode};

    fn multi() -> ReservedIdentityClassifier {
        ReservedIdentityClassifier::new(Arc::new(MultiTenant))
    }

    fn single() -> ReservedIdentityClassifier {
        ReservedIdentityClassifier::new(Arc::new(SingleTenant))
    }

    #[test]
    fn test_builtin_constants() {
        let set = ReservedIdentitySet::builtin();
        assert_eq!(set.self_service_id(), "consul");
        assert_eq!(set.liveness_check_id(), "serfHealth");
        assert_eq!(set.liveness_check_name(), "Serf Health Status");
        assert!(std::ptr::eq(set, ReservedIdentitySet::builtin()));
    }

    #[test]
    fn test_self_service_reserved_in_default_scope() {
        let classifier = multi();
        assert!(classifier.is_reserved_service(&ServiceKey::in_default_scope("consul")));
        let blank = ServiceKey::new("consul", TenancyScope::new("", ""));
        assert!(classifier.is_reserved_service(&blank));
    }

    #[test]
    fn test_liveness_check_reserved_in_default_scope() {
        let classifier = multi();
        assert!(classifier.is_reserved_check(&CheckKey::in_default_scope("serfHealth")));
    }

    #[test]
    fn test_sentinel_in_other_scope_not_reserved() {
        let classifier = multi();
        let scope = TenancyScope::new("team-a", "default");
        assert!(!classifier.is_reserved_service(&ServiceKey::new("consul", scope.clone())));
        assert!(!classifier.is_reserved_check(&CheckKey::new("serfHealth", scope)));

        let ns_only = TenancyScope::new("default", "billing");
        assert!(!classifier.is_reserved_service(&ServiceKey::new("consul", ns_only)));
    }

    #[test]
    fn test_single_tenant_ignores_scope() {
        let classifier = single();
        let scope = TenancyScope::new("team-a", "billing");
        assert!(classifier.is_reserved_service(&ServiceKey::new("consul", scope.clone())));
        assert!(classifier.is_reserved_check(&CheckKey::new("serfHealth", scope)));
    }

    #[test]
    fn test_predicates_do_not_cross_kinds() {
        let classifier = multi();
        assert!(!classifier.is_reserved_service(&ServiceKey::in_default_scope("serfHealth")));
        assert!(!classifier.is_reserved_check(&CheckKey::in_default_scope("consul")));
    }

    #[test]
    fn test_empty_and_near_miss_ids_not_reserved() {
        let classifier = multi();
        for id in ["", " ", "Consul", "consul ", "serfhealth", "consul\0"] {
            assert!(!classifier.is_reserved_service(&ServiceKey::in_default_scope(id)), "{id:?}");
            assert!(!classifier.is_reserved_check(&CheckKey::in_default_scope(id)), "{id:?}");
        }
    }

    #[test]
    fn test_reserved_keys_classify_as_reserved() {
        for mode in [TenancyMode::Single, TenancyMode::Multi] {
            let classifier = ReservedIdentityClassifier::new(mode.resolver());
            assert!(classifier.is_reserved_service(&classifier.self_service_key()));
            assert!(classifier.is_reserved_check(&classifier.liveness_check_key()));
        }
    }

    fn arb_id() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("consul".to_string()),
            Just("serfHealth".to_string()),
            Just(String::new()),
            "[a-zA-Z0-9_-]{1,16}",
        ]
    }

    fn arb_scope() -> impl Strategy<Value = TenancyScope> {
        (
            prop_oneof![Just(String::new()), Just("default".to_string()), "[a-z]{1,6}"],
            prop_oneof![Just(String::new()), Just("default".to_string()), "[a-z]{1,6}"],
        )
            .prop_map(|(p, n)| TenancyScope::new(p, n))
    }

    proptest! {
        /// Service classification matches its definition for every key.
        #[test]
        fn prop_service_classification_matches_definition(id in arb_id(), scope in arb_scope()) {
            let classifier = multi();
            let key = ServiceKey::new(id.clone(), scope.clone());
            let expected = id == "consul" && scope == TenancyScope::default();
            prop_assert_eq!(classifier.is_reserved_service(&key), expected);
        }

        /// Check classification matches its definition for every key.
        #[test]
        fn prop_check_classification_matches_definition(id in arb_id(), scope in arb_scope()) {
            let classifier = multi();
            let key = CheckKey::new(id.clone(), scope.clone());
            let expected = id == "serfHealth" && scope == TenancyScope::default();
            prop_assert_eq!(classifier.is_reserved_check(&key), expected);
        }

        /// Repeated classification of the same key yields the same answer.
        #[test]
        fn prop_classification_is_idempotent(id in arb_id(), scope in arb_scope()) {
            let classifier = multi();
            let service = ServiceKey::new(id.clone(), scope.clone());
            let check = CheckKey::new(id, scope);
            prop_assert_eq!(
                classifier.is_reserved_service(&service),
                classifier.is_reserved_service(&service)
            );
            prop_assert_eq!(
                classifier.is_reserved_check(&check),
                classifier.is_reserved_check(&check)
            );
        }
    }
}
