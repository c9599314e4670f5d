//! Registration admission for services and checks.
//!
//! Requests are validated field by field first, then checked against the
//! reserved identities. Only trusted internal paths may write a reserved entry.

use std::sync::Arc;

use catalog_types::{
    CheckEntry, EntryKind, Mutation, RequestOrigin, ReservedIdentityClassifier, Result,
    ServiceEntry,
    config::ValidationConfig,
    error::ReservedIdentityConflictSnafu,
    validation::{validate_id, validate_node_name, validate_scope},
};
use snafu::ensure;

/// Policy gate for create and overwrite requests.
#[derive(Debug, Clone)]
pub struct RegistrationValidator {
    classifier: Arc<ReservedIdentityClassifier>,
    limits: ValidationConfig,
}

impl RegistrationValidator {
    /// Creates a validator using `limits` for field validation.
    pub fn new(classifier: Arc<ReservedIdentityClassifier>, limits: ValidationConfig) -> Self {
        Self { classifier, limits }
    }

    /// Returns the classifier consulted by this validator.
    pub fn classifier(&self) -> &Arc<ReservedIdentityClassifier> {
        &self.classifier
    }

    /// Admits a service registration on `node`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed node, ID or scope, and
    /// `ReservedIdentityConflict` when an untrusted origin targets the
    /// self-registration service in the default scope.
    pub fn validate_service(
        &self,
        node: &str,
        service: &ServiceEntry,
        origin: RequestOrigin,
    ) -> Result<()> {
        validate_node_name(node)?;
        validate_id(service.key.id.as_str(), "service.id", &self.limits)?;
        validate_scope(&service.key.scope)?;

        ensure!(
            origin.is_trusted() || !self.classifier.is_reserved_service(&service.key),
            ReservedIdentityConflictSnafu {
                kind: EntryKind::Service,
                key: service.key.to_string(),
                mutation: Mutation::Register,
            }
        );
        Ok(())
    }

    /// Admits a check registration on the node named by `check.node`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed node, ID, bound service ID or
    /// scope, and `ReservedIdentityConflict` when an untrusted origin targets
    /// the liveness check in the default scope.
    pub fn validate_check(&self, check: &CheckEntry, origin: RequestOrigin) -> Result<()> {
        validate_node_name(&check.node)?;
        validate_id(check.key.id.as_str(), "check.id", &self.limits)?;
        if let Some(service_id) = &check.service_id {
            validate_id(service_id.as_str(), "check.service_id", &self.limits)?;
        }
        validate_scope(&check.key.scope)?;

        ensure!(
            origin.is_trusted() || !self.classifier.is_reserved_check(&check.key),
            ReservedIdentityConflictSnafu {
                kind: EntryKind::Check,
                key: check.key.to_string(),
                mutation: Mutation::Register,
            }
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use catalog_types::{
        CatalogError, CheckKey, ErrorCode, InternalPath, ServiceKey, TenancyMode, TenancyScope,
    };

    use super::*;

    fn validator(mode: TenancyMode) -> RegistrationValidator {
        let classifier = Arc::new(ReservedIdentityClassifier::new(mode.resolver()));
        RegistrationValidator::new(classifier, ValidationConfig::default())
    }

    fn service(key: ServiceKey) -> ServiceEntry {
        ServiceEntry::builder().name(key.id.as_str()).key(key).build()
    }

    fn check(key: CheckKey) -> CheckEntry {
        CheckEntry::builder().name(key.id.as_str()).key(key).node("node-1").build()
    }

    #[test]
    fn test_client_cannot_register_self_service() {
        let v = validator(TenancyMode::Multi);
        let consul = service(ServiceKey::in_default_scope("consul"));
        let err = v.validate_service("node-1", &consul, RequestOrigin::Client).unwrap_err();
        assert!(err.is_reserved_conflict());
        assert_eq!(err.code(), ErrorCode::AppReservedIdentityConflict);
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "cannot register reserved service 'consul': it is managed by the agent"
        );
    }

    #[test]
    fn test_trusted_origin_may_register_reserved_entries() {
        let v = validator(TenancyMode::Multi);
        let origin = RequestOrigin::Internal(InternalPath::SelfRegistration);
        v.validate_service("node-1", &service(ServiceKey::in_default_scope("consul")), origin)
            .unwrap();

        let origin = RequestOrigin::Internal(InternalPath::LivenessSynthesis);
        v.validate_check(&check(CheckKey::in_default_scope("serfHealth")), origin).unwrap();
    }

    #[test]
    fn test_client_cannot_register_liveness_check() {
        let v = validator(TenancyMode::Single);
        let err = v
            .validate_check(&check(CheckKey::in_default_scope("serfHealth")), RequestOrigin::Client)
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::ReservedIdentityConflict {
                kind: EntryKind::Check,
                mutation: Mutation::Register,
                ..
            }
        ));
    }

    #[test]
    fn test_reserved_id_in_other_scope_is_ordinary() {
        let v = validator(TenancyMode::Multi);
        let scope = TenancyScope::new("team-a", "payments");
        v.validate_service(
            "node-1",
            &service(ServiceKey::new("consul", scope.clone())),
            RequestOrigin::Client,
        )
        .unwrap();
        v.validate_check(&check(CheckKey::new("serfHealth", scope)), RequestOrigin::Client)
            .unwrap();
    }

    #[test]
    fn test_single_tenant_treats_every_scope_as_default() {
        let v = validator(TenancyMode::Single);
        let key = ServiceKey::new("consul", TenancyScope::new("team-a", "payments"));
        let err = v.validate_service("node-1", &service(key), RequestOrigin::Client).unwrap_err();
        assert!(err.is_reserved_conflict());
    }

    #[test]
    fn test_field_validation_runs_before_reservation() {
        let v = validator(TenancyMode::Multi);
        let consul = service(ServiceKey::in_default_scope("consul"));
        let err = v.validate_service("", &consul, RequestOrigin::Client).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AppInvalidArgument);
        assert!(err.to_string().contains("node"));

        let unnamed = service(ServiceKey::in_default_scope(""));
        let err = v.validate_service("node-1", &unnamed, RequestOrigin::Client).unwrap_err();
        assert!(err.to_string().contains("service.id"));

        let bad_scope = ServiceKey::new("web", TenancyScope::new("Team_A", "default"));
        let err =
            v.validate_service("node-1", &service(bad_scope), RequestOrigin::Client).unwrap_err();
        assert!(err.to_string().contains("partition"));
    }

    #[test]
    fn test_bound_service_id_is_validated() {
        let v = validator(TenancyMode::Multi);
        let mut entry = check(CheckKey::in_default_scope("web-http"));
        entry.service_id = Some("bad\nid".into());
        let err = v.validate_check(&entry, RequestOrigin::Client).unwrap_err();
        assert!(err.to_string().contains("check.service_id"));
    }
}
