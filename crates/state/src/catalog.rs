//! Catalog service: policy-checked registration and deregistration.
//!
//! Every mutation runs through the same sequence:
//! 1. Normalize the entry's scope through the tenancy resolver
//! 2. Run the registration validator or deregistration guard
//! 3. Apply the exact normalized key to the store
//!
//! Classification depends only on the key, and the store applies that key
//! under its own write lock.

use std::sync::Arc;

use catalog_types::{
    CheckEntry, CheckKey, InternalPath, RequestOrigin, ReservedIdentityClassifier,
    Result, ServiceEntry, ServiceKey, WriteStatus, config::ValidationConfig,
    error::InvalidArgumentSnafu,
};
use snafu::OptionExt;
use tracing::{debug, info, warn};

use crate::{
    deregistration::DeregistrationGuard, registration::RegistrationValidator, store::CatalogStore,
};

/// Policy-enforcing front of a [`CatalogStore`].
pub struct CatalogService<S: ?Sized> {
    classifier: Arc<ReservedIdentityClassifier>,
    validator: RegistrationValidator,
    guard: DeregistrationGuard<S>,
    store: Arc<S>,
}

impl<S: CatalogStore + ?Sized> CatalogService<S> {
    /// Creates a service over `store`.
    pub fn new(
        classifier: Arc<ReservedIdentityClassifier>,
        limits: ValidationConfig,
        store: Arc<S>,
    ) -> Self {
        Self {
            validator: RegistrationValidator::new(Arc::clone(&classifier), limits),
            guard: DeregistrationGuard::new(Arc::clone(&classifier), Arc::clone(&store)),
            classifier,
            store,
        }
    }

    /// Returns the classifier shared by the policy gates.
    pub fn classifier(&self) -> &Arc<ReservedIdentityClassifier> {
        &self.classifier
    }

    /// Returns the underlying store for reads.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the registration validator.
    pub fn validator(&self) -> &RegistrationValidator {
        &self.validator
    }

    /// Returns the deregistration guard.
    pub fn guard(&self) -> &DeregistrationGuard<S> {
        &self.guard
    }

    /// Registers or replaces a service on `node`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` or `ReservedIdentityConflict` from the
    /// validator, or `Store` when the write fails.
    pub fn register_service(
        &self,
        node: &str,
        mut service: ServiceEntry,
        origin: RequestOrigin,
    ) -> Result<WriteStatus> {
        service.key.scope = self.classifier.tenancy().normalize(&service.key.scope);
        if let Err(e) = self.validator.validate_service(node, &service, origin) {
            warn!(
                node,
                service = %service.key,
                %origin,
                error = %e,
                "Rejected service registration"
            );
            return Err(e);
        }

        let key = service.key.clone();
        let status = self.store.put_service(node, service)?;
        debug!(node, service = %key, %origin, ?status, "Registered service");
        Ok(status)
    }

    /// Registers or replaces a check on the node named by `check.node`.
    ///
    /// A check bound to a service requires that service to be registered on
    /// the same node in the same scope. The store tests this under the write
    /// that stores the check.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` or `ReservedIdentityConflict` from the
    /// validator, `InvalidArgument` for an unknown bound service, or `Store`
    /// when the write fails.
    pub fn register_check(&self, check: CheckEntry, origin: RequestOrigin) -> Result<WriteStatus> {
        let check = self.validated_check(check, origin)?;
        let (node, key) = (check.node.clone(), check.key.clone());
        let bound = check.service_id.clone();

        let status = self.store.put_check_if_service_exists(check)?.with_context(|| {
            let service = bound.map(|id| ServiceKey::new(id, key.scope.clone()));
            let service = service.map(|s| s.to_string()).unwrap_or_default();
            InvalidArgumentSnafu {
                message: format!(
                    "check '{key}' is bound to unknown service '{service}' on node '{node}'"
                ),
            }
        })?;
        debug!(node = %node, check = %key, %origin, ?status, "Registered check");
        Ok(status)
    }

    /// Writes a check only if its node is already in the store.
    ///
    /// Returns `None` when the node has no record or a bound service is
    /// missing. Nothing is written then.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` or `ReservedIdentityConflict` from the
    /// validator, or `Store` when the write fails.
    pub fn update_check(
        &self,
        check: CheckEntry,
        origin: RequestOrigin,
    ) -> Result<Option<WriteStatus>> {
        let check = self.validated_check(check, origin)?;
        let (node, key) = (check.node.clone(), check.key.clone());

        let status = self.store.update_check_if_node_exists(check)?;
        debug!(node = %node, check = %key, %origin, ?status, "Updated check");
        Ok(status)
    }

    /// Deregisters a service and its bound checks from `node`.
    ///
    /// Returns whether the service existed.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentityConflict` from the guard, or `Store` when the
    /// delete fails.
    pub fn deregister_service(
        &self,
        node: &str,
        key: &ServiceKey,
        origin: RequestOrigin,
    ) -> Result<bool> {
        let key = ServiceKey::new(key.id.clone(), self.classifier.tenancy().normalize(&key.scope));
        match self.guard.deregister_service(node, &key, origin) {
            Ok(existed) => {
                debug!(node, service = %key, %origin, existed, "Deregistered service");
                Ok(existed)
            },
            Err(e) => {
                warn!(node, service = %key, %origin, error = %e, "Service deregistration failed");
                Err(e)
            },
        }
    }

    /// Deregisters a check from `node`.
    ///
    /// Returns whether the check existed.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentityConflict` from the guard, or `Store` when the
    /// delete fails.
    pub fn deregister_check(
        &self,
        node: &str,
        key: &CheckKey,
        origin: RequestOrigin,
    ) -> Result<bool> {
        let key = CheckKey::new(key.id.clone(), self.classifier.tenancy().normalize(&key.scope));
        match self.guard.deregister_check(node, &key, origin) {
            Ok(existed) => {
                debug!(node, check = %key, %origin, existed, "Deregistered check");
                Ok(existed)
            },
            Err(e) => {
                warn!(node, check = %key, %origin, error = %e, "Check deregistration failed");
                Err(e)
            },
        }
    }

    /// Removes `node` with every service and check on it, reserved ones included.
    ///
    /// Always runs as the trusted node-deregistration path. Returns whether the
    /// node existed.
    ///
    /// # Errors
    ///
    /// Returns `Store` when the delete fails.
    pub fn deregister_node(&self, node: &str) -> Result<bool> {
        let origin = RequestOrigin::Internal(InternalPath::NodeDeregistration);
        let existed = self.store.deregister_node(node)?;
        if existed {
            info!(node, %origin, "Deregistered node");
        }
        Ok(existed)
    }

    fn validated_check(&self, mut check: CheckEntry, origin: RequestOrigin) -> Result<CheckEntry> {
        check.key.scope = self.classifier.tenancy().normalize(&check.key.scope);
        if let Err(e) = self.validator.validate_check(&check, origin) {
            warn!(
                node = %check.node,
                check = %check.key,
                %origin,
                error = %e,
                "Rejected check registration"
            );
            return Err(e);
        }
        Ok(check)
    }
}

impl<S: ?Sized> std::fmt::Debug for CatalogService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("classifier", &self.classifier)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use catalog_types::{
        CatalogError, ErrorCode, HealthStatus, ServiceId, TenancyMode, TenancyScope,
    };

    use super::*;
    use crate::{local::LocalState, store::InMemoryCatalogStore};

    const NODE: &str = "node-1";
    const SELF_REGISTRATION: RequestOrigin =
        RequestOrigin::Internal(InternalPath::SelfRegistration);

    fn catalog(mode: TenancyMode) -> CatalogService<InMemoryCatalogStore> {
        let classifier = Arc::new(ReservedIdentityClassifier::new(mode.resolver()));
        let store = Arc::new(InMemoryCatalogStore::new());
        CatalogService::new(classifier, ValidationConfig::default(), store)
    }

    fn web() -> ServiceEntry {
        service(ServiceKey::in_default_scope("web"))
    }

    fn service(key: ServiceKey) -> ServiceEntry {
        ServiceEntry::builder().name(key.id.as_str()).key(key).build()
    }

    fn bound_check(id: &str, service_id: &str, scope: TenancyScope) -> CheckEntry {
        CheckEntry::builder()
            .key(CheckKey::new(id, scope))
            .node(NODE)
            .name(id)
            .status(HealthStatus::Passing)
            .service_id(ServiceId::from(service_id))
            .build()
    }

    #[test]
    fn test_register_and_deregister_user_service() {
        let catalog = catalog(TenancyMode::Multi);
        let key = ServiceKey::in_default_scope("web");
        assert_eq!(
            catalog.register_service(NODE, service(key.clone()), RequestOrigin::Client).unwrap(),
            WriteStatus::Created
        );
        assert_eq!(
            catalog.register_service(NODE, service(key.clone()), RequestOrigin::Client).unwrap(),
            WriteStatus::Updated
        );
        assert!(catalog.deregister_service(NODE, &key, RequestOrigin::Client).unwrap());
        assert!(catalog.store().node_services(NODE).unwrap().is_empty());
    }

    #[test]
    fn test_client_cannot_touch_self_service() {
        let catalog = catalog(TenancyMode::Multi);
        let key = catalog.classifier().self_service_key();
        let err = catalog
            .register_service(NODE, service(key.clone()), RequestOrigin::Client)
            .unwrap_err();
        assert!(err.is_reserved_conflict());

        catalog
            .register_service(NODE, service(key.clone()), SELF_REGISTRATION)
            .unwrap();
        let err = catalog.deregister_service(NODE, &key, RequestOrigin::Client).unwrap_err();
        assert!(err.is_reserved_conflict());
        assert!(catalog.store().get_service(NODE, &key).unwrap().is_some());
    }

    #[test]
    fn test_single_tenant_normalizes_scope_before_storing() {
        let catalog = catalog(TenancyMode::Single);
        let scoped = ServiceKey::new("web", TenancyScope::new("team-a", "payments"));
        catalog.register_service(NODE, service(scoped.clone()), RequestOrigin::Client).unwrap();

        let stored = catalog.store().node_services(NODE).unwrap();
        assert_eq!(stored[0].key, ServiceKey::in_default_scope("web"));
        assert!(catalog.deregister_service(NODE, &scoped, RequestOrigin::Client).unwrap());
    }

    #[test]
    fn test_check_bound_to_unknown_service_is_rejected() {
        let catalog = catalog(TenancyMode::Multi);
        let web_http = bound_check("web-http", "web", TenancyScope::default());
        let err = catalog.register_check(web_http.clone(), RequestOrigin::Client).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AppInvalidArgument);
        assert!(err.to_string().contains("unknown service 'web'"));

        catalog.register_service(NODE, web(), RequestOrigin::Client).unwrap();
        catalog.register_check(web_http, RequestOrigin::Client).unwrap();

        // Bound service must live in the check's scope.
        let other = TenancyScope::new("team-a", "default");
        let web_tcp = bound_check("web-tcp", "web", other);
        assert!(catalog.register_check(web_tcp, RequestOrigin::Client).is_err());
    }

    #[test]
    fn test_bound_check_racing_service_removal_is_never_orphaned() {
        let catalog = catalog(TenancyMode::Multi);
        let key = ServiceKey::in_default_scope("web");
        for _ in 0..200 {
            catalog.register_service(NODE, service(key.clone()), RequestOrigin::Client).unwrap();
            std::thread::scope(|s| {
                s.spawn(|| {
                    let check = bound_check("web-http", "web", TenancyScope::default());
                    // Loses the race with an InvalidArgument once the service is gone.
                    let _ = catalog.register_check(check, RequestOrigin::Client);
                });
                s.spawn(|| catalog.deregister_service(NODE, &key, RequestOrigin::Client).unwrap());
            });

            assert!(catalog.store().get_service(NODE, &key).unwrap().is_none());
            assert!(catalog.store().node_checks(NODE).unwrap().is_empty());
        }
    }

    #[test]
    fn test_update_check_requires_existing_node() {
        let catalog = catalog(TenancyMode::Multi);
        let mem = CheckEntry::builder()
            .key(CheckKey::in_default_scope("mem"))
            .node(NODE)
            .name("mem")
            .build();
        assert_eq!(catalog.update_check(mem.clone(), RequestOrigin::Client).unwrap(), None);
        assert!(!catalog.store().has_node(NODE).unwrap());

        catalog.register_service(NODE, web(), RequestOrigin::Client).unwrap();
        assert_eq!(
            catalog.update_check(mem, RequestOrigin::Client).unwrap(),
            Some(WriteStatus::Created)
        );

        let liveness = CheckEntry::builder()
            .key(catalog.classifier().liveness_check_key())
            .node(NODE)
            .name("Serf Health Status")
            .build();
        let err = catalog.update_check(liveness, RequestOrigin::Client).unwrap_err();
        assert!(err.is_reserved_conflict());
    }

    #[test]
    fn test_deregister_node_removes_reserved_entries() {
        let catalog = catalog(TenancyMode::Multi);
        let trusted = RequestOrigin::Internal(InternalPath::LivenessSynthesis);
        let liveness = CheckEntry::builder()
            .key(catalog.classifier().liveness_check_key())
            .node(NODE)
            .name("Serf Health Status")
            .build();
        catalog.register_check(liveness, trusted).unwrap();

        assert!(catalog.deregister_node(NODE).unwrap());
        assert!(!catalog.store().has_node(NODE).unwrap());
        assert!(!catalog.deregister_node(NODE).unwrap());
    }

    #[test]
    fn test_store_failure_passes_through() {
        let catalog = catalog(TenancyMode::Multi);
        catalog.store().set_available(false);
        let err = catalog.register_service(NODE, web(), RequestOrigin::Client).unwrap_err();
        assert!(matches!(err, CatalogError::Store { .. }));
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    }

    #[test]
    fn test_local_state_guards_self_service_removal() {
        let classifier = Arc::new(ReservedIdentityClassifier::new(TenancyMode::Single.resolver()));
        let local = Arc::new(LocalState::new(NODE));
        let limits = ValidationConfig::default();
        let catalog = CatalogService::new(Arc::clone(&classifier), limits, local);
        let key = classifier.self_service_key();
        catalog
            .register_service(NODE, service(key.clone()), SELF_REGISTRATION)
            .unwrap();

        let err = catalog.deregister_service(NODE, &key, RequestOrigin::Client).unwrap_err();
        assert!(err.is_reserved_conflict());

        let err = catalog.register_service("node-2", web(), RequestOrigin::Client).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreForeignNode);
    }
}
