//! Deregistration guard.
//!
//! Untrusted callers may not delete the self-registration service or the
//! liveness check in the default scope. Every other deletion is forwarded to
//! the catalog store, and store failures pass through unchanged.

use std::sync::Arc;

use catalog_types::{
    CheckKey, EntryKind, Mutation, RequestOrigin, ReservedIdentityClassifier, Result, ServiceKey,
    error::ReservedIdentityConflictSnafu,
};
use snafu::ensure;

use crate::store::CatalogStore;

/// Policy gate in front of store deletions.
pub struct DeregistrationGuard<S: ?Sized> {
    classifier: Arc<ReservedIdentityClassifier>,
    store: Arc<S>,
}

impl<S: ?Sized> Clone for DeregistrationGuard<S> {
    fn clone(&self) -> Self {
        Self { classifier: Arc::clone(&self.classifier), store: Arc::clone(&self.store) }
    }
}

impl<S: CatalogStore + ?Sized> DeregistrationGuard<S> {
    /// Creates a guard forwarding accepted deletions to `store`.
    pub fn new(classifier: Arc<ReservedIdentityClassifier>, store: Arc<S>) -> Self {
        Self { classifier, store }
    }

    /// Checks whether `origin` may delete the service `key`.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentityConflict` for an untrusted deletion of the
    /// self-registration service.
    pub fn guard_service(&self, key: &ServiceKey, origin: RequestOrigin) -> Result<()> {
        ensure!(
            origin.is_trusted() || !self.classifier.is_reserved_service(key),
            ReservedIdentityConflictSnafu {
                kind: EntryKind::Service,
                key: key.to_string(),
                mutation: Mutation::Deregister,
            }
        );
        Ok(())
    }

    /// Checks whether `origin` may delete the check `key`.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentityConflict` for an untrusted deletion of the
    /// liveness check.
    pub fn guard_check(&self, key: &CheckKey, origin: RequestOrigin) -> Result<()> {
        ensure!(
            origin.is_trusted() || !self.classifier.is_reserved_check(key),
            ReservedIdentityConflictSnafu {
                kind: EntryKind::Check,
                key: key.to_string(),
                mutation: Mutation::Deregister,
            }
        );
        Ok(())
    }

    /// Guards and then deletes a service together with its bound checks.
    ///
    /// Returns whether the service existed.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentityConflict` from the gate, or `Store` when the
    /// store fails.
    pub fn deregister_service(
        &self,
        node: &str,
        key: &ServiceKey,
        origin: RequestOrigin,
    ) -> Result<bool> {
        self.guard_service(key, origin)?;
        Ok(self.store.delete_service(node, key)?)
    }

    /// Guards and then deletes a check.
    ///
    /// Returns whether the check existed.
    ///
    /// # Errors
    ///
    /// Returns `ReservedIdentityConflict` from the gate, or `Store` when the
    /// store fails.
    pub fn deregister_check(
        &self,
        node: &str,
        key: &CheckKey,
        origin: RequestOrigin,
    ) -> Result<bool> {
        self.guard_check(key, origin)?;
        Ok(self.store.delete_check(node, key)?)
    }
}
