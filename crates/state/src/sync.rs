//! Anti-entropy passes from the local view into the catalog.
//!
//! A full pass reconciles services first and applies that plan. It then
//! re-reads the node's checks, because deleting a service also deletes its
//! bound checks. A partial pass does the same for the keys the local view
//! marked as changed since the last pass.
//!
//! Writes go through the trusted anti-entropy path, so reserved entries held
//! locally are pushed like any other entry. Individual write failures are
//! logged and counted, and the pass carries on. The next full pass repairs
//! them.

use std::sync::Arc;

use catalog_types::{
    CheckEntry, CheckKey, InternalPath, RequestOrigin, Result, ServiceEntry, ServiceKey,
};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::{
    anti_entropy::{AntiEntropyReconciler, SyncPlan},
    catalog::CatalogService,
    local::LocalState,
    store::CatalogStore,
};

const ORIGIN: RequestOrigin = RequestOrigin::Internal(InternalPath::AntiEntropy);

/// Bucket sizes for one entry kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounts {
    /// Entries pushed to the catalog.
    pub added: usize,
    /// Entries removed from the catalog.
    pub removed: usize,
    /// Entries already in sync.
    pub unchanged: usize,
    /// Remote-only reserved entries left in place.
    pub exempt: usize,
}

impl<E> From<&SyncPlan<E>> for BucketCounts {
    fn from(plan: &SyncPlan<E>) -> Self {
        Self {
            added: plan.to_add.len(),
            removed: plan.to_remove.len(),
            unchanged: plan.unchanged.len(),
            exempt: plan.exempt.len(),
        }
    }
}

/// Result of one anti-entropy pass.
///
/// `added` and `removed` count planned writes; writes that failed are also
/// counted in `failures`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Service buckets.
    pub services: BucketCounts,
    /// Check buckets.
    pub checks: BucketCounts,
    /// Writes that failed.
    pub failures: usize,
}

impl SyncReport {
    /// Whether every planned write succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }

    fn writes(&self) -> usize {
        self.services.added + self.services.removed + self.checks.added + self.checks.removed
    }
}

/// Pushes the local view of one node into the catalog.
pub struct AntiEntropySyncer<S: ?Sized> {
    local: Arc<LocalState>,
    catalog: Arc<CatalogService<S>>,
    reconciler: AntiEntropyReconciler,
}

impl<S: CatalogStore + ?Sized> AntiEntropySyncer<S> {
    /// Creates a syncer for the node `local` belongs to.
    pub fn new(local: Arc<LocalState>, catalog: Arc<CatalogService<S>>) -> Self {
        let reconciler = AntiEntropyReconciler::new(Arc::clone(catalog.classifier()));
        Self { local, catalog, reconciler }
    }

    /// Notifier woken when the local view changes.
    pub fn changes(&self) -> Arc<Notify> {
        self.local.changes()
    }

    /// Runs one full pass.
    ///
    /// Pending local changes are folded into the pass.
    ///
    /// # Errors
    ///
    /// Returns `Store` when the local view or the node's remote records cannot
    /// be read. Write failures do not abort the pass.
    pub fn sync_full(&self) -> Result<SyncReport> {
        self.local.take_pending();
        let node = self.local.node();
        let mut report = SyncReport::default();

        let local = self.local.services()?;
        let remote = self.catalog.store().node_services(node)?;
        self.apply_services(self.reconciler.reconcile(&local, &remote), &mut report);

        let local = self.local.checks()?;
        let remote = self.catalog.store().node_checks(node)?;
        self.apply_checks(self.reconciler.reconcile(&local, &remote), &mut report);

        if report.writes() == 0 {
            debug!(node, "Node info in sync");
        } else {
            info!(
                node,
                services_added = report.services.added,
                services_removed = report.services.removed,
                checks_added = report.checks.added,
                checks_removed = report.checks.removed,
                failures = report.failures,
                "Anti-entropy pass complete"
            );
        }
        Ok(report)
    }

    /// Syncs only the keys changed locally since the last pass.
    ///
    /// Falls back to a full pass when the local view reported a node-wide
    /// change.
    ///
    /// # Errors
    ///
    /// Returns `Store` when a local or remote record cannot be read.
    pub fn sync_changes(&self) -> Result<SyncReport> {
        let pending = self.local.take_pending();
        if pending.full {
            return self.sync_full();
        }
        let mut report = SyncReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        let node = self.local.node();
        let tenancy = self.catalog.classifier().tenancy();
        let store = self.catalog.store();

        let (mut local, mut remote) = (Vec::new(), Vec::new());
        for key in &pending.services {
            local.extend(self.local.get_service(node, key)?);
            let remote_key = ServiceKey::new(key.id.clone(), tenancy.normalize(&key.scope));
            remote.extend(store.get_service(node, &remote_key)?);
        }
        self.apply_services(self.reconciler.reconcile(&local, &remote), &mut report);

        let (mut local, mut remote) = (Vec::new(), Vec::new());
        for key in &pending.checks {
            local.extend(self.local.get_check(node, key)?);
            let remote_key = CheckKey::new(key.id.clone(), tenancy.normalize(&key.scope));
            remote.extend(store.get_check(node, &remote_key)?);
        }
        self.apply_checks(self.reconciler.reconcile(&local, &remote), &mut report);

        debug!(
            node,
            services = pending.services.len(),
            checks = pending.checks.len(),
            writes = report.writes(),
            failures = report.failures,
            "Partial sync complete"
        );
        Ok(report)
    }

    fn apply_services(&self, plan: SyncPlan<ServiceEntry>, report: &mut SyncReport) {
        let node = self.local.node();
        report.services = BucketCounts::from(&plan);
        for service in plan.to_add {
            let key = service.key.clone();
            if let Err(e) = self.catalog.register_service(node, service, ORIGIN) {
                warn!(node, service = %key, error = %e, "Failed to push service");
                report.failures += 1;
            }
        }
        for service in plan.to_remove {
            if let Err(e) = self.catalog.deregister_service(node, &service.key, ORIGIN) {
                warn!(node, service = %service.key, error = %e, "Failed to remove service");
                report.failures += 1;
            }
        }
    }

    fn apply_checks(&self, plan: SyncPlan<CheckEntry>, report: &mut SyncReport) {
        let node = self.local.node();
        report.checks = BucketCounts::from(&plan);
        for check in plan.to_add {
            let key = check.key.clone();
            if let Err(e) = self.catalog.register_check(check, ORIGIN) {
                warn!(node, check = %key, error = %e, "Failed to push check");
                report.failures += 1;
            }
        }
        for check in plan.to_remove {
            if let Err(e) = self.catalog.deregister_check(node, &check.key, ORIGIN) {
                warn!(node, check = %check.key, error = %e, "Failed to remove check");
                report.failures += 1;
            }
        }
    }
}
