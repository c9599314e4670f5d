//! Anti-entropy reconciliation between local and remote catalog views.
//!
//! The reconciler compares what the agent believes should exist for its node
//! against what the catalog records for that node, keyed by `(ID, scope)`.
//! Scopes on both sides are normalized through the tenancy resolver first, so
//! two keys the resolver treats as one scope pair up.
//! Remote-only reserved entries are never proposed for removal: the liveness
//! check in particular is re-synthesized from membership events and must not
//! flap when the local view briefly omits it.

use std::{
    collections::BTreeMap,
    fmt::{Debug, Display},
    sync::Arc,
};

use catalog_types::{
    CheckEntry, CheckKey, ReservedIdentityClassifier, ServiceEntry, ServiceKey, TenancyResolver,
};
use tracing::debug;

/// A record the reconciler can compare.
pub trait CatalogEntry: Clone + Debug {
    /// Identity the record is keyed by.
    type Key: Ord + Clone + Debug + Display;

    /// Label used in logs.
    const KIND: &'static str;

    /// Returns the record's identity.
    fn key(&self) -> &Self::Key;

    /// Returns the record with its key scope normalized by `tenancy`.
    fn normalized(self, tenancy: &dyn TenancyResolver) -> Self;

    /// Whether two records describe the same registration.
    fn is_same(&self, other: &Self) -> bool;

    /// Whether `key` is a reserved identity of this kind.
    fn is_reserved(classifier: &ReservedIdentityClassifier, key: &Self::Key) -> bool;
}

impl CatalogEntry for ServiceEntry {
    type Key = ServiceKey;

    const KIND: &'static str = "service";

    fn key(&self) -> &ServiceKey {
        &self.key
    }

    fn normalized(mut self, tenancy: &dyn TenancyResolver) -> Self {
        self.key.scope = tenancy.normalize(&self.key.scope);
        self
    }

    fn is_same(&self, other: &Self) -> bool {
        ServiceEntry::is_same(self, other)
    }

    fn is_reserved(classifier: &ReservedIdentityClassifier, key: &ServiceKey) -> bool {
        classifier.is_reserved_service(key)
    }
}

impl CatalogEntry for CheckEntry {
    type Key = CheckKey;

    const KIND: &'static str = "check";

    fn key(&self) -> &CheckKey {
        &self.key
    }

    fn normalized(mut self, tenancy: &dyn TenancyResolver) -> Self {
        self.key.scope = tenancy.normalize(&self.key.scope);
        self
    }

    fn is_same(&self, other: &Self) -> bool {
        CheckEntry::is_same(self, other)
    }

    fn is_reserved(classifier: &ReservedIdentityClassifier, key: &CheckKey) -> bool {
        classifier.is_reserved_check(key)
    }
}

/// Buckets produced by one reconciliation.
///
/// Every local entry lands in exactly one of `to_add` or `unchanged`; every
/// remote-only entry lands in exactly one of `to_remove` or `exempt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan<E> {
    /// Local entries missing remotely or differing from the remote record.
    pub to_add: Vec<E>,
    /// Remote-only entries that are not reserved.
    pub to_remove: Vec<E>,
    /// Entries identical on both sides.
    pub unchanged: Vec<E>,
    /// Remote-only reserved entries kept out of `to_remove`.
    pub exempt: Vec<E>,
}

impl<E> SyncPlan<E> {
    /// Whether the plan requires no writes.
    pub fn is_in_sync(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl<E> Default for SyncPlan<E> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_remove: Vec::new(),
            unchanged: Vec::new(),
            exempt: Vec::new(),
        }
    }
}

/// Computes sync plans for one node.
#[derive(Debug, Clone)]
pub struct AntiEntropyReconciler {
    classifier: Arc<ReservedIdentityClassifier>,
}

impl AntiEntropyReconciler {
    /// Creates a reconciler consulting `classifier` for the removal exemption.
    pub fn new(classifier: Arc<ReservedIdentityClassifier>) -> Self {
        Self { classifier }
    }

    /// Buckets `local` against `remote`.
    ///
    /// Output entries carry normalized keys and are ordered by key. Entries
    /// within one side whose keys normalize to the same key keep the last
    /// occurrence.
    pub fn reconcile<E: CatalogEntry>(&self, local: &[E], remote: &[E]) -> SyncPlan<E> {
        let local = self.keyed(local);
        let mut remote = self.keyed(remote);

        let mut plan = SyncPlan::default();
        for (key, entry) in local {
            match remote.remove(&key) {
                Some(existing) if existing.is_same(&entry) => plan.unchanged.push(entry),
                _ => plan.to_add.push(entry),
            }
        }

        for (key, entry) in remote {
            if E::is_reserved(&self.classifier, &key) {
                debug!(
                    kind = E::KIND,
                    key = %key,
                    "Skipping remote entry since it is managed automatically"
                );
                plan.exempt.push(entry);
            } else {
                plan.to_remove.push(entry);
            }
        }
        plan
    }

    fn keyed<E: CatalogEntry>(&self, entries: &[E]) -> BTreeMap<E::Key, E> {
        let tenancy = self.classifier.tenancy();
        entries
            .iter()
            .map(|entry| {
                let entry = entry.clone().normalized(tenancy.as_ref());
                (entry.key().clone(), entry)
            })
            .collect()
    }
}
