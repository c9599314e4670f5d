//! The agent's local view of its own node.
//!
//! [`LocalState`] records what the agent believes should be registered for the
//! node it runs on. It is a [`CatalogStore`] restricted to that single node, so
//! the same policy gates that protect the catalog also protect it: wrap it in a
//! [`CatalogService`](crate::CatalogService) and a client removing the
//! self-registration service is rejected there just as it is remotely.
//!
//! Every successful mutation records the touched key as pending and wakes the
//! [`changes`](LocalState::changes) notifier, which drives partial syncs.

use std::{collections::BTreeSet, mem, sync::Arc};

use catalog_types::{CheckEntry, CheckKey, ServiceEntry, ServiceKey, StoreError, WriteStatus};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::store::{CatalogStore, InMemoryCatalogStore, StoreResult};

/// Local keys changed since the last sync took them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Services written or removed.
    pub services: BTreeSet<ServiceKey>,
    /// Checks written or removed.
    pub checks: BTreeSet<CheckKey>,
    /// The whole node changed, so the next sync must be a full pass.
    pub full: bool,
}

impl PendingChanges {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        !self.full && self.services.is_empty() && self.checks.is_empty()
    }
}

/// Services and checks the local agent owns.
#[derive(Debug)]
pub struct LocalState {
    node: String,
    entries: InMemoryCatalogStore,
    pending: Mutex<PendingChanges>,
    changes: Arc<Notify>,
}

impl LocalState {
    /// Creates an empty local view for `node`.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            entries: InMemoryCatalogStore::new(),
            pending: Mutex::new(PendingChanges::default()),
            changes: Arc::new(Notify::new()),
        }
    }

    /// Notifier woken after every local change.
    ///
    /// Wake-ups coalesce: changes made while nobody waits leave a single
    /// permit for the next waiter.
    pub fn changes(&self) -> Arc<Notify> {
        Arc::clone(&self.changes)
    }

    /// Takes the pending changes, leaving none behind.
    pub fn take_pending(&self) -> PendingChanges {
        mem::take(&mut *self.pending.lock())
    }

    fn mark(&self, update: impl FnOnce(&mut PendingChanges)) {
        update(&mut self.pending.lock());
        self.changes.notify_one();
    }

    /// Name of the node this view belongs to.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Snapshot of the local services, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns the error of the backing store.
    pub fn services(&self) -> StoreResult<Vec<ServiceEntry>> {
        self.entries.node_services(&self.node)
    }

    /// Snapshot of the local checks, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns the error of the backing store.
    pub fn checks(&self) -> StoreResult<Vec<CheckEntry>> {
        self.entries.node_checks(&self.node)
    }

    fn mark_check(&self, key: CheckKey) {
        self.mark(|pending| {
            pending.checks.insert(key);
        });
    }

    fn ensure_local(&self, node: &str) -> StoreResult<()> {
        if node == self.node {
            Ok(())
        } else {
            Err(StoreError::ForeignNode { node: node.to_string(), expected: self.node.clone() })
        }
    }
}

impl CatalogStore for LocalState {
    fn get_service(&self, node: &str, key: &ServiceKey) -> StoreResult<Option<ServiceEntry>> {
        self.ensure_local(node)?;
        self.entries.get_service(node, key)
    }

    fn put_service(&self, node: &str, service: ServiceEntry) -> StoreResult<WriteStatus> {
        self.ensure_local(node)?;
        let key = service.key.clone();
        let status = self.entries.put_service(node, service)?;
        self.mark(|pending| {
            pending.services.insert(key);
        });
        Ok(status)
    }

    fn delete_service(&self, node: &str, key: &ServiceKey) -> StoreResult<bool> {
        self.ensure_local(node)?;
        let existed = self.entries.delete_service(node, key)?;
        if existed {
            self.mark(|pending| {
                pending.services.insert(key.clone());
            });
        }
        Ok(existed)
    }

    fn get_check(&self, node: &str, key: &CheckKey) -> StoreResult<Option<CheckEntry>> {
        self.ensure_local(node)?;
        self.entries.get_check(node, key)
    }

    fn put_check(&self, check: CheckEntry) -> StoreResult<WriteStatus> {
        self.ensure_local(&check.node)?;
        let key = check.key.clone();
        let status = self.entries.put_check(check)?;
        self.mark_check(key);
        Ok(status)
    }

    fn put_check_if_service_exists(&self, check: CheckEntry) -> StoreResult<Option<WriteStatus>> {
        self.ensure_local(&check.node)?;
        let key = check.key.clone();
        let status = self.entries.put_check_if_service_exists(check)?;
        if status.is_some() {
            self.mark_check(key);
        }
        Ok(status)
    }

    fn update_check_if_node_exists(&self, check: CheckEntry) -> StoreResult<Option<WriteStatus>> {
        self.ensure_local(&check.node)?;
        let key = check.key.clone();
        let status = self.entries.update_check_if_node_exists(check)?;
        if status.is_some() {
            self.mark_check(key);
        }
        Ok(status)
    }

    fn delete_check(&self, node: &str, key: &CheckKey) -> StoreResult<bool> {
        self.ensure_local(node)?;
        let existed = self.entries.delete_check(node, key)?;
        if existed {
            self.mark_check(key.clone());
        }
        Ok(existed)
    }

    fn node_services(&self, node: &str) -> StoreResult<Vec<ServiceEntry>> {
        self.ensure_local(node)?;
        self.services()
    }

    fn node_checks(&self, node: &str) -> StoreResult<Vec<CheckEntry>> {
        self.ensure_local(node)?;
        self.checks()
    }

    fn nodes(&self) -> StoreResult<Vec<String>> {
        self.entries.nodes()
    }

    fn has_node(&self, node: &str) -> StoreResult<bool> {
        self.ensure_local(node)?;
        self.entries.has_node(node)
    }

    fn deregister_node(&self, node: &str) -> StoreResult<bool> {
        self.ensure_local(node)?;
        let existed = self.entries.deregister_node(node)?;
        if existed {
            self.mark(|pending| pending.full = true);
        }
        Ok(existed)
    }
}
