//! Catalog store abstraction and the in-memory implementation.
//!
//! The store holds, per node, the service and check registrations keyed by
//! `(ID, scope)`. Policy lives above the store: callers classify the exact key
//! they hand to the store, and the store applies that key under its write
//! lock, so a guarded check-then-act is atomic for that key. Writes whose
//! precondition depends on other records (a bound service, an existing node)
//! have conditional variants that test the precondition under the same lock.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
};

use catalog_types::{
    CheckEntry, CheckKey, ServiceEntry, ServiceKey, StoreError, WriteStatus,
};
use parking_lot::RwLock;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Per-node registration records.
///
/// Implementations must serialize writers per key.
pub trait CatalogStore: Send + Sync {
    /// Returns a service registered on `node`.
    fn get_service(&self, node: &str, key: &ServiceKey) -> StoreResult<Option<ServiceEntry>>;

    /// Creates or replaces a service on `node`.
    fn put_service(&self, node: &str, service: ServiceEntry) -> StoreResult<WriteStatus>;

    /// Removes a service and the checks bound to it. Returns whether it existed.
    fn delete_service(&self, node: &str, key: &ServiceKey) -> StoreResult<bool>;

    /// Returns a check registered on `node`.
    fn get_check(&self, node: &str, key: &CheckKey) -> StoreResult<Option<CheckEntry>>;

    /// Creates or replaces a check on the node named by `check.node`.
    fn put_check(&self, check: CheckEntry) -> StoreResult<WriteStatus>;

    /// Creates or replaces `check` if the service it is bound to is
    /// registered on its node in the check's scope. Unbound checks are always
    /// written.
    ///
    /// Returns `None`, writing nothing, when the bound service is missing.
    fn put_check_if_service_exists(&self, check: CheckEntry) -> StoreResult<Option<WriteStatus>>;

    /// Creates or replaces `check` if its node already has a record and any
    /// bound service is registered.
    ///
    /// Returns `None`, writing nothing, when either precondition fails.
    fn update_check_if_node_exists(&self, check: CheckEntry) -> StoreResult<Option<WriteStatus>>;

    /// Removes a check. Returns whether it existed.
    fn delete_check(&self, node: &str, key: &CheckKey) -> StoreResult<bool>;

    /// Lists every service on `node`, ordered by key.
    fn node_services(&self, node: &str) -> StoreResult<Vec<ServiceEntry>>;

    /// Lists every check on `node`, ordered by key.
    fn node_checks(&self, node: &str) -> StoreResult<Vec<CheckEntry>>;

    /// Lists the names of all nodes with a record.
    fn nodes(&self) -> StoreResult<Vec<String>>;

    /// Whether `node` has a record.
    fn has_node(&self, node: &str) -> StoreResult<bool>;

    /// Removes a node with all of its services and checks. Returns whether it existed.
    fn deregister_node(&self, node: &str) -> StoreResult<bool>;
}

#[derive(Debug, Default)]
struct NodeRecord {
    services: BTreeMap<ServiceKey, ServiceEntry>,
    checks: BTreeMap<CheckKey, CheckEntry>,
}

impl NodeRecord {
    fn has_bound_service(&self, check: &CheckEntry) -> bool {
        check.service_id.as_ref().is_none_or(|id| {
            self.services.contains_key(&ServiceKey::new(id.clone(), check.key.scope.clone()))
        })
    }

    fn insert_check(&mut self, check: CheckEntry) -> WriteStatus {
        match self.checks.insert(check.key.clone(), check) {
            Some(_) => WriteStatus::Updated,
            None => WriteStatus::Created,
        }
    }
}

/// In-memory catalog store.
///
/// A single `RwLock` over the node map serializes writers. Availability can
/// be switched off to exercise error pass-through in callers.
#[derive(Debug)]
pub struct InMemoryCatalogStore {
    nodes: RwLock<BTreeMap<String, NodeRecord>>,
    available: AtomicBool,
}

impl InMemoryCatalogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { nodes: RwLock::new(BTreeMap::new()), available: AtomicBool::new(true) }
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`] while `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of nodes with a record.
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable { message: "in-memory store switched off".to_string() })
        }
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn get_service(&self, node: &str, key: &ServiceKey) -> StoreResult<Option<ServiceEntry>> {
        self.ensure_available()?;
        Ok(self.nodes.read().get(node).and_then(|record| record.services.get(key)).cloned())
    }

    fn put_service(&self, node: &str, service: ServiceEntry) -> StoreResult<WriteStatus> {
        self.ensure_available()?;
        let mut nodes = self.nodes.write();
        let record = nodes.entry(node.to_string()).or_default();
        match record.services.insert(service.key.clone(), service) {
            Some(_) => Ok(WriteStatus::Updated),
            None => Ok(WriteStatus::Created),
        }
    }

    fn delete_service(&self, node: &str, key: &ServiceKey) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut nodes = self.nodes.write();
        let Some(record) = nodes.get_mut(node) else {
            return Ok(false);
        };
        let existed = record.services.remove(key).is_some();
        // Checks bound to the service go with it.
        record.checks.retain(|check_key, check| {
            !(check.service_id.as_ref() == Some(&key.id) && check_key.scope == key.scope)
        });
        Ok(existed)
    }

    fn get_check(&self, node: &str, key: &CheckKey) -> StoreResult<Option<CheckEntry>> {
        self.ensure_available()?;
        Ok(self.nodes.read().get(node).and_then(|record| record.checks.get(key)).cloned())
    }

    fn put_check(&self, check: CheckEntry) -> StoreResult<WriteStatus> {
        self.ensure_available()?;
        let mut nodes = self.nodes.write();
        let record = nodes.entry(check.node.clone()).or_default();
        Ok(record.insert_check(check))
    }

    fn put_check_if_service_exists(&self, check: CheckEntry) -> StoreResult<Option<WriteStatus>> {
        self.ensure_available()?;
        let mut nodes = self.nodes.write();
        if check.service_id.is_some()
            && !nodes.get(&check.node).is_some_and(|record| record.has_bound_service(&check))
        {
            return Ok(None);
        }
        let record = nodes.entry(check.node.clone()).or_default();
        Ok(Some(record.insert_check(check)))
    }

    fn update_check_if_node_exists(&self, check: CheckEntry) -> StoreResult<Option<WriteStatus>> {
        self.ensure_available()?;
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&check.node) {
            Some(record) if record.has_bound_service(&check) => {
                Ok(Some(record.insert_check(check)))
            },
            _ => Ok(None),
        }
    }

    fn delete_check(&self, node: &str, key: &CheckKey) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut nodes = self.nodes.write();
        Ok(nodes.get_mut(node).is_some_and(|record| record.checks.remove(key).is_some()))
    }

    fn node_services(&self, node: &str) -> StoreResult<Vec<ServiceEntry>> {
        self.ensure_available()?;
        Ok(self
            .nodes
            .read()
            .get(node)
            .map(|record| record.services.values().cloned().collect())
            .unwrap_or_default())
    }

    fn node_checks(&self, node: &str) -> StoreResult<Vec<CheckEntry>> {
        self.ensure_available()?;
        Ok(self
            .nodes
            .read()
            .get(node)
            .map(|record| record.checks.values().cloned().collect())
            .unwrap_or_default())
    }

    fn nodes(&self) -> StoreResult<Vec<String>> {
        self.ensure_available()?;
        Ok(self.nodes.read().keys().cloned().collect())
    }

    fn has_node(&self, node: &str) -> StoreResult<bool> {
        self.ensure_available()?;
        Ok(self.nodes.read().contains_key(node))
    }

    fn deregister_node(&self, node: &str) -> StoreResult<bool> {
        self.ensure_available()?;
        Ok(self.nodes.write().remove(node).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use catalog_types::{HealthStatus, ServiceId, TenancyScope};

    use super::*;

    fn service(id: &str) -> ServiceEntry {
        ServiceEntry::builder().key(ServiceKey::in_default_scope(id)).name(id).build()
    }

    fn check(node: &str, id: &str, service_id: Option<&str>) -> CheckEntry {
        CheckEntry::builder()
            .key(CheckKey::in_default_scope(id))
            .node(node)
            .name(id)
            .status(HealthStatus::Passing)
            .maybe_service_id(service_id.map(ServiceId::from))
            .build()
    }

    #[test]
    fn test_put_reports_created_then_updated() {
        let store = InMemoryCatalogStore::new();
        assert_eq!(store.put_service("n1", service("web")).unwrap(), WriteStatus::Created);
        assert_eq!(store.put_service("n1", service("web")).unwrap(), WriteStatus::Updated);
        assert_eq!(store.node_services("n1").unwrap().len(), 1);
        assert!(store.has_node("n1").unwrap());
    }

    #[test]
    fn test_same_id_in_two_scopes_are_separate_entries() {
        let store = InMemoryCatalogStore::new();
        let scoped = ServiceEntry {
            key: ServiceKey::new("web", TenancyScope::new("team-a", "default")),
            ..service("web")
        };
        store.put_service("n1", service("web")).unwrap();
        store.put_service("n1", scoped.clone()).unwrap();
        assert_eq!(store.node_services("n1").unwrap().len(), 2);

        assert!(store.delete_service("n1", &scoped.key).unwrap());
        let left = store.node_services("n1").unwrap();
        assert_eq!(left, vec![service("web")]);
    }

    #[test]
    fn test_delete_service_removes_bound_checks() {
        let store = InMemoryCatalogStore::new();
        store.put_service("n1", service("web")).unwrap();
        store.put_check(check("n1", "web-http", Some("web"))).unwrap();
        store.put_check(check("n1", "mem", None)).unwrap();

        assert!(store.delete_service("n1", &ServiceKey::in_default_scope("web")).unwrap());
        let checks = store.node_checks("n1").unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].key.id.as_str(), "mem");
    }

    #[test]
    fn test_conditional_check_writes() {
        let store = InMemoryCatalogStore::new();
        let web_http = check("n1", "web-http", Some("web"));
        assert_eq!(store.put_check_if_service_exists(web_http.clone()).unwrap(), None);
        assert!(!store.has_node("n1").unwrap());
        assert_eq!(store.update_check_if_node_exists(check("n1", "mem", None)).unwrap(), None);
        assert!(!store.has_node("n1").unwrap());

        assert_eq!(
            store.put_check_if_service_exists(check("n1", "mem", None)).unwrap(),
            Some(WriteStatus::Created)
        );
        assert_eq!(
            store.update_check_if_node_exists(check("n1", "mem", None)).unwrap(),
            Some(WriteStatus::Updated)
        );
        assert_eq!(store.update_check_if_node_exists(web_http.clone()).unwrap(), None);

        store.put_service("n1", service("web")).unwrap();
        assert_eq!(
            store.put_check_if_service_exists(web_http).unwrap(),
            Some(WriteStatus::Created)
        );
    }

    #[test]
    fn test_bound_check_never_outlives_concurrent_service_delete() {
        let store = InMemoryCatalogStore::new();
        let key = ServiceKey::in_default_scope("web");
        for _ in 0..200 {
            store.put_service("n1", service("web")).unwrap();
            std::thread::scope(|s| {
                s.spawn(|| store.put_check_if_service_exists(check("n1", "web-http", Some("web"))));
                s.spawn(|| store.delete_service("n1", &key));
            });
            if store.get_service("n1", &key).unwrap().is_none() {
                assert!(store.node_checks("n1").unwrap().is_empty());
            }
            store.deregister_node("n1").unwrap();
        }
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let store = InMemoryCatalogStore::new();
        assert!(!store.delete_service("ghost", &ServiceKey::in_default_scope("web")).unwrap());
        assert!(!store.delete_check("ghost", &CheckKey::in_default_scope("mem")).unwrap());
        assert!(!store.deregister_node("ghost").unwrap());
    }

    #[test]
    fn test_deregister_node_removes_everything() {
        let store = InMemoryCatalogStore::new();
        store.put_service("n1", service("web")).unwrap();
        store.put_check(check("n1", "mem", None)).unwrap();
        store.put_service("n2", service("db")).unwrap();

        assert!(store.deregister_node("n1").unwrap());
        assert_eq!(store.nodes().unwrap(), vec!["n2".to_string()]);
        assert!(store.node_checks("n1").unwrap().is_empty());
    }

    #[test]
    fn test_unavailable_store_fails_every_operation() {
        let store = InMemoryCatalogStore::new();
        store.set_available(false);
        assert!(matches!(
            store.put_service("n1", service("web")),
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.nodes().is_err());

        store.set_available(true);
        assert!(store.nodes().unwrap().is_empty());
    }
}
