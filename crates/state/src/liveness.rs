//! Liveness check synthesis from cluster membership events.
//!
//! The liveness check is never registered by clients. It is derived from the
//! gossip layer's view of each member and written through the trusted
//! liveness path:
//!
//! | Event     | Effect                                                          |
//! |-----------|-----------------------------------------------------------------|
//! | `Alive`   | liveness check `passing`; server members get the self service   |
//! | `Failed`  | liveness check `critical`, only for nodes already in the catalog |
//! | `Left`    | node deregistered, except the local node                        |
//! | `Reaped`  | node deregistered, except the local node                        |

use std::{collections::HashSet, fmt, sync::Arc};

use catalog_types::{
    CheckEntry, HealthStatus, InternalPath, RequestOrigin, Result, ServiceEntry,
};
use tracing::{debug, info, warn};

use crate::{catalog::CatalogService, store::CatalogStore};

const ORIGIN: RequestOrigin = RequestOrigin::Internal(InternalPath::LivenessSynthesis);

/// Membership state reported by the gossip layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberStatus {
    /// The member is reachable over gossip.
    Alive,
    /// The member stopped responding.
    Failed,
    /// The member left gracefully.
    Left,
    /// The member was failed for long enough to be forgotten.
    Reaped,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Alive => "alive",
            Self::Failed => "failed",
            Self::Left => "left",
            Self::Reaped => "reaped",
        };
        f.write_str(s)
    }
}

/// One membership change.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct MemberEvent {
    /// Node name of the member.
    #[builder(into)]
    pub name: String,
    /// New membership state.
    pub status: MemberStatus,
    /// RPC port when the member is a server.
    pub server_port: Option<u16>,
}

/// What handling an event did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOutcome {
    /// The liveness check was written as passing.
    MarkedPassing,
    /// The liveness check was written as critical.
    MarkedCritical,
    /// The catalog already reflected the event.
    AlreadyCurrent,
    /// The member has no catalog record, nothing to update.
    NotInCatalog,
    /// The member's node was removed.
    Deregistered,
    /// The event concerned the local node, which never deregisters itself.
    SkippedSelf,
}

/// Writes liveness state into the catalog.
pub struct LivenessSynthesizer<S: ?Sized> {
    local_node: String,
    catalog: Arc<CatalogService<S>>,
}

impl<S: CatalogStore + ?Sized> LivenessSynthesizer<S> {
    /// Creates a synthesizer running on `local_node`.
    pub fn new(local_node: impl Into<String>, catalog: Arc<CatalogService<S>>) -> Self {
        Self { local_node: local_node.into(), catalog }
    }

    /// Applies one membership event.
    ///
    /// # Errors
    ///
    /// Returns the catalog error of the failed read or write.
    pub fn handle(&self, event: &MemberEvent) -> Result<MemberOutcome> {
        let outcome = match event.status {
            MemberStatus::Alive => self.handle_alive(event)?,
            MemberStatus::Failed => self.handle_failed(&event.name)?,
            MemberStatus::Left | MemberStatus::Reaped => self.handle_removed(&event.name)?,
        };
        debug!(member = %event.name, status = %event.status, ?outcome, "Handled member event");
        Ok(outcome)
    }

    /// Reaps every catalog node that carries the liveness check but is not in
    /// `known`. Names compare case-insensitively.
    ///
    /// Returns the reaped node names.
    ///
    /// # Errors
    ///
    /// Returns the catalog error of the failed read or deregistration.
    pub fn reconcile_reaped(&self, known: &[String]) -> Result<Vec<String>> {
        let known: HashSet<String> = known.iter().map(|name| name.to_lowercase()).collect();
        let liveness = self.catalog.classifier().liveness_check_key();
        let store = self.catalog.store();

        let mut reaped = Vec::new();
        for node in store.nodes()? {
            if known.contains(&node.to_lowercase()) {
                continue;
            }
            if store.get_check(&node, &liveness)?.is_none() {
                continue;
            }
            if self.handle_removed(&node)? == MemberOutcome::Deregistered {
                reaped.push(node);
            }
        }
        if !reaped.is_empty() {
            info!(count = reaped.len(), nodes = ?reaped, "Reaped unknown members");
        }
        Ok(reaped)
    }

    fn handle_alive(&self, event: &MemberEvent) -> Result<MemberOutcome> {
        let classifier = self.catalog.classifier();
        let reserved = classifier.reserved();
        let store = self.catalog.store();

        let service_current = match event.server_port {
            Some(port) => store
                .get_service(&event.name, &classifier.self_service_key())?
                .is_some_and(|service| service.port == port),
            None => true,
        };
        let check_current = store
            .get_check(&event.name, &classifier.liveness_check_key())?
            .is_some_and(|check| check.status == HealthStatus::Passing);
        if service_current && check_current {
            return Ok(MemberOutcome::AlreadyCurrent);
        }

        if let Some(port) = event.server_port {
            let service = ServiceEntry::builder()
                .key(classifier.self_service_key())
                .name(reserved.self_service_name())
                .port(port)
                .build();
            self.catalog.register_service(&event.name, service, ORIGIN)?;
        }
        let output = reserved.liveness_alive_output();
        let check = self.liveness_check(&event.name, HealthStatus::Passing, output);
        self.catalog.register_check(check, ORIGIN)?;
        info!(member = %event.name, "Member is alive");
        Ok(MemberOutcome::MarkedPassing)
    }

    fn handle_failed(&self, node: &str) -> Result<MemberOutcome> {
        let classifier = self.catalog.classifier();
        let already_critical = self
            .catalog
            .store()
            .get_check(node, &classifier.liveness_check_key())?
            .is_some_and(|check| check.status == HealthStatus::Critical);
        if already_critical {
            return Ok(MemberOutcome::AlreadyCurrent);
        }

        // The node may be removed concurrently, so the write re-checks it.
        let output = classifier.reserved().liveness_failed_output();
        let check = self.liveness_check(node, HealthStatus::Critical, output);
        if self.catalog.update_check(check, ORIGIN)?.is_none() {
            return Ok(MemberOutcome::NotInCatalog);
        }
        warn!(member = node, "Member failed, marking health critical");
        Ok(MemberOutcome::MarkedCritical)
    }

    fn handle_removed(&self, node: &str) -> Result<MemberOutcome> {
        if node == self.local_node {
            warn!(member = node, "Deregistering self should be done by another server");
            return Ok(MemberOutcome::SkippedSelf);
        }
        if self.catalog.deregister_node(node)? {
            Ok(MemberOutcome::Deregistered)
        } else {
            Ok(MemberOutcome::NotInCatalog)
        }
    }

    fn liveness_check(&self, node: &str, status: HealthStatus, output: &str) -> CheckEntry {
        let classifier = self.catalog.classifier();
        CheckEntry::builder()
            .key(classifier.liveness_check_key())
            .node(node)
            .name(classifier.reserved().liveness_check_name())
            .status(status)
            .output(output)
            .build()
    }
}
