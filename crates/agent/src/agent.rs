//! Agent assembly and startup.
//!
//! The agent keeps two stores: its local view ([`LocalState`]) and the catalog
//! it syncs into. In this build the catalog is an in-process
//! [`InMemoryCatalogStore`]. Both sit behind a [`CatalogService`], so the
//! reserved-identity gates apply to local and catalog writes alike.

use std::sync::Arc;

use catalog_state::{
    AntiEntropySyncer, CatalogService, InMemoryCatalogStore, LivenessSynthesizer, LocalState,
    MemberEvent, MemberOutcome, MemberStatus, SyncReport,
};
use catalog_types::{
    InternalPath, RequestOrigin, ReservedIdentityClassifier, Result, ServiceEntry,
    config::CatalogConfig,
};
use tokio::sync::watch;
use tracing::info;

use crate::job::AntiEntropyJob;

/// A running catalog agent for one node.
pub struct Agent {
    config: CatalogConfig,
    local: Arc<LocalState>,
    local_catalog: Arc<CatalogService<LocalState>>,
    catalog: Arc<CatalogService<InMemoryCatalogStore>>,
    syncer: Arc<AntiEntropySyncer<InMemoryCatalogStore>>,
    liveness: LivenessSynthesizer<InMemoryCatalogStore>,
}

impl Agent {
    /// Wires the stores, policy gates and syncer for `config`.
    pub fn new(config: CatalogConfig) -> Self {
        let classifier = Arc::new(ReservedIdentityClassifier::new(config.tenancy.resolver()));
        let local = Arc::new(LocalState::new(config.node_name.clone()));
        let local_catalog = Arc::new(CatalogService::new(
            Arc::clone(&classifier),
            config.validation.clone(),
            Arc::clone(&local),
        ));
        let catalog = Arc::new(CatalogService::new(
            classifier,
            config.validation.clone(),
            Arc::new(InMemoryCatalogStore::new()),
        ));
        let syncer = Arc::new(AntiEntropySyncer::new(Arc::clone(&local), Arc::clone(&catalog)));
        let liveness = LivenessSynthesizer::new(config.node_name.clone(), Arc::clone(&catalog));
        Self { config, local, local_catalog, catalog, syncer, liveness }
    }

    /// Configuration the agent runs with.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Policy-checked access to the local view.
    pub fn local_catalog(&self) -> &Arc<CatalogService<LocalState>> {
        &self.local_catalog
    }

    /// Policy-checked access to the catalog.
    pub fn catalog(&self) -> &Arc<CatalogService<InMemoryCatalogStore>> {
        &self.catalog
    }

    /// Registers the agent itself, reports it alive, and runs a first sync.
    ///
    /// In server mode the self-registration service is added to the local
    /// view through the trusted self-registration path.
    ///
    /// # Errors
    ///
    /// Returns the catalog error of the failed step.
    pub fn start(&self) -> Result<SyncReport> {
        let node = self.local.node();
        let server_port = self.config.server.then_some(self.config.server_port);

        if let Some(port) = server_port {
            let classifier = self.local_catalog.classifier();
            let service = ServiceEntry::builder()
                .key(classifier.self_service_key())
                .name(classifier.reserved().self_service_name())
                .port(port)
                .build();
            self.local_catalog.register_service(
                node,
                service,
                RequestOrigin::Internal(InternalPath::SelfRegistration),
            )?;
        }

        let alive = MemberEvent::builder()
            .name(node)
            .status(MemberStatus::Alive)
            .maybe_server_port(server_port)
            .build();
        self.handle_member(&alive)?;

        let report = self.syncer.sync_full()?;
        info!(
            node,
            datacenter = %self.config.datacenter,
            server = self.config.server,
            "Agent registered in catalog"
        );
        Ok(report)
    }

    /// Feeds a membership event to the liveness synthesizer.
    ///
    /// # Errors
    ///
    /// Returns the catalog error of the failed write.
    pub fn handle_member(&self, event: &MemberEvent) -> Result<MemberOutcome> {
        self.liveness.handle(event)
    }

    /// Builds the periodic anti-entropy job stopping on `shutdown`.
    pub fn anti_entropy_job(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> AntiEntropyJob<InMemoryCatalogStore> {
        AntiEntropyJob::builder()
            .syncer(Arc::clone(&self.syncer))
            .interval(self.config.anti_entropy.interval)
            .shutdown(shutdown)
            .build()
    }
}
