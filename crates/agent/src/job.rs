//! Periodic anti-entropy background job.
//!
//! ## Behavior
//!
//! - Runs a full sync pass on every tick, the first one immediately
//! - Runs a partial sync pass whenever the local view changes
//! - A failed pass is logged and retried on the next tick
//! - Stops when the shutdown receiver flips to `true` or its sender is dropped

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use catalog_state::{AntiEntropySyncer, CatalogStore, SyncReport};
use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

/// Default interval between passes (1 minute).
const SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Anti-entropy job pushing the local view into the catalog.
#[derive(bon::Builder)]
pub struct AntiEntropyJob<S: CatalogStore + 'static> {
    /// Syncer run on every tick.
    syncer: Arc<AntiEntropySyncer<S>>,
    /// Interval between passes.
    #[builder(default = SYNC_INTERVAL)]
    interval: Duration,
    /// Flips to `true` on shutdown.
    shutdown: watch::Receiver<bool>,
    /// Count of full and partial passes that completed, clean or not.
    #[builder(default)]
    passes: Arc<AtomicU64>,
}

impl<S: CatalogStore + 'static> AntiEntropyJob<S> {
    /// Handle to the completed-pass counter.
    pub fn passes(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.passes)
    }

    fn run_cycle(&self) {
        self.record("Anti-entropy pass", self.syncer.sync_full());
    }

    fn run_changes(&self) {
        self.record("Partial sync", self.syncer.sync_changes());
    }

    fn record(&self, pass: &str, result: catalog_types::Result<SyncReport>) {
        match result {
            Ok(report) if report.is_clean() => debug!(pass, ?report, "Sync finished"),
            Ok(report) => warn!(pass, failures = report.failures, "Sync finished with failures"),
            Err(e) => warn!(pass, error = %e, retryable = e.is_retryable(), "Sync failed"),
        }
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    /// Starts the job on the current runtime.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut shutdown = self.shutdown.clone();
            let changes = self.syncer.changes();
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval_secs = self.interval.as_secs_f64(), "Anti-entropy job started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_cycle(),
                    () = changes.notified() => self.run_changes(),
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    },
                }
            }
            info!("Anti-entropy job stopped");
        })
    }
}
