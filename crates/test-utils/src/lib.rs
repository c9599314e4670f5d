//! Shared test utilities for the service catalog crates.
//!
//! - [`TestDir`] - Temporary directory with file helpers
//! - [`assert_eventually`] - Poll a condition until it holds or times out
//! - [`test_catalog_config`] - Valid catalog configuration with a fast sync interval
//! - [`strategies`] - Proptest generators for identities, scopes and entries

#![deny(unsafe_code)]
#![allow(clippy::expect_used)]

mod assertions;
mod config;
pub mod strategies;
mod test_dir;

pub use assertions::assert_eventually;
pub use config::{
    FAST_SYNC_INTERVAL, test_anti_entropy_config, test_catalog_config, test_multi_tenant_config,
};
pub use test_dir::TestDir;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use catalog_types::TenancyMode;

    use super::*;

    #[test]
    fn test_dir_write_file_round_trip() {
        let dir = TestDir::new();
        let path = dir.write_file("agent.toml", "node_name = \"n\"\n");
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "node_name = \"n\"\n");
    }

    #[test]
    fn test_dir_removed_on_drop() {
        let path = {
            let dir = TestDir::new();
            dir.write_file("x", "y");
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_assert_eventually_sees_background_change() {
        let hits = Arc::new(AtomicUsize::new(0));
        let writer = Arc::clone(&hits);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.store(3, Ordering::SeqCst);
        });
        let done = || hits.load(Ordering::SeqCst) == 3;
        let reached = assert_eventually(Duration::from_secs(2), done);
        assert!(reached.await);
    }

    #[tokio::test]
    async fn test_assert_eventually_times_out() {
        assert!(!assert_eventually(Duration::from_millis(30), || false).await);
    }

    #[test]
    fn test_config_presets_are_valid() {
        let config = test_catalog_config("node-1");
        config.validate().unwrap();
        assert_eq!(config.anti_entropy.interval, FAST_SYNC_INTERVAL);
        assert_eq!(config.tenancy, TenancyMode::Single);
        assert_eq!(test_multi_tenant_config("node-1").tenancy, TenancyMode::Multi);
    }
}
