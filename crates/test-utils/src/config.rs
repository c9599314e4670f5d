//! Catalog configuration presets for tests.

// Presets are known-valid.
#![allow(clippy::expect_used)]

use std::time::Duration;

use catalog_types::{
    TenancyMode,
    config::{AntiEntropyConfig, CatalogConfig},
};

/// Shortest anti-entropy interval the configuration accepts.
pub const FAST_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Returns a valid single-tenant configuration for `node_name` with a fast sync interval.
#[must_use]
pub fn test_catalog_config(node_name: &str) -> CatalogConfig {
    CatalogConfig::builder()
        .node_name(node_name)
        .anti_entropy(test_anti_entropy_config())
        .build()
        .expect("test catalog config is valid")
}

/// Same as [`test_catalog_config`] with multi-tenant scoping.
#[must_use]
pub fn test_multi_tenant_config(node_name: &str) -> CatalogConfig {
    CatalogConfig { tenancy: TenancyMode::Multi, ..test_catalog_config(node_name) }
}

/// Anti-entropy settings using [`FAST_SYNC_INTERVAL`].
#[must_use]
pub fn test_anti_entropy_config() -> AntiEntropyConfig {
    AntiEntropyConfig::builder()
        .interval(FAST_SYNC_INTERVAL)
        .build()
        .expect("test anti-entropy config is valid")
}
