//! Core types, errors, and reserved-identity classification for the service catalog.
//!
//! This crate provides the foundational types used throughout the catalog:
//! - Identity keys (`ServiceKey`, `CheckKey`) qualified by a tenancy scope
//! - Tenancy resolvers for single- and multi-tenant deployments
//! - The reserved identity set and its classifier
//! - Catalog entries and request origins
//! - Error types using snafu
//! - Configuration and input validation

pub mod config;
pub mod entry;
pub mod error;
pub mod identity;
pub mod reserved;
pub mod tenancy;
pub mod validation;

// Re-export commonly used types at crate root
pub use entry::{
    CheckEntry, HealthStatus, InternalPath, RequestOrigin, ServiceEntry, WriteStatus,
};
pub use error::{CatalogError, EntryKind, ErrorCode, Mutation, Result, StoreError};
pub use identity::{CheckId, CheckKey, IdentityKey, ServiceId, ServiceKey};
pub use reserved::{ReservedIdentityClassifier, ReservedIdentitySet};
pub use tenancy::{MultiTenant, SingleTenant, TenancyMode, TenancyResolver, TenancyScope};
