//! Catalog state and reserved-identity enforcement.
//!
//! This crate sits between the pure classification in `catalog-types` and the
//! agent binary, providing:
//!
//! - The catalog store abstraction and an in-memory implementation
//! - Registration validation and deregistration guarding for reserved identities
//! - Anti-entropy reconciliation with the reserved-entry removal exemption
//! - The agent's local view and the full and partial sync passes that push it
//! - Liveness check synthesis from membership events

#![deny(unsafe_code)]

mod anti_entropy;
mod catalog;
mod deregistration;
mod liveness;
mod local;
mod registration;
mod store;
mod sync;

pub use anti_entropy::{AntiEntropyReconciler, CatalogEntry, SyncPlan};
pub use catalog::CatalogService;
pub use deregistration::DeregistrationGuard;
pub use liveness::{LivenessSynthesizer, MemberEvent, MemberOutcome, MemberStatus};
pub use local::{LocalState, PendingChanges};
pub use registration::RegistrationValidator;
pub use store::{CatalogStore, InMemoryCatalogStore, StoreResult};
pub use sync::{AntiEntropySyncer, BucketCounts, SyncReport};
