//! Service catalog agent library.
//!
//! Provides configuration loading, agent assembly, the periodic anti-entropy
//! job and shutdown handling used by the `catalog-agent` binary.

#![deny(unsafe_code)]

pub mod agent;
pub mod config;
pub mod job;
pub mod shutdown;

pub use agent::Agent;
