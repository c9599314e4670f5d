//! Error types for the service catalog using snafu.
//!
//! Defines the error hierarchy for catalog operations:
//! - Policy errors (reserved identity conflicts)
//! - Validation errors (malformed identifiers)
//! - Store errors (passed through from the catalog store)
//!
//! Each error variant maps to an [`ErrorCode`] with a unique numeric identifier,
//! retryability classification, and suggested recovery action.

use core::fmt;

use snafu::{Location, Snafu};

use crate::validation::ValidationError;

/// Unified result type for catalog operations.
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

/// Machine-readable error codes for programmatic error handling.
///
/// | Range       | Domain      | Examples                                |
/// |-------------|-------------|-----------------------------------------|
/// | 1000–1099   | Store       | Store unavailable, foreign node         |
/// | 3000–3099   | Application | Reserved identity conflict              |
/// | 3200–3299   | Application | Invalid argument, config, internal      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Catalog store could not serve the request.
    StoreUnavailable = 1000,
    /// Store only holds entries for another node.
    StoreForeignNode = 1001,

    /// Untrusted caller targeted a reserved identity.
    AppReservedIdentityConflict = 3000,
    /// Invalid request argument.
    AppInvalidArgument = 3200,
    /// Configuration error.
    AppConfig = 3201,
    /// Internal error (unexpected state, invariant violation).
    AppInternal = 3204,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::StoreUnavailable),
            1001 => Some(Self::StoreForeignNode),
            3000 => Some(Self::AppReservedIdentityConflict),
            3200 => Some(Self::AppInvalidArgument),
            3201 => Some(Self::AppConfig),
            3204 => Some(Self::AppInternal),
            _ => None,
        }
    }

    /// Whether this error is retryable.
    ///
    /// A reserved identity conflict is a policy violation and never retryable.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::StoreUnavailable => "Retry with backoff once the catalog store is reachable.",
            Self::StoreForeignNode => "Address the request to the agent running on that node.",
            Self::AppReservedIdentityConflict => {
                "Choose a different ID or scope. Reserved entries are managed by the agent itself."
            },
            Self::AppInvalidArgument => "Fix the request parameters and resubmit.",
            Self::AppConfig => "Fix the configuration value and restart the agent.",
            Self::AppInternal => {
                "Unexpected state or invariant violation. Collect context and report as an issue."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Kind of catalog entry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A service registration.
    Service,
    /// A health check registration.
    Check,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => f.write_str("service"),
            Self::Check => f.write_str("check"),
        }
    }
}

/// Mutation rejected by a policy gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Create or overwrite.
    Register,
    /// Delete.
    Deregister,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => f.write_str("register"),
            Self::Deregister => f.write_str("deregister"),
        }
    }
}

/// Top-level error type for catalog operations.
///
/// # Recovery Guide
///
/// | Variant                    | Retryable | Recovery Action                              |
/// | -------------------------- | --------- | -------------------------------------------- |
/// | `ReservedIdentityConflict` | No        | Use another ID or scope                      |
/// | `InvalidArgument`          | No        | Fix the request parameters                   |
/// | `Store`                    | Maybe     | Depends on the wrapped store error           |
/// | `Config`                   | No        | Fix configuration and restart                |
/// | `Internal`                 | No        | Unexpected state; report as issue            |
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CatalogError {
    /// An untrusted caller tried to create, overwrite or delete a reserved entry.
    ///
    /// **Recovery**: Not retryable. Reserved entries are written only by the
    /// agent's own self-registration, liveness and node deregistration paths.
    #[snafu(display("cannot {mutation} reserved {kind} '{key}': it is managed by the agent"))]
    ReservedIdentityConflict {
        /// Entry kind.
        kind: EntryKind,
        /// Rendered identity key.
        key: String,
        /// Attempted mutation.
        mutation: Mutation,
    },

    /// Malformed request parameter.
    ///
    /// **Recovery**: Not retryable. Fix the request parameters and resubmit.
    #[snafu(display("Invalid argument: {message}"))]
    InvalidArgument {
        /// Error description.
        message: String,
    },

    /// Error reported by the catalog store, passed through unchanged.
    #[snafu(display("{source}"), context(false))]
    Store {
        /// Underlying store error.
        source: StoreError,
    },

    /// Configuration error (invalid value or constraint violation).
    ///
    /// **Recovery**: Not retryable. Fix the configuration value and restart.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// Internal error (unexpected state, invariant violation).
    #[snafu(display("Internal error at {location}: {message}"))]
    Internal {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },
}

impl CatalogError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ReservedIdentityConflict { .. } => ErrorCode::AppReservedIdentityConflict,
            Self::InvalidArgument { .. } => ErrorCode::AppInvalidArgument,
            Self::Store { source } => source.code(),
            Self::Config { .. } => ErrorCode::AppConfig,
            Self::Internal { .. } => ErrorCode::AppInternal,
        }
    }

    /// Whether this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Suggested recovery action for this error.
    #[must_use]
    pub const fn suggested_action(&self) -> &'static str {
        self.code().suggested_action()
    }

    /// Whether this error is a reserved identity conflict.
    #[must_use]
    pub const fn is_reserved_conflict(&self) -> bool {
        matches!(self, Self::ReservedIdentityConflict { .. })
    }
}

impl From<ValidationError> for CatalogError {
    fn from(err: ValidationError) -> Self {
        CatalogError::InvalidArgument { message: err.to_string() }
    }
}

/// Errors from the catalog store collaborator.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// The store cannot serve reads or writes right now.
    ///
    /// **Recovery**: Retry with backoff.
    #[snafu(display("Catalog store unavailable: {message}"))]
    Unavailable {
        /// Error description.
        message: String,
    },

    /// A single-node store was asked about a different node.
    ///
    /// **Recovery**: Not retryable. Send the request to the owning agent.
    #[snafu(display("Store holds node '{expected}', not '{node}'"))]
    ForeignNode {
        /// Node named in the request.
        node: String,
        /// Node the store belongs to.
        expected: String,
    },
}

impl StoreError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable { .. } => ErrorCode::StoreUnavailable,
            Self::ForeignNode { .. } => ErrorCode::StoreForeignNode,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn all_error_codes() -> Vec<ErrorCode> {
        vec![
            ErrorCode::StoreUnavailable,
            ErrorCode::StoreForeignNode,
            ErrorCode::AppReservedIdentityConflict,
            ErrorCode::AppInvalidArgument,
            ErrorCode::AppConfig,
            ErrorCode::AppInternal,
        ]
    }

    #[test]
    fn test_error_codes_unique_and_round_trip() {
        let codes = all_error_codes();
        let numeric: HashSet<u16> = codes.iter().map(|c| c.as_u16()).collect();
        assert_eq!(numeric.len(), codes.len());
        for code in codes {
            assert_eq!(ErrorCode::from_u16(code.as_u16()), Some(code));
        }
        assert_eq!(ErrorCode::from_u16(9999), None);
    }

    #[test]
    fn test_reserved_conflict_display_and_code() {
        let err = CatalogError::ReservedIdentityConflict {
            kind: EntryKind::Service,
            key: "consul".to_string(),
            mutation: Mutation::Deregister,
        };
        assert_eq!(
            err.to_string(),
            "cannot deregister reserved service 'consul': it is managed by the agent"
        );
        assert_eq!(err.code(), ErrorCode::AppReservedIdentityConflict);
        assert!(!err.is_retryable());
        assert!(err.is_reserved_conflict());
    }

    #[test]
    fn test_store_error_passes_through() {
        fn read() -> Result<()> {
            Err(StoreError::Unavailable { message: "leader lost".to_string() })?;
            Ok(())
        }
        let err = read().unwrap_err();
        assert_eq!(err.to_string(), "Catalog store unavailable: leader lost");
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
        assert!(err.is_retryable());
        assert!(matches!(err, CatalogError::Store { source: StoreError::Unavailable { .. } }));
    }

    #[test]
    fn test_validation_error_maps_to_invalid_argument() {
        let err: CatalogError =
            ValidationError { field: "id".to_string(), constraint: "must not be empty".to_string() }
                .into();
        assert_eq!(err.code(), ErrorCode::AppInvalidArgument);
        assert_eq!(err.to_string(), "Invalid argument: id: must not be empty");
    }

    #[test]
    fn test_every_code_has_an_action() {
        for code in all_error_codes() {
            assert!(!code.suggested_action().is_empty());
        }
    }
}
