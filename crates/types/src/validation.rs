//! Input validation for registration request fields.
//!
//! ## Character Whitelists
//!
//! - Service and check IDs: any printable characters, no control characters.
//! - Partition and namespace names: `[a-z0-9-]{1,63}`, DNS-safe labels.

use std::fmt;

use crate::{config::ValidationConfig, tenancy::TenancyScope};

/// Maximum length of a partition or namespace name (one DNS label).
pub const MAX_SCOPE_NAME_BYTES: usize = 63;

/// Validation error with structured context.
///
/// Contains the specific constraint that was violated and the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validates a service or check identifier.
///
/// Identifiers must:
/// - Be non-empty
/// - Not exceed `config.max_id_bytes` in UTF-8 byte length
/// - Contain no control characters
///
/// # Errors
///
/// Returns [`ValidationError`] naming `field` if any rule is violated.
pub fn validate_id(
    id: &str,
    field: &str,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: "must not be empty".to_string(),
        });
    }
    if id.len() > config.max_id_bytes {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!(
                "length {} bytes exceeds maximum {} bytes",
                id.len(),
                config.max_id_bytes
            ),
        });
    }
    if let Some(pos) = id.find(char::is_control) {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!("contains a control character at byte offset {pos}"),
        });
    }
    Ok(())
}

/// Validates a node name.
///
/// # Errors
///
/// Returns [`ValidationError`] if the name is empty or contains control characters.
pub fn validate_node_name(node: &str) -> Result<(), ValidationError> {
    if node.is_empty() {
        return Err(ValidationError {
            field: "node".to_string(),
            constraint: "must not be empty".to_string(),
        });
    }
    if let Some(pos) = node.find(char::is_control) {
        return Err(ValidationError {
            field: "node".to_string(),
            constraint: format!("contains a control character at byte offset {pos}"),
        });
    }
    Ok(())
}

/// Validates both components of a tenancy scope.
///
/// Partition and namespace names must:
/// - Not exceed 63 bytes
/// - Contain only `[a-z0-9-]`
/// - Not start or end with a hyphen
///
/// # Errors
///
/// Returns [`ValidationError`] for the first offending component.
pub fn validate_scope(scope: &TenancyScope) -> Result<(), ValidationError> {
    validate_scope_name(scope.partition(), "partition")?;
    validate_scope_name(scope.namespace(), "namespace")
}

fn validate_scope_name(name: &str, field: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_SCOPE_NAME_BYTES {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!(
                "length {} bytes exceeds maximum {} bytes",
                name.len(),
                MAX_SCOPE_NAME_BYTES
            ),
        });
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: "must not start or end with a hyphen".to_string(),
        });
    }
    if let Some(pos) = name.find(|c: char| !is_scope_char(c)) {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!(
                "contains invalid character {:?} at byte offset {}; allowed: [a-z0-9-]",
                name[pos..].chars().next().unwrap_or('\0'),
                pos
            ),
        });
    }
    Ok(())
}

#[inline]
fn is_scope_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}
