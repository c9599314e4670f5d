//! Input validation limits for registration requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound accepted for `max_id_bytes`.
const MAX_ID_BYTES_CEILING: usize = 4096;

/// Input validation configuration for registration requests.
///
/// # Validation Rules
///
/// - `max_id_bytes` must be 1-4096
///
/// # Example
///
/// ```no_run
/// # use catalog_types::config::ValidationConfig;
/// let config = ValidationConfig::builder()
///     .max_id_bytes(128)
///     .build()
///     .expect("valid validation config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationConfig {
    /// Maximum service or check ID size in bytes.
    ///
    /// IDs exceeding this limit are rejected with `INVALID_ARGUMENT`.
    /// Default: 256.
    #[serde(default = "default_max_id_bytes")]
    pub max_id_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_id_bytes: default_max_id_bytes() }
    }
}

#[bon::bon]
impl ValidationConfig {
    /// Creates a new validation configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `max_id_bytes` is outside 1-4096.
    #[builder]
    pub fn new(
        #[builder(default = default_max_id_bytes())] max_id_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { max_id_bytes };
        config.validate()?;
        Ok(config)
    }
}

impl ValidationConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_id_bytes == 0 || self.max_id_bytes > MAX_ID_BYTES_CEILING {
            return Err(ConfigError::Validation {
                message: format!(
                    "max_id_bytes must be 1-{}, got {}",
                    MAX_ID_BYTES_CEILING, self.max_id_bytes
                ),
            });
        }
        Ok(())
    }
}

const fn default_max_id_bytes() -> usize {
    256
}
