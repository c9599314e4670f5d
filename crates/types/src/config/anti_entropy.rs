//! Anti-entropy sync scheduling.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Shortest accepted interval between full syncs.
const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the periodic anti-entropy sync.
///
/// # Validation Rules
///
/// - `interval` must be >= 1s
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AntiEntropyConfig {
    /// Whether the periodic sync runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Interval between full syncs.
    #[serde(default = "default_interval")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub interval: Duration,
}

#[bon::bon]
impl AntiEntropyConfig {
    /// Creates a new anti-entropy configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `interval` is below one second.
    #[builder]
    pub fn new(
        #[builder(default = default_enabled())] enabled: bool,
        #[builder(default = default_interval())] interval: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self { enabled, interval };
        config.validate()?;
        Ok(config)
    }
}

impl AntiEntropyConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval < MIN_SYNC_INTERVAL {
            return Err(ConfigError::Validation {
                message: format!(
                    "anti_entropy.interval must be >= {:?}, got {:?}",
                    MIN_SYNC_INTERVAL, self.interval
                ),
            });
        }
        Ok(())
    }
}

impl Default for AntiEntropyConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), interval: default_interval() }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> Duration {
    Duration::from_secs(60)
}
