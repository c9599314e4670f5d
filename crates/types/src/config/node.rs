use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ConfigError, anti_entropy::AntiEntropyConfig, limits::ValidationConfig};
use crate::{tenancy::TenancyMode, validation::validate_node_name};

/// Main configuration for a catalog agent.
///
/// # Example
///
/// ```no_run
/// # use catalog_types::config::CatalogConfig;
/// let config = CatalogConfig::builder()
///     .node_name("node-1")
///     .datacenter("dc2")
///     .build()
///     .expect("valid catalog config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogConfig {
    /// Name of the node this agent runs on.
    pub node_name: String,
    /// Datacenter the node belongs to.
    #[serde(default = "default_datacenter")]
    pub datacenter: String,
    /// Whether this agent runs in server mode and registers itself as a service.
    #[serde(default = "default_server")]
    pub server: bool,
    /// RPC port advertised by the self-registration service in server mode.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Tenancy mode used to compare scopes.
    #[serde(default)]
    pub tenancy: TenancyMode,
    /// Anti-entropy sync settings.
    #[serde(default)]
    pub anti_entropy: AntiEntropyConfig,
    /// Request validation limits.
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[bon::bon]
impl CatalogConfig {
    /// Creates a new catalog configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `node_name` or `datacenter` is
    /// empty, `node_name` holds a control character, or a nested section is
    /// invalid.
    #[builder]
    pub fn new(
        #[builder(into)] node_name: String,
        #[builder(into, default = default_datacenter())] datacenter: String,
        #[builder(default = default_server())] server: bool,
        #[builder(default = default_server_port())] server_port: u16,
        #[builder(default)] tenancy: TenancyMode,
        #[builder(default)] anti_entropy: AntiEntropyConfig,
        #[builder(default)] validation: ValidationConfig,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            node_name,
            datacenter,
            server,
            server_port,
            tenancy,
            anti_entropy,
            validation,
        };
        config.validate()?;
        Ok(config)
    }
}

impl CatalogConfig {
    /// Validates this configuration and every nested section.
    ///
    /// Call after deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_name.trim().is_empty() {
            return Err(ConfigError::Validation { message: "node_name must not be empty".into() });
        }
        validate_node_name(&self.node_name).map_err(|e| ConfigError::Validation {
            message: format!("node_name {}", e.constraint),
        })?;
        if self.datacenter.trim().is_empty() {
            return Err(ConfigError::Validation { message: "datacenter must not be empty".into() });
        }
        if self.server && self.server_port == 0 {
            return Err(ConfigError::Validation {
                message: "server_port must be non-zero in server mode".into(),
            });
        }
        self.anti_entropy.validate()?;
        self.validation.validate()
    }
}

fn default_datacenter() -> String {
    "dc1".to_string()
}

fn default_server() -> bool {
    true
}

fn default_server_port() -> u16 {
    8300
}
