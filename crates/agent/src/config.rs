//! Agent command line and configuration loading.
//!
//! Configuration comes from an optional TOML file. `--node-name` overrides the
//! file's `node_name`, and is required when no file is given. Every other
//! field falls back to its default.

use std::path::{Path, PathBuf};

use catalog_types::{
    Result,
    config::CatalogConfig,
    error::{ConfigSnafu, InternalSnafu},
};
use clap::{Parser, Subcommand, ValueEnum};
use snafu::ensure;

/// Command line of the catalog agent.
#[derive(Debug, Parser)]
#[command(name = "catalog-agent", version, about = "Service catalog agent")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "CATALOG_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Node name, overriding the configuration file.
    #[arg(long, env = "CATALOG_AGENT_NODE_NAME")]
    pub node_name: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Auto, env = "CATALOG_AGENT_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Utility subcommand; the agent runs when omitted.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// JSON when stdout is not a terminal, text otherwise.
    Auto,
    /// Human-readable text.
    Text,
    /// One JSON object per line.
    Json,
}

/// Utility subcommands.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Configuration helpers.
    Config {
        /// Helper to run.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration helpers.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the JSON schema of the configuration file.
    Schema,
    /// Print an example configuration file.
    Example,
}

/// Loads and validates the configuration selected by `cli`.
///
/// # Errors
///
/// Returns [`CatalogError::Config`](catalog_types::CatalogError::Config)
/// when the file cannot be read or parsed, the node name is missing, or a
/// value fails validation.
pub fn load_config(cli: &Cli) -> Result<CatalogConfig> {
    let mut table = match &cli.config {
        Some(path) => read_table(path)?,
        None => toml::Table::new(),
    };
    if let Some(name) = &cli.node_name {
        table.insert("node_name".to_string(), toml::Value::String(name.clone()));
    }
    ensure!(
        table.contains_key("node_name"),
        ConfigSnafu { message: "node_name must be set with --node-name or in the config file" }
    );

    let config: CatalogConfig = table
        .try_into()
        .map_err(|e| ConfigSnafu { message: format!("invalid configuration: {e}") }.build())?;
    config.validate().map_err(|e| ConfigSnafu { message: e.to_string() }.build())?;
    Ok(config)
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ConfigSnafu { message: format!("failed to read {}: {e}", path.display()) }.build()
    })?;
    text.parse::<toml::Table>().map_err(|e| {
        ConfigSnafu { message: format!("failed to parse {}: {e}", path.display()) }.build()
    })
}

/// JSON schema of [`CatalogConfig`].
///
/// # Errors
///
/// Returns [`CatalogError::Internal`](catalog_types::CatalogError::Internal)
/// if the schema cannot be serialized.
pub fn config_schema() -> Result<String> {
    let schema = schemars::schema_for!(CatalogConfig);
    serde_json::to_string_pretty(&schema)
        .map_err(|e| InternalSnafu { message: format!("schema serialization: {e}") }.build())
}

/// Example configuration file with every default spelled out.
///
/// # Errors
///
/// Returns [`CatalogError::Config`](catalog_types::CatalogError::Config) if
/// the example fails validation, or
/// [`CatalogError::Internal`](catalog_types::CatalogError::Internal) if it
/// cannot be rendered.
pub fn config_example() -> Result<String> {
    let config = CatalogConfig::builder()
        .node_name("node-1")
        .build()
        .map_err(|e| ConfigSnafu { message: e.to_string() }.build())?;
    toml::to_string_pretty(&config)
        .map_err(|e| InternalSnafu { message: format!("example rendering: {e}") }.build())
}
