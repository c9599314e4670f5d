//! Service catalog agent binary.
//!
//! Registers the local node in the catalog, keeps its liveness check current
//! and runs periodic anti-entropy until shut down.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults
//! catalog-agent --node-name node-1
//!
//! # Start from a configuration file with JSON logs
//! catalog-agent --config /etc/catalog/agent.toml --log-format json
//!
//! # Print the configuration schema
//! catalog-agent config schema
//! ```

use std::io::IsTerminal;

use catalog_agent::{
    Agent,
    config::{self, Cli, CliCommand, ConfigAction, LogFormat},
    shutdown::{ShutdownTrigger, shutdown_signal},
};
use catalog_types::{CatalogError, Result, error::InternalSnafu};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(CliCommand::Config { action }) = &cli.command {
        let text = match action {
            ConfigAction::Schema => config::config_schema()?,
            ConfigAction::Example => config::config_example()?,
        };
        print!("{text}");
        return Ok(());
    }

    init_logging(cli.log_format);

    let config = config::load_config(&cli).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
    })?;

    tracing::info!(
        node = %config.node_name,
        datacenter = %config.datacenter,
        server = config.server,
        tenancy = ?config.tenancy,
        "Starting catalog agent"
    );

    let agent = Agent::new(config);
    agent.start().inspect_err(|e| tracing::error!(error = %e, "Agent startup failed"))?;

    let (trigger, shutdown_rx) = ShutdownTrigger::new();
    let job = if agent.config().anti_entropy.enabled {
        Some(agent.anti_entropy_job(shutdown_rx).start())
    } else {
        tracing::warn!("Anti-entropy disabled; local changes will not reach the catalog");
        None
    };

    tracing::info!("Agent ready");
    shutdown_signal().await;
    trigger.trigger();

    if let Some(handle) = job {
        handle.await.map_err(|e| -> CatalogError {
            InternalSnafu { message: format!("anti-entropy job aborted: {e}") }.build()
        })?;
    }

    tracing::info!("Agent shutdown complete");
    Ok(())
}

/// Initializes the logging system.
///
/// `RUST_LOG` selects the filter, defaulting to `info`. Under `Auto`, JSON is
/// used when stdout is not a terminal.
fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(fmt::layer()).init();
    }
}
