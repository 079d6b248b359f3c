//! # Helixer Agent
//!
//! Bridges home-automation state changes to a Sparkplug-style MQTT namespace.
//!
//! ## Architecture
//!
//! 1. **Source**: Reads newline-delimited state-changed events from stdin
//! 2. **Hub**: Fans events out to filtered subscribers
//! 3. **Bridge**: Encodes each change into delta metrics and publishes it
//!    over an authenticated, optionally TLS-secured MQTT session

use anyhow::{Context, Result};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod hub;
mod runtime;
mod source;

pub use config::BridgeConfig;
pub use runtime::Bridge;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Helixer Agent"
    );

    let config = BridgeConfig::from_env()?;

    tracing::info!(
        client_id = %config.transport.client_id,
        tls = config.credentials.certificates.is_some(),
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(Bridge::new(config).run());

    // A pending stdin read keeps its blocking thread until the next line arrives
    runtime.shutdown_timeout(Duration::from_secs(1));

    result
}
