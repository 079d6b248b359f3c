//! Bridge configuration.

use crate::hub::EntityFilter;
use anyhow::{bail, Context, Result};
use helixer_proto::TopicScheme;
use helixer_transport::{parse_qos, Credentials, TransportConfig};
use std::time::Duration;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Broker host name or address
    pub broker_host: String,

    /// Broker port
    pub broker_port: u16,

    /// Broker credentials and TLS material
    pub credentials: Credentials,

    /// MQTT session settings
    pub transport: TransportConfig,

    /// Topic scheme, base path already normalized
    pub topics: TopicScheme,

    /// Which entities to forward
    pub filter: EntityFilter,
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HELIXER_BROKER_HOST`: Broker host (required)
    /// - `HELIXER_BROKER_PORT`: Broker port, 1-65535 (default 8883)
    /// - `HELIXER_USERNAME` / `HELIXER_PASSWORD`: Broker credentials
    /// - `HELIXER_CA_CERT`, `HELIXER_CLIENT_CERT`, `HELIXER_CLIENT_KEY`:
    ///   PEM text, or the same names with a `_FILE` suffix for a path
    /// - `HELIXER_BASE_PATH`: Topic base path (default `helixer`)
    /// - `HELIXER_CLIENT_ID`: MQTT client id (default random)
    /// - `HELIXER_QOS`: 0, 1 or 2 (default 0)
    /// - `HELIXER_KEEP_ALIVE_SECS`, `HELIXER_CONNECT_TIMEOUT_SECS`
    /// - `HELIXER_RECONNECT`: `true`/`false` (default true)
    /// - `HELIXER_INCLUDE_DOMAINS`: Comma-separated entity domains
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a required key is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let broker_host = var("HELIXER_BROKER_HOST").context("HELIXER_BROKER_HOST is required")?;

        let broker_port = match var("HELIXER_BROKER_PORT") {
            Some(port) => parse_port(&port).context("Invalid HELIXER_BROKER_PORT")?,
            None => 8883,
        };

        let credentials =
            Credentials::from_lookup(&lookup).context("Invalid broker credentials")?;

        let mut transport = TransportConfig::default();

        if let Some(client_id) = var("HELIXER_CLIENT_ID") {
            transport.client_id = client_id;
        }

        if let Some(qos) = var("HELIXER_QOS") {
            transport.qos = qos
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(parse_qos)
                .with_context(|| format!("Invalid HELIXER_QOS '{qos}': expected 0, 1 or 2"))?;
        }

        if let Some(secs) = var("HELIXER_KEEP_ALIVE_SECS") {
            transport.keep_alive = parse_secs(&secs).context("Invalid HELIXER_KEEP_ALIVE_SECS")?;
        }

        if let Some(secs) = var("HELIXER_CONNECT_TIMEOUT_SECS") {
            transport.connect_timeout =
                parse_secs(&secs).context("Invalid HELIXER_CONNECT_TIMEOUT_SECS")?;
        }

        if let Some(flag) = var("HELIXER_RECONNECT") {
            transport.auto_reconnect = parse_bool(&flag).context("Invalid HELIXER_RECONNECT")?;
        }

        let topics = TopicScheme::new(var("HELIXER_BASE_PATH").unwrap_or_else(|| "helixer".into()));

        let filter = var("HELIXER_INCLUDE_DOMAINS").map_or(EntityFilter::All, |domains| {
            EntityFilter::domains(domains.split(','))
        });

        Ok(Self {
            broker_host,
            broker_port,
            credentials,
            transport,
            topics,
            filter,
        })
    }
}

fn parse_port(input: &str) -> Result<u16> {
    let port: u16 = input
        .trim()
        .parse()
        .with_context(|| format!("'{input}' is not a port number"))?;
    if port == 0 {
        bail!("port must be between 1 and 65535");
    }
    Ok(port)
}

fn parse_secs(input: &str) -> Result<Duration> {
    let secs: u64 = input
        .trim()
        .parse()
        .with_context(|| format!("'{input}' is not a number of seconds"))?;
    if secs == 0 {
        bail!("must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(input: &str) -> Result<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("'{other}' is not a boolean"),
    }
}
