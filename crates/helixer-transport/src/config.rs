//! Transport settings and credential material.

use crate::error::TransportError;
use rumqttc::QoS;
use std::time::Duration;

/// Session settings for [`MqttTransport`](crate::MqttTransport).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// MQTT client identifier
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Upper bound for establishing a session
    pub connect_timeout: Duration,
    /// Reconnect after unexpected disconnects
    pub auto_reconnect: bool,
    /// Pause between reconnect attempts
    pub reconnect_delay: Duration,
    /// Quality of service for publishes
    pub qos: QoS,
    /// Capacity of the client request channel
    pub channel_capacity: usize,
    /// How long `disconnect` waits for the DISCONNECT to be flushed
    pub disconnect_grace: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            client_id: format!("helixer-{}", uuid::Uuid::new_v4().simple()),
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(5),
            qos: QoS::AtMostOnce,
            channel_capacity: 100,
            disconnect_grace: Duration::from_secs(1),
        }
    }
}

/// Map a numeric QoS level (0, 1, 2) to [`QoS`].
#[must_use]
pub fn parse_qos(level: u8) -> Option<QoS> {
    match level {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

/// Authentication material for a session.
///
/// Username/password and certificates are independent; either, both or
/// neither may be set.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Broker username
    pub username: Option<String>,
    /// Broker password
    pub password: Option<String>,
    /// PEM material for TLS
    pub certificates: Option<CertificateBundle>,
}

impl Credentials {
    /// Username/password credentials.
    #[must_use]
    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            certificates: None,
        }
    }

    /// Read credentials from the process environment.
    ///
    /// See [`Credentials::from_lookup`] for the variables consulted.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if PEM material cannot be read or
    /// a client certificate/key is given without a CA certificate.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials from an arbitrary key lookup.
    ///
    /// - `HELIXER_USERNAME` / `HELIXER_PASSWORD`
    /// - `HELIXER_CA_CERT`, `HELIXER_CLIENT_CERT`, `HELIXER_CLIENT_KEY`:
    ///   PEM text, or the same names with a `_FILE` suffix for a path
    ///
    /// Blank values count as unset. TLS is configured only when a CA
    /// certificate is present.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if a `_FILE` path cannot be read
    /// or a client certificate/key is given without a CA certificate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TransportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ca_cert = pem(&var, "HELIXER_CA_CERT")?;
        let client_cert = pem(&var, "HELIXER_CLIENT_CERT")?;
        let client_key = pem(&var, "HELIXER_CLIENT_KEY")?;

        let certificates = match ca_cert {
            Some(ca_cert) => Some(CertificateBundle {
                ca_cert,
                client_cert,
                client_key,
            }),
            None if client_cert.is_some() || client_key.is_some() => {
                return Err(TransportError::Client(
                    "HELIXER_CLIENT_CERT/HELIXER_CLIENT_KEY require HELIXER_CA_CERT".to_string(),
                ))
            }
            None => None,
        };

        Ok(Self {
            username: var("HELIXER_USERNAME"),
            password: var("HELIXER_PASSWORD"),
            certificates,
        })
    }
}

fn pem<F>(var: &F, key: &str) -> Result<Option<String>, TransportError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(text) = var(key) {
        return Ok(Some(text));
    }

    let file_key = format!("{key}_FILE");
    match var(&file_key) {
        Some(path) => std::fs::read_to_string(&path).map(Some).map_err(|e| {
            TransportError::Client(format!("failed to read {file_key} ({path}): {e}"))
        }),
        None => Ok(None),
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("certificates", &self.certificates)
            .finish()
    }
}

/// PEM-encoded certificate material, supplied as text.
#[derive(Clone)]
pub struct CertificateBundle {
    /// CA certificate used to verify the broker
    pub ca_cert: String,
    /// Client certificate for mutual TLS
    pub client_cert: Option<String>,
    /// Client private key for mutual TLS
    pub client_key: Option<String>,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("ca_cert_len", &self.ca_cert.len())
            .field("client_cert", &self.client_cert.is_some())
            .field("client_key", &self.client_key.is_some())
            .finish()
    }
}
