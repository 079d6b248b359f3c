//! Session-scoped staging of TLS credential material.
//!
//! PEM text from the caller is validated and copied into buffers owned by
//! exactly one session. The buffers are overwritten with zeros when the
//! session releases them, on every teardown path including drop.

use crate::config::CertificateBundle;
use crate::error::TransportError;
use rumqttc::Transport;

/// TLS material staged for one broker session.
pub struct StagedCredentials {
    ca: Vec<u8>,
    identity: Option<(Vec<u8>, Vec<u8>)>,
    released: bool,
}

impl StagedCredentials {
    /// Validate and stage a certificate bundle.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if any part is not PEM-encoded or
    /// if only one of client certificate and client key is present.
    pub fn stage(bundle: &CertificateBundle) -> Result<Self, TransportError> {
        let ca = pem_bytes("CA certificate", &bundle.ca_cert)?;

        let identity = match (&bundle.client_cert, &bundle.client_key) {
            (Some(cert), Some(key)) => Some((
                pem_bytes("client certificate", cert)?,
                pem_bytes("client key", key)?,
            )),
            (None, None) => None,
            _ => {
                return Err(TransportError::Client(
                    "client certificate and client key must be supplied together".to_string(),
                ))
            }
        };

        tracing::debug!(
            ca_len = ca.len(),
            client_auth = identity.is_some(),
            "Staged TLS credentials"
        );

        Ok(Self {
            ca,
            identity,
            released: false,
        })
    }

    /// Whether a client certificate/key pair is staged.
    #[must_use]
    pub fn has_client_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Whether the material has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Build the TLS transport for the handshake.
    ///
    /// # Errors
    ///
    /// Returns error if the material was already released.
    pub fn transport(&self) -> Result<Transport, TransportError> {
        if self.released {
            return Err(TransportError::Client(
                "TLS credentials already released".to_string(),
            ));
        }
        Ok(Transport::tls(self.ca.clone(), self.identity.clone(), None))
    }

    /// Overwrite and drop the staged material. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        wipe(&mut self.ca);
        if let Some((mut cert, mut key)) = self.identity.take() {
            wipe(&mut cert);
            wipe(&mut key);
        }
        self.released = true;
        tracing::debug!("Released TLS credentials");
    }
}

impl Drop for StagedCredentials {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for StagedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedCredentials")
            .field("client_auth", &self.identity.is_some())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

fn pem_bytes(label: &str, text: &str) -> Result<Vec<u8>, TransportError> {
    let text = text.trim();
    if !text.starts_with("-----BEGIN ") || !text.contains("-----END ") {
        return Err(TransportError::Client(format!("{label} is not PEM-encoded")));
    }
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(b'\n');
    Ok(bytes)
}

fn wipe(buf: &mut Vec<u8>) {
    buf.fill(0);
    std::hint::black_box(&*buf);
    buf.clear();
    buf.shrink_to_fit();
}
