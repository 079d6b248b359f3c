//! Transport error taxonomy.

/// Errors surfaced by the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Broker unreachable, connection refused, timed out, or not connected
    #[error("connection error: {0}")]
    Connection(String),
    /// Broker rejected the credentials
    #[error("authentication error: {0}")]
    Authentication(String),
    /// Message was serialized but could not be sent
    #[error("publish error: {0}")]
    Publish(String),
    /// Any other client-side failure
    #[error("client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Error for operations that need a live session.
    #[must_use]
    pub fn not_connected() -> Self {
        Self::Connection("not connected to MQTT broker".to_string())
    }

    /// Short failure class: `connection`, `auth`, `publish` or `unknown`.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Authentication(_) => "auth",
            Self::Publish(_) => "publish",
            Self::Client(_) => "unknown",
        }
    }
}

impl From<rumqttc::ConnectionError> for TransportError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        use rumqttc::{ConnectReturnCode, ConnectionError};

        match &err {
            ConnectionError::ConnectionRefused(
                code @ (ConnectReturnCode::BadUserNamePassword | ConnectReturnCode::NotAuthorized),
            ) => Self::Authentication(format!("broker refused credentials: {code:?}")),
            ConnectionError::Io(_) | ConnectionError::NetworkTimeout => {
                Self::Connection(err.to_string())
            }
            _ => Self::Client(err.to_string()),
        }
    }
}
