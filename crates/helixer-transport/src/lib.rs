//! # Helixer Transport
//!
//! MQTT transport for publishing encoded Helixer messages.
//!
//! One [`MqttTransport`] owns one broker session. Connecting stages the
//! caller's credential material (username/password, PEM certificates held
//! in memory) for the TLS handshake; disconnecting or dropping the
//! transport releases it.
//!
//! ## States
//!
//! `Disconnected → Connecting → Connected → Disconnected`, with
//! `Connected → Connecting` on automatic reconnect. Publishing is only
//! accepted while `Connected`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;

pub use client::{ConnectionState, MqttTransport, PublishAck};
pub use config::{parse_qos, CertificateBundle, Credentials, TransportConfig};
pub use credentials::StagedCredentials;
pub use error::TransportError;
pub use rumqttc::QoS;
