//! MQTT session management and publishing.

use crate::config::{Credentials, TransportConfig};
use crate::credentials::StagedCredentials;
use crate::error::TransportError;
use helixer_core::Message;
use helixer_proto::encode_message;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Connection state of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session
    Disconnected,
    /// Establishing or re-establishing a session
    Connecting,
    /// Session is up, publishing is accepted
    Connected,
}

/// Acknowledgement that a message was handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    /// Topic the message was published on
    pub topic: String,
    /// Serialized payload size
    pub bytes: usize,
}

/// Staged credentials shared by a session and its event-loop driver.
///
/// Whichever side finishes first empties the slot.
type CredentialSlot = Arc<std::sync::Mutex<Option<StagedCredentials>>>;

fn release_credentials(slot: &CredentialSlot) {
    let staged = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(mut staged) = staged {
        staged.release();
    }
}

/// A broker session and the resources tied to it.
struct Session {
    client: AsyncClient,
    driver: JoinHandle<()>,
    credentials: CredentialSlot,
    endpoint: String,
}

impl Session {
    async fn close(mut self, grace: Duration) {
        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!(error = %e, "DISCONNECT not queued");
        }
        if tokio::time::timeout(grace, &mut self.driver).await.is_err() {
            tracing::debug!(endpoint = %self.endpoint, "Event loop did not stop in time");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.driver.abort();
        release_credentials(&self.credentials);
    }
}

/// MQTT transport owning a single broker session.
///
/// All methods take `&self`; the transport can be shared behind an `Arc`.
/// The session lock is never held while waiting on the network: publishes
/// go straight into the client's bounded request queue, and a full queue
/// fails the publish instead of waiting for room.
pub struct MqttTransport {
    config: TransportConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Mutex<Option<Session>>,
}

impl MqttTransport {
    /// Create a disconnected transport.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            state: Arc::new(state),
            session: Mutex::new(None),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Transport settings.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Connect to a broker.
    ///
    /// Blocks until the broker acknowledges the session or the connect
    /// timeout elapses. An existing session is closed first.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Connection`] if the broker cannot be reached,
    ///   refuses the TCP connection, or does not answer in time
    /// - [`TransportError::Authentication`] if the broker rejects the
    ///   credentials
    /// - [`TransportError::Client`] for invalid settings or any other failure
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
        credentials: Credentials,
    ) -> Result<(), TransportError> {
        if port == 0 {
            return Err(TransportError::Client(
                "broker port must be between 1 and 65535".to_string(),
            ));
        }

        let mut session = self.session.lock().await;
        if let Some(previous) = session.take() {
            tracing::debug!(endpoint = %previous.endpoint, "Closing previous session");
            previous.close(self.config.disconnect_grace).await;
        }

        self.state.send_replace(ConnectionState::Connecting);
        tracing::debug!(host, port, "Connecting to MQTT broker");

        match self.open(host, port, &credentials).await {
            Ok(opened) => {
                tracing::info!(host, port, "Connected to MQTT broker");
                *session = Some(opened);
                self.state.send_replace(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                tracing::error!(host, port, error = %e, "Could not connect to MQTT broker");
                self.state.send_replace(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn open(
        &self,
        host: &str,
        port: u16,
        credentials: &Credentials,
    ) -> Result<Session, TransportError> {
        let staged = credentials
            .certificates
            .as_ref()
            .map(StagedCredentials::stage)
            .transpose()?;

        let mut options = MqttOptions::new(&self.config.client_id, host, port);
        options.set_keep_alive(self.config.keep_alive);

        if let Some(username) = credentials.username.as_deref().filter(|u| !u.is_empty()) {
            tracing::debug!(username, "Authenticating to MQTT broker");
            options.set_credentials(username, credentials.password.as_deref().unwrap_or_default());
        }

        if let Some(staged) = &staged {
            tracing::debug!(
                client_auth = staged.has_client_identity(),
                "Using TLS transport"
            );
            options.set_transport(staged.transport()?);
        }

        let (client, mut eventloop) = AsyncClient::new(options, self.config.channel_capacity);

        match tokio::time::timeout(self.config.connect_timeout, eventloop.poll()).await {
            Err(_) => {
                return Err(TransportError::Connection(format!(
                    "no CONNACK within {:?}",
                    self.config.connect_timeout
                )))
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                tracing::debug!(session_present = ack.session_present, "CONNACK received");
            }
            Ok(Ok(other)) => {
                return Err(TransportError::Client(format!(
                    "unexpected event before CONNACK: {other:?}"
                )))
            }
        }

        let credentials: CredentialSlot = Arc::new(std::sync::Mutex::new(staged));

        let driver = tokio::spawn(drive(
            eventloop,
            Arc::clone(&self.state),
            self.config.auto_reconnect,
            self.config.reconnect_delay,
            Arc::clone(&credentials),
        ));

        Ok(Session {
            client,
            driver,
            credentials,
            endpoint: format!("{host}:{port}"),
        })
    }

    /// Disconnect from the broker and release staged credentials.
    ///
    /// Idempotent: calling it without a session does nothing. Bounded by
    /// the configured disconnect grace even if the broker stopped reading.
    pub async fn disconnect(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            let endpoint = session.endpoint.clone();
            tracing::debug!(%endpoint, "Disconnecting from MQTT broker");
            session.close(self.config.disconnect_grace).await;
            tracing::info!(%endpoint, "Disconnected from MQTT broker");
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Serialize and publish a message.
    ///
    /// Never waits for the network: the message is queued for the event
    /// loop or the call fails.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Connection`] if the transport is not connected
    /// - [`TransportError::Publish`] if the request queue is full or closed
    pub async fn publish(
        &self,
        topic: &str,
        message: &Message,
    ) -> Result<PublishAck, TransportError> {
        let client = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(session) => session.client.clone(),
                None => return Err(TransportError::not_connected()),
            }
        };
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::not_connected());
        }

        let payload = encode_message(message);
        let bytes = payload.len();

        tracing::debug!(topic, metrics = message.len(), bytes, "Publishing message");

        client
            .try_publish(topic, self.config.qos, false, payload)
            .map_err(|e| TransportError::Publish(format!("{topic}: {e}")))?;

        Ok(PublishAck {
            topic: topic.to_string(),
            bytes,
        })
    }
}

/// Poll the event loop until the session ends.
///
/// Staged credentials are released when the loop exits on its own.
async fn drive(
    mut eventloop: EventLoop,
    state: Arc<watch::Sender<ConnectionState>>,
    auto_reconnect: bool,
    reconnect_delay: Duration,
    credentials: CredentialSlot,
) {
    let mut attempts: u32 = 0;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!(attempts, "Reconnected to MQTT broker");
                attempts = 0;
                state.send_replace(ConnectionState::Connected);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("DISCONNECT sent, stopping event loop");
                state.send_replace(ConnectionState::Disconnected);
                break;
            }
            Ok(_) => {}
            Err(e) if auto_reconnect => {
                attempts = attempts.saturating_add(1);
                tracing::warn!(error = %e, attempts, "MQTT connection lost, reconnecting");
                state.send_replace(ConnectionState::Connecting);
                tokio::time::sleep(reconnect_delay).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "MQTT connection lost");
                state.send_replace(ConnectionState::Disconnected);
                break;
            }
        }
    }

    release_credentials(&credentials);
}
