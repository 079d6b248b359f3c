//! Bridge runtime: event hub to MQTT.

use crate::config::BridgeConfig;
use crate::hub::{EventHub, Subscription};
use crate::source::pump_lines;
use anyhow::{Context, Result};
use helixer_core::{Message, StateChange};
use helixer_proto::TopicScheme;
use helixer_transport::MqttTransport;
use tokio::io::BufReader;

/// Topic and message for one change, or `None` if nothing changed.
#[must_use]
pub fn prepare(scheme: &TopicScheme, change: &StateChange) -> Option<(String, Message)> {
    let message = change.encode()?;
    Some((scheme.ddata(&change.entity_id), message))
}

/// Forwards state changes read from stdin to the broker.
pub struct Bridge {
    config: BridgeConfig,
    transport: MqttTransport,
    hub: EventHub,
}

impl Bridge {
    /// Create a bridge. Nothing is dialed until [`Bridge::run`].
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let transport = MqttTransport::new(config.transport.clone());
        let hub = EventHub::new(config.transport.channel_capacity);

        Self {
            config,
            transport,
            hub,
        }
    }

    /// Run until stdin is exhausted or a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns error if the initial broker connection fails.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            host = %self.config.broker_host,
            port = self.config.broker_port,
            base_path = %self.config.topics.base_path(),
            "Starting bridge runtime"
        );

        self.transport
            .connect(
                &self.config.broker_host,
                self.config.broker_port,
                self.config.credentials.clone(),
            )
            .await
            .context("Failed to connect to MQTT broker")?;

        let mut subscription = self.hub.subscribe(self.config.filter.clone());
        tracing::debug!(
            subscribers = self.hub.subscriber_count(),
            filter = ?self.config.filter,
            "Subscribed to event hub"
        );

        let hub = self.hub.clone();
        let mut source = tokio::spawn(async move {
            pump_lines(BufReader::new(tokio::io::stdin()), &hub).await
        });

        tracing::info!("Bridge running, press Ctrl+C to stop");

        loop {
            tokio::select! {
                Some(change) = subscription.recv() => {
                    self.forward(&change).await;
                }

                result = &mut source => {
                    match result {
                        Ok(Ok(count)) => tracing::info!(events = count, "Input closed"),
                        Ok(Err(e)) => tracing::error!(error = %e, "Failed to read input"),
                        Err(e) => tracing::error!(error = %e, "Input task failed"),
                    }
                    self.drain(&mut subscription).await;
                    break;
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    source.abort();
                    break;
                }
            }
        }

        subscription.unsubscribe();
        self.transport.disconnect().await;

        tracing::info!("Bridge stopped");
        Ok(())
    }

    async fn drain(&self, subscription: &mut Subscription) {
        while let Some(change) = subscription.try_recv() {
            self.forward(&change).await;
        }
    }

    async fn forward(&self, change: &StateChange) {
        let Some((topic, message)) = prepare(&self.config.topics, change) else {
            tracing::trace!(entity_id = %change.entity_id, "No changes to publish");
            return;
        };

        match self.transport.publish(&topic, &message).await {
            Ok(ack) => {
                tracing::debug!(
                    topic = %ack.topic,
                    bytes = ack.bytes,
                    metrics = message.len(),
                    "Published state change"
                );
            }
            Err(e) => {
                tracing::warn!(
                    entity_id = %change.entity_id,
                    error = %e,
                    "Failed to publish state change"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use helixer_core::{MetricValue, StateRecord};

    fn record(value: &str, secs: i64) -> StateRecord {
        StateRecord::new(value, Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn prepare_new_entity() {
        let scheme = TopicScheme::new("plant");
        let change = StateChange {
            entity_id: "sensor.speed".to_string(),
            previous: None,
            current: record("42", 1_700_000_000).with_attribute("unit", "rpm".into()),
        };

        let (topic, message) = prepare(&scheme, &change).unwrap();
        assert_eq!(topic, "spBv1.0/homeassistant/DDATA/plant/sensor/speed");
        assert_eq!(message.timestamp_ms, 1_700_000_000_000);
        assert_eq!(
            message.metric("state").unwrap().value,
            MetricValue::Integer(42)
        );
        assert_eq!(
            message.metric("attributes/unit").unwrap().value,
            MetricValue::String("rpm".to_string())
        );
    }

    #[test]
    fn prepare_unchanged_is_none() {
        let scheme = TopicScheme::default();
        let change = StateChange {
            entity_id: "sensor.speed".to_string(),
            previous: Some(record("42", 1)),
            current: record("42", 2),
        };

        assert!(prepare(&scheme, &change).is_none());
    }

    #[tokio::test]
    async fn forward_without_connection_does_not_panic() {
        let config = BridgeConfig::from_lookup(|key| {
            (key == "HELIXER_BROKER_HOST").then(|| "127.0.0.1".to_string())
        })
        .unwrap();
        let bridge = Bridge::new(config);

        let change = StateChange {
            entity_id: "sensor.speed".to_string(),
            previous: None,
            current: record("1", 1),
        };

        bridge.forward(&change).await;
        assert_eq!(
            bridge.transport.state(),
            helixer_transport::ConnectionState::Disconnected
        );
    }
}
