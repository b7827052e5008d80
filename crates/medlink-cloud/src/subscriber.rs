//! Broker subscription worker.
//!
//! Subscribes to the wildcard telemetry topic `<prefix>/+/telemetry` and
//! drives the rumqttc event loop. Every inbound publish is deserialized
//! into a snapshot; malformed payloads are logged and dropped without
//! stopping the worker. Parsed snapshots go to the cloud queue and onto
//! the event bus for the anomaly monitor.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::watch;

use medlink_core::config::BrokerConfig;
use medlink_core::eventbus::{EventBus, PipelineEvent};
use medlink_core::queue::TelemetryQueue;
use medlink_core::telemetry::TelemetrySnapshot;

use crate::error::CloudError;

/// Delay before re-polling the event loop after a transport error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Build the wildcard subscription filter for a namespace prefix.
pub fn telemetry_filter(prefix: &str) -> String {
    format!("{prefix}/+/telemetry")
}

/// Parse one bus payload into a snapshot.
pub fn parse_snapshot(payload: &[u8]) -> Result<TelemetrySnapshot, CloudError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Consumes the broker's telemetry topic into the cloud queue.
pub struct Subscriber {
    config: BrokerConfig,
    queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
    bus: EventBus,
}

impl Subscriber {
    pub fn new(
        config: BrokerConfig,
        queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
        bus: EventBus,
    ) -> Self {
        Self { config, queue, bus }
    }

    /// Handle one inbound publish packet.
    async fn handle_publish(&self, topic: &str, payload: &[u8]) {
        let snapshot = match parse_snapshot(payload) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%topic, %err, "dropping malformed telemetry payload");
                return;
            }
        };
        tracing::debug!(device_id = %snapshot.device_id, %topic, "received telemetry");

        self.bus
            .publish(PipelineEvent::SnapshotReceived(snapshot.clone()));
        if self.queue.push(snapshot).await.is_err() {
            tracing::warn!("cloud queue closed, inbound snapshot dropped");
        }
    }

    /// Run until shutdown; on shutdown the cloud queue is marked complete
    /// so the transformer drains and exits, then the client disconnects.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let client_id = format!(
            "{}-sub-{}",
            self.config.client_id,
            uuid::Uuid::new_v4().simple()
        );
        let mut options = MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive));
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let filter = telemetry_filter(&self.config.topic_prefix);
        tracing::info!(%filter, "subscriber started");

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // (Re-)subscribe on every new session.
                        if let Err(err) = client.subscribe(&filter, QoS::AtLeastOnce).await {
                            tracing::error!(%err, "subscribe failed");
                        } else {
                            tracing::info!(%filter, "subscribed to telemetry topic");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.handle_publish(&publish.topic, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(%err, "broker connection error, retrying");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.queue.close();
                        let _ = client.disconnect().await;
                        tracing::info!("subscriber stopped");
                        return;
                    }
                }
            }
        }
    }
}
