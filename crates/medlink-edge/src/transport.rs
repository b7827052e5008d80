//! Broker transport seam.
//!
//! The publisher talks to the broker through [`BrokerTransport`] so its
//! delivery policy can be exercised against a mock. [`MqttTransport`] is
//! the production implementation over a rumqttc `AsyncClient`; its event
//! loop runs as a background task that tracks connection state and keeps
//! reconnecting after transport errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::watch;

use medlink_core::config::BrokerConfig;

use crate::error::EdgeError;

/// Delay between event-loop reconnect attempts after a transport error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Publish access to the broker.
#[async_trait]
pub trait BrokerTransport: Send {
    /// Publish one payload at QoS 1; success means the broker acknowledged.
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), EdgeError>;
}

/// rumqttc-backed broker transport.
///
/// The connection is owned by this transport's event-loop task and never
/// shared with other workers.
pub struct MqttTransport {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttTransport {
    /// Create the client and spawn its event loop.
    ///
    /// The loop keeps polling (and therefore reconnecting) until the
    /// shutdown signal flips.
    pub fn connect(config: &BrokerConfig, mut shutdown: watch::Receiver<bool>) -> Self {
        let client_id = format!("{}-pub-{}", config.client_id, uuid::Uuid::new_v4().simple());
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive));
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let connected = Arc::new(AtomicBool::new(false));

        let flag = connected.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = eventloop.poll() => match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            tracing::info!("connected to mqtt broker");
                            flag.store(true, Ordering::SeqCst);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            if flag.swap(false, Ordering::SeqCst) {
                                tracing::warn!(%err, "mqtt connection lost");
                            } else {
                                tracing::debug!(%err, "mqtt connect attempt failed");
                            }
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                    },
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::debug!("mqtt event loop stopped");
                            return;
                        }
                    }
                }
            }
        });

        Self { client, connected }
    }

    /// Whether the broker connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerTransport for MqttTransport {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), EdgeError> {
        if !self.is_connected() {
            return Err(EdgeError::NotConnected);
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }
}
