//! Broker publishing worker.
//!
//! Drains the edge queue one message at a time and delivers each to the
//! broker under the combined policy: per-message retries with exponential
//! backoff, every attempt gated by the circuit breaker. A message that
//! exhausts its policy (or arrives while the breaker is open) is logged
//! and discarded; draining continues with the next message. Delivery is
//! at-least-once, so downstream tolerates duplicates.

use std::sync::Arc;

use medlink_core::queue::TelemetryQueue;
use medlink_core::retry::RetryPolicy;
use medlink_core::telemetry::TelemetrySnapshot;

use crate::breaker::CircuitBreaker;
use crate::error::EdgeError;
use crate::transport::BrokerTransport;

/// Build the topic for one device's telemetry.
pub fn telemetry_topic(prefix: &str, device_id: &str) -> String {
    format!("{prefix}/{device_id}/telemetry")
}

/// Drains the edge queue onto the broker.
pub struct Publisher<T: BrokerTransport> {
    queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
    transport: T,
    topic_prefix: String,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl<T: BrokerTransport> Publisher<T> {
    pub fn new(
        queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
        transport: T,
        topic_prefix: impl Into<String>,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            queue,
            transport,
            topic_prefix: topic_prefix.into(),
            retry,
            breaker,
        }
    }

    /// Attempt delivery of one snapshot under the full policy.
    ///
    /// Each attempt first consults the breaker; while open, attempts fail
    /// fast without touching the transport.
    pub async fn publish_one(&mut self, snapshot: &TelemetrySnapshot) -> Result<(), EdgeError> {
        let topic = telemetry_topic(&self.topic_prefix, &snapshot.device_id);
        let payload = serde_json::to_vec(snapshot)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            if !self.breaker.allow() {
                return Err(EdgeError::CircuitOpen);
            }
            match self.transport.publish(&topic, payload.clone()).await {
                Ok(()) => {
                    self.breaker.record_success();
                    tracing::debug!(device_id = %snapshot.device_id, %topic, "published telemetry");
                    return Ok(());
                }
                Err(err) => {
                    self.breaker.record_failure();
                    if attempt >= self.retry.max_attempts {
                        return Err(err);
                    }
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "publish attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Drain the queue until it is closed and empty.
    ///
    /// Failed messages are discarded, never re-queued; the loop itself
    /// only exits when the upstream queue completes.
    pub async fn run(mut self) {
        tracing::info!("publisher started");
        while let Some(snapshot) = self.queue.pop().await {
            if let Err(err) = self.publish_one(&snapshot).await {
                tracing::warn!(
                    device_id = snapshot.device_id,
                    %err,
                    "telemetry message discarded"
                );
            }
        }
        tracing::info!("publisher stopped");
    }
}
