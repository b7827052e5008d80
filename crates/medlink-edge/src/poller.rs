//! Register polling worker.
//!
//! One poller runs per configured device, each owning its own connection
//! state. A cycle reads the full register block in one call, decodes and
//! clamps the values, derives the alarm flags, and pushes the snapshot to
//! the edge queue. No single failed cycle terminates the worker; only the
//! shutdown signal does.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use medlink_core::queue::TelemetryQueue;
use medlink_core::registers::{decode_block, BLOCK_LEN, BLOCK_START};
use medlink_core::telemetry::TelemetrySnapshot;
use medlink_device::{DeviceError, RegisterSource};

/// Wait after a failed connect before trying again.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Wait after a failed read before the next cycle.
const READ_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Polls one device's registers on a fixed cadence.
pub struct Poller<S: RegisterSource> {
    device_id: String,
    source: S,
    queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
    poll_interval: Duration,
}

impl<S: RegisterSource> Poller<S> {
    pub fn new(
        device_id: impl Into<String>,
        source: S,
        queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            source,
            queue,
            poll_interval,
        }
    }

    /// One poll cycle: ensure the connection, read the block, decode.
    ///
    /// On failure the connection is dropped so the next cycle reconnects.
    pub async fn poll_once(&mut self) -> Result<TelemetrySnapshot, DeviceError> {
        self.source.ensure_connected().await?;
        let block = match self.source.read_block(BLOCK_START, BLOCK_LEN).await {
            Ok(block) => block,
            Err(err) => {
                self.source.disconnect();
                return Err(err);
            }
        };
        let measurements = decode_block(&block);
        Ok(TelemetrySnapshot::from_measurements(
            self.device_id.clone(),
            Utc::now(),
            measurements,
        ))
    }

    /// Run the poll loop until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(device_id = %self.device_id, "poller started");
        loop {
            let delay = match self.poll_once().await {
                Ok(snapshot) => {
                    tracing::debug!(
                        device_id = %self.device_id,
                        measurements = snapshot.measurements.len(),
                        "polled device"
                    );
                    if self.queue.push(snapshot).await.is_err() {
                        tracing::info!(device_id = %self.device_id, "edge queue closed, poller exiting");
                        return;
                    }
                    self.poll_interval
                }
                Err(err @ DeviceError::ConnectTimeout { .. }) | Err(err @ DeviceError::NotConnected) => {
                    tracing::warn!(device_id = %self.device_id, %err, "device unreachable, retrying");
                    RECONNECT_DELAY
                }
                Err(err) => {
                    tracing::error!(device_id = %self.device_id, %err, "poll cycle failed");
                    self.source.disconnect();
                    READ_RETRY_DELAY
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(device_id = %self.device_id, "poller stopped");
                        return;
                    }
                }
            }
        }
    }
}
