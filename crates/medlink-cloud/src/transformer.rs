//! Snapshot → observation fan-out worker.
//!
//! Drains the cloud queue one snapshot at a time. The device→patient
//! association must resolve before any observation is built; an
//! unresolved device skips the whole snapshot (no partial fan-out). Each
//! observation in the fan-out set is delivered independently:
//! one failed delivery never suppresses the remaining observations of the
//! same snapshot.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use medlink_core::observation::fan_out;
use medlink_core::queue::TelemetryQueue;
use medlink_core::telemetry::TelemetrySnapshot;

use crate::resolver::PatientResolver;
use crate::sink::ObservationSink;

/// Drains the cloud queue into the observation sink.
pub struct Transformer {
    queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
    resolver: Arc<dyn PatientResolver>,
    sink: Arc<dyn ObservationSink>,
    /// Concurrent deliveries per fan-out set; 1 keeps the original
    /// sequential behavior.
    fanout_concurrency: usize,
}

impl Transformer {
    pub fn new(
        queue: Arc<TelemetryQueue<TelemetrySnapshot>>,
        resolver: Arc<dyn PatientResolver>,
        sink: Arc<dyn ObservationSink>,
        fanout_concurrency: usize,
    ) -> Self {
        Self {
            queue,
            resolver,
            sink,
            fanout_concurrency: fanout_concurrency.max(1),
        }
    }

    /// Transform and deliver one snapshot.
    ///
    /// Returns the number of observations successfully delivered.
    pub async fn process(&self, snapshot: &TelemetrySnapshot) -> usize {
        let Some(patient_id) = self.resolver.resolve(&snapshot.device_id).await else {
            tracing::warn!(
                device_id = %snapshot.device_id,
                "no patient association, skipping snapshot"
            );
            return 0;
        };

        let requests = fan_out(snapshot, &patient_id);
        if requests.is_empty() {
            tracing::debug!(device_id = %snapshot.device_id, "snapshot had no coded measurements");
            return 0;
        }

        let sink = &self.sink;
        stream::iter(requests)
            .map(|request| async move {
                match sink.deliver(&request).await {
                    Ok(()) => 1,
                    Err(err) => {
                        tracing::warn!(
                            code = %request.code,
                            device_id = %request.device_id,
                            %err,
                            "observation dropped"
                        );
                        0
                    }
                }
            })
            .buffer_unordered(self.fanout_concurrency)
            .fold(0usize, |acc, delivered| async move { acc + delivered })
            .await
    }

    /// Drain the queue until it is closed and empty.
    pub async fn run(self) {
        tracing::info!("transformer started");
        while let Some(snapshot) = self.queue.pop().await {
            let delivered = self.process(&snapshot).await;
            tracing::debug!(
                device_id = %snapshot.device_id,
                delivered,
                "snapshot transformed"
            );
        }
        tracing::info!("transformer stopped");
    }
}
