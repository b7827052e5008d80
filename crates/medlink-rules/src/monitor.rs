//! Anomaly monitor worker.
//!
//! Subscribes to the event bus and runs the detector over every snapshot
//! the subscriber parses, independently of the delivery path. Findings
//! are logged at a level mapped from severity and published back to the
//! bus for alerting collaborators.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

use medlink_core::anomaly::Severity;
use medlink_core::eventbus::{EventBus, PipelineEvent};
use medlink_core::telemetry::TelemetrySnapshot;

use crate::detector::analyze;

/// Applies the rule table to every snapshot on the bus.
pub struct AnomalyMonitor {
    bus: EventBus,
}

impl AnomalyMonitor {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn inspect(&self, snapshot: &TelemetrySnapshot) {
        let Some(result) = analyze(&snapshot.measurements, &snapshot.alarms) else {
            return;
        };

        match result.severity {
            Severity::Critical => tracing::error!(
                device_id = %snapshot.device_id,
                finding = %result.finding,
                recommendation = %result.recommendation,
                "critical anomaly detected"
            ),
            Severity::High => tracing::warn!(
                device_id = %snapshot.device_id,
                finding = %result.finding,
                recommendation = %result.recommendation,
                "anomaly detected"
            ),
            Severity::Moderate | Severity::Low => tracing::info!(
                device_id = %snapshot.device_id,
                finding = %result.finding,
                "anomaly detected"
            ),
        }

        self.bus.publish(PipelineEvent::AnomalyDetected {
            device_id: snapshot.device_id.clone(),
            result,
        });
    }

    /// Run until shutdown. A lagged bus subscription is logged and the
    /// worker resumes with the next event.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.bus.subscribe();
        tracing::info!("anomaly monitor started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(PipelineEvent::SnapshotReceived(snapshot)) => self.inspect(&snapshot),
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "anomaly monitor lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("event bus closed, anomaly monitor exiting");
                        return;
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("anomaly monitor stopped");
                        return;
                    }
                }
            }
        }
    }
}
