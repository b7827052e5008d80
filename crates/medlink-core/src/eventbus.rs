//! Event bus for pipeline observability.
//!
//! The bus distributes parsed snapshots and anomaly findings to interested
//! workers (the anomaly monitor, alerting collaborators) without coupling
//! them to the delivery path. Built on a tokio broadcast channel, so slow
//! subscribers may miss events rather than stall the pipeline.

use tokio::sync::broadcast;

use crate::anomaly::AnomalyResult;
use crate::telemetry::TelemetrySnapshot;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Events published on the bus.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A snapshot was received and parsed cloud-side.
    SnapshotReceived(TelemetrySnapshot),
    /// The anomaly detector matched a rule for a device's snapshot.
    AnomalyDetected {
        device_id: String,
        result: AnomalyResult,
    },
}

/// Broadcast bus carrying [`PipelineEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with the given buffer capacity.
    ///
    /// The capacity determines how many events are buffered for slow
    /// subscribers before they start missing events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns `true` if there was at least one subscriber; with none the
    /// event is discarded.
    pub fn publish(&self, event: PipelineEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Subscribe to all events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
