//! Edge worker errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdgeError {
    #[error(transparent)]
    Device(#[from] medlink_device::DeviceError),

    #[error("broker not connected")]
    NotConnected,

    #[error("mqtt publish failed: {0}")]
    Publish(#[from] rumqttc::ClientError),

    #[error("circuit breaker open")]
    CircuitOpen,

    #[error("failed to encode telemetry payload: {0}")]
    Encode(#[from] serde_json::Error),
}
