//! Cloud worker errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("malformed telemetry payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink rejected observation: status {status}")]
    SinkRejected { status: u16 },

    #[error("no patient association for device {device_id}")]
    UnresolvedPatient { device_id: String },
}
