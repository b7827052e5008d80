//! Device link errors.

use thiserror::Error;

/// Errors on the device register link.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    #[error("not connected")]
    NotConnected,

    #[error("register read out of bounds: start={start} count={count}")]
    OutOfBounds { start: u16, count: u16 },

    #[error("malformed register request")]
    BadRequest,
}
