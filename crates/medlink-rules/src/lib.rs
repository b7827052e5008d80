//! Rule-based anomaly detection for dialysis telemetry.
//!
//! [`detector::analyze`] is a pure function evaluating one
//! measurement/alarm snapshot against a fixed, priority-ordered rule
//! table; [`monitor::AnomalyMonitor`] is the worker that applies it to
//! every snapshot arriving on the event bus.

pub mod detector;
pub mod monitor;

pub use detector::analyze;
pub use monitor::AnomalyMonitor;
