//! Shared types for the MedLink telemetry pipeline.
//!
//! This crate holds everything the edge and cloud halves of the pipeline
//! agree on:
//!
//! - **Data model**: [`TelemetrySnapshot`], [`ClinicalObservationRequest`],
//!   [`AnomalyResult`]
//! - **Register layout**: the fixed [`registers`] table describing the
//!   device's holding-register block
//! - **Plumbing**: the bounded [`queue::TelemetryQueue`] connecting adjacent
//!   pipeline stages, the broadcast [`eventbus::EventBus`], and the
//!   [`retry::RetryPolicy`] shared by the publisher and the sink client
//! - **Configuration**: [`config::MedlinkConfig`] and its defaults

pub mod anomaly;
pub mod config;
pub mod error;
pub mod eventbus;
pub mod observation;
pub mod queue;
pub mod registers;
pub mod retry;
pub mod telemetry;

pub use anomaly::{AnomalyResult, Severity};
pub use config::MedlinkConfig;
pub use error::CoreError;
pub use eventbus::{EventBus, PipelineEvent};
pub use observation::{ClinicalObservationRequest, ObservationCode};
pub use queue::{OverflowPolicy, QueueClosed, TelemetryQueue};
pub use retry::RetryPolicy;
pub use telemetry::TelemetrySnapshot;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
