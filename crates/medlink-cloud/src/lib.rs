//! Cloud half of the MedLink pipeline.
//!
//! The [`Subscriber`] worker consumes the broker's wildcard telemetry
//! topic into the cloud queue (and onto the event bus); the
//! [`Transformer`] worker drains that queue, resolves the device→patient
//! association, fans each snapshot out into coded observations, and
//! delivers them through the [`ObservationSink`] seam with per-item
//! failure isolation.

pub mod error;
pub mod resolver;
pub mod sink;
pub mod subscriber;
pub mod transformer;

pub use error::CloudError;
pub use resolver::{PatientResolver, StaticPatientResolver};
pub use sink::{HttpSink, ObservationSink};
pub use subscriber::Subscriber;
pub use transformer::Transformer;
