//! Edge half of the MedLink pipeline.
//!
//! Runs next to the field devices: one [`Poller`] worker per device reads
//! the register block on a fixed cadence and feeds the edge queue; the
//! [`Publisher`] worker drains that queue onto the broker under a
//! retry-plus-circuit-breaker policy.

pub mod breaker;
pub mod error;
pub mod poller;
pub mod publisher;
pub mod transport;

pub use breaker::CircuitBreaker;
pub use error::EdgeError;
pub use poller::Poller;
pub use publisher::Publisher;
pub use transport::{BrokerTransport, MqttTransport};
