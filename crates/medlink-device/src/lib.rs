//! Field-device register access and simulation.
//!
//! This crate covers both ends of the device link:
//!
//! - [`RegisterSource`] is the seam the poller reads through, with
//!   [`TcpRegisterClient`] as the production implementation of the block-read
//!   wire protocol
//! - [`RegisterBank`] is simulated device register memory, refreshed by a
//!   [`TelemetryGenerator`] producing realistic dialysis waveforms
//! - [`simulator`] serves a bank over TCP so the edge process can be run
//!   end to end without hardware

pub mod bank;
pub mod error;
pub mod generator;
pub mod simulator;
pub mod source;

pub use bank::RegisterBank;
pub use error::DeviceError;
pub use generator::TelemetryGenerator;
pub use source::{BankSource, RegisterSource, TcpRegisterClient};
