//! Device register layout.
//!
//! The field device exposes one contiguous block of 12 unsigned 16-bit
//! holding registers starting at address 0. Fixed-point fields
//! (temperature, conductivity) are stored multiplied by 100 and decoded
//! with a 0.01 scale factor. The table below is process-wide and immutable.

use std::collections::HashMap;

use crate::telemetry::keys;

/// First register of the telemetry block.
pub const BLOCK_START: u16 = 0;

/// Number of registers covering all known measurement addresses.
pub const BLOCK_LEN: u16 = 12;

/// One entry of the register map: where a measurement lives and how to
/// decode it.
#[derive(Debug, Clone, Copy)]
pub struct RegisterSpec {
    /// Measurement key in the snapshot map.
    pub name: &'static str,
    /// Offset within the register block.
    pub address: u16,
    /// Lower bound of the valid range, in decoded units.
    pub min: f64,
    /// Upper bound of the valid range, in decoded units.
    pub max: f64,
    /// Multiplier applied to the raw register value.
    pub scale: f64,
}

impl RegisterSpec {
    /// Decode a raw register value, silently clamping it into range.
    pub fn decode(&self, raw: u16) -> f64 {
        let value = f64::from(raw) * self.scale;
        let clamped = value.clamp(self.min, self.max);
        if clamped != value {
            tracing::debug!(
                measurement = %self.name,
                raw,
                value,
                clamped,
                "out-of-range register value clamped"
            );
        }
        clamped
    }
}

/// The register map for the dialysis machine.
///
/// Valid ranges come from the device's data sheet; treatment time is a
/// free-running counter and is not range-limited.
pub const REGISTER_MAP: [RegisterSpec; 6] = [
    RegisterSpec {
        name: keys::BLOOD_FLOW,
        address: 0,
        min: 200.0,
        max: 400.0,
        scale: 1.0,
    },
    RegisterSpec {
        name: keys::ARTERIAL_PRESSURE,
        address: 2,
        min: 50.0,
        max: 200.0,
        scale: 1.0,
    },
    RegisterSpec {
        name: keys::VENOUS_PRESSURE,
        address: 4,
        min: 50.0,
        max: 200.0,
        scale: 1.0,
    },
    RegisterSpec {
        name: keys::DIALYSATE_TEMPERATURE,
        address: 6,
        min: 35.0,
        max: 38.0,
        scale: 0.01,
    },
    RegisterSpec {
        name: keys::CONDUCTIVITY,
        address: 8,
        min: 13.5,
        max: 14.5,
        scale: 0.01,
    },
    RegisterSpec {
        name: keys::TREATMENT_TIME,
        address: 10,
        min: 0.0,
        max: 65535.0,
        scale: 1.0,
    },
];

/// Look up the spec for a measurement key.
pub fn spec_for(name: &str) -> Option<&'static RegisterSpec> {
    REGISTER_MAP.iter().find(|spec| spec.name == name)
}

/// Decode a full register block into a measurement map.
///
/// The block must cover [`BLOCK_LEN`] registers starting at
/// [`BLOCK_START`]. Every value is clamped into its valid range; clamping
/// is silent at the data level (a debug trace records it).
pub fn decode_block(block: &[u16]) -> HashMap<String, f64> {
    let mut measurements = HashMap::with_capacity(REGISTER_MAP.len());
    for spec in &REGISTER_MAP {
        let idx = usize::from(spec.address - BLOCK_START);
        if let Some(raw) = block.get(idx) {
            measurements.insert(spec.name.to_string(), spec.decode(*raw));
        }
    }
    measurements
}
