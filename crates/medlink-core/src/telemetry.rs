//! Telemetry snapshot - one device reading at one instant.
//!
//! The snapshot is the message that travels the whole pipeline: produced by
//! the poller, serialized onto the bus topic
//! `<prefix>/<deviceId>/telemetry`, and deserialized cloud-side by the
//! subscriber. Field names on the wire are camelCase to match the bus
//! contract.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Measurement map keys.
pub mod keys {
    pub const BLOOD_FLOW: &str = "bloodFlow";
    pub const ARTERIAL_PRESSURE: &str = "arterialPressure";
    pub const VENOUS_PRESSURE: &str = "venousPressure";
    pub const DIALYSATE_TEMPERATURE: &str = "dialysateTemperature";
    pub const CONDUCTIVITY: &str = "conductivity";
    pub const TREATMENT_TIME: &str = "treatmentTime";
}

/// Alarm map keys.
pub mod alarm_keys {
    pub const PRESSURE_LOW: &str = "pressureLow";
    pub const PRESSURE_HIGH: &str = "pressureHigh";
}

/// Arterial pressure below this raises the `pressureLow` alarm (mmHg).
pub const PRESSURE_LOW_THRESHOLD: f64 = 80.0;

/// Venous pressure above this raises the `pressureHigh` alarm (mmHg).
pub const PRESSURE_HIGH_THRESHOLD: f64 = 200.0;

/// One device's reading at one instant.
///
/// Measurement values are already decoded and clamped into their register
/// ranges by the producer; alarms are derived from the measurements and are
/// never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Device identifier, e.g. "Device-001".
    pub device_id: String,
    /// Wall-clock time the registers were read.
    pub timestamp: DateTime<Utc>,
    /// Decoded measurement values keyed by [`keys`].
    pub measurements: HashMap<String, f64>,
    /// Derived alarm flags keyed by [`alarm_keys`].
    pub alarms: HashMap<String, bool>,
}

impl TelemetrySnapshot {
    /// Build a snapshot from decoded measurements, deriving the alarm flags.
    pub fn from_measurements(
        device_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        measurements: HashMap<String, f64>,
    ) -> Self {
        let alarms = derive_alarms(&measurements);
        Self {
            device_id: device_id.into(),
            timestamp,
            measurements,
            alarms,
        }
    }

    /// Look up a measurement by key.
    pub fn measurement(&self, key: &str) -> Option<f64> {
        self.measurements.get(key).copied()
    }

    /// Whether a given alarm flag is raised.
    pub fn alarm(&self, key: &str) -> bool {
        self.alarms.get(key).copied().unwrap_or(false)
    }
}

/// Derive the alarm flags from a measurement map.
///
/// `pressureLow` fires when arterial pressure drops below 80 mmHg,
/// `pressureHigh` when venous pressure exceeds 200 mmHg. Missing
/// measurements leave the flag false.
pub fn derive_alarms(measurements: &HashMap<String, f64>) -> HashMap<String, bool> {
    let arterial = measurements
        .get(keys::ARTERIAL_PRESSURE)
        .copied()
        .unwrap_or(f64::MAX);
    let venous = measurements
        .get(keys::VENOUS_PRESSURE)
        .copied()
        .unwrap_or(f64::MIN);

    let mut alarms = HashMap::new();
    alarms.insert(
        alarm_keys::PRESSURE_LOW.to_string(),
        arterial < PRESSURE_LOW_THRESHOLD,
    );
    alarms.insert(
        alarm_keys::PRESSURE_HIGH.to_string(),
        venous > PRESSURE_HIGH_THRESHOLD,
    );
    alarms
}
