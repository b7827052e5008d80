//! Coded clinical observations.
//!
//! The transformer fans one telemetry snapshot out into one
//! [`ClinicalObservationRequest`] per measurement that has an entry in the
//! fixed LOINC code table. Treatment time intentionally has no entry and
//! is never emitted as an observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telemetry::{keys, TelemetrySnapshot};

/// One coded measurement ready for storage in the clinical record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalObservationRequest {
    pub patient_id: String,
    pub device_id: String,
    /// LOINC code identifying the measurement type.
    pub code: String,
    pub code_display: String,
    pub value: f64,
    pub unit: String,
    pub observation_time: DateTime<Utc>,
}

/// Coding for one measurement key.
#[derive(Debug, Clone, Copy)]
pub struct ObservationCode {
    pub key: &'static str,
    pub code: &'static str,
    pub display: &'static str,
    pub unit: &'static str,
}

/// Fixed measurement-key → LOINC coding table.
pub const CODE_TABLE: [ObservationCode; 5] = [
    ObservationCode {
        key: keys::BLOOD_FLOW,
        code: "33438-3",
        display: "Blood Flow Rate",
        unit: "mL/min",
    },
    ObservationCode {
        key: keys::ARTERIAL_PRESSURE,
        code: "75992-9",
        display: "Arterial Pressure",
        unit: "mmHg",
    },
    ObservationCode {
        key: keys::VENOUS_PRESSURE,
        code: "60956-0",
        display: "Venous Pressure",
        unit: "mmHg",
    },
    ObservationCode {
        key: keys::DIALYSATE_TEMPERATURE,
        code: "8310-5",
        display: "Body Temperature",
        unit: "°C",
    },
    ObservationCode {
        key: keys::CONDUCTIVITY,
        code: "2164-2",
        display: "Conductivity",
        unit: "mS/cm",
    },
];

/// Look up the coding for a measurement key.
pub fn code_for(key: &str) -> Option<&'static ObservationCode> {
    CODE_TABLE.iter().find(|entry| entry.key == key)
}

/// Fan one snapshot out into coded observation requests.
///
/// Exactly one request is produced per measurement key present in both the
/// snapshot and the code table, in table order so the output is
/// deterministic. Absent keys produce no request.
pub fn fan_out(snapshot: &TelemetrySnapshot, patient_id: &str) -> Vec<ClinicalObservationRequest> {
    CODE_TABLE
        .iter()
        .filter_map(|entry| {
            let value = snapshot.measurement(entry.key)?;
            Some(ClinicalObservationRequest {
                patient_id: patient_id.to_string(),
                device_id: snapshot.device_id.clone(),
                code: entry.code.to_string(),
                code_display: entry.display.to_string(),
                value,
                unit: entry.unit.to_string(),
                observation_time: snapshot.timestamp,
            })
        })
        .collect()
}
