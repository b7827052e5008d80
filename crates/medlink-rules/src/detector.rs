//! Deterministic anomaly rules.
//!
//! Rules are checked in a fixed priority order and the first match wins:
//! never more than one result per call, even when several conditions hold
//! at once. A measurement or alarm key missing from the input skips its
//! rule without error. The function holds no state and is safe to call
//! concurrently on independent snapshots.

use std::collections::HashMap;

use medlink_core::anomaly::{AnomalyResult, Severity};
use medlink_core::telemetry::{alarm_keys, keys};

/// Blood flow below this is critical (mL/min).
pub const BLOOD_FLOW_CRITICAL: f64 = 150.0;
/// Arterial pressure below this is critical hypotension (mmHg).
pub const ARTERIAL_PRESSURE_CRITICAL: f64 = 80.0;
/// Venous pressure above this is critical (mmHg).
pub const VENOUS_PRESSURE_CRITICAL: f64 = 250.0;
/// Dialysate temperature above this is a warning (°C).
pub const TEMPERATURE_WARNING: f64 = 38.5;
/// Normal conductivity band (mS/cm).
pub const CONDUCTIVITY_MIN: f64 = 13.0;
pub const CONDUCTIVITY_MAX: f64 = 15.0;

/// Evaluate one snapshot's measurements and alarms.
///
/// Returns the highest-priority matching rule's result, or `None` when no
/// rule matches (not an error).
pub fn analyze(
    measurements: &HashMap<String, f64>,
    alarms: &HashMap<String, bool>,
) -> Option<AnomalyResult> {
    if let Some(blood_flow) = measurements.get(keys::BLOOD_FLOW) {
        if *blood_flow < BLOOD_FLOW_CRITICAL {
            return Some(AnomalyResult::new(
                Severity::Critical,
                format!("Blood flow critically low: {blood_flow} mL/min (critical <{BLOOD_FLOW_CRITICAL})"),
                "Check vascular access, possible recirculation or access malfunction",
            ));
        }
    }

    if let Some(arterial) = measurements.get(keys::ARTERIAL_PRESSURE) {
        if *arterial < ARTERIAL_PRESSURE_CRITICAL {
            return Some(AnomalyResult::new(
                Severity::Critical,
                format!("Hypotension detected: AP {arterial} mmHg (critical <{ARTERIAL_PRESSURE_CRITICAL})"),
                "Immediate intervention required: reduce ultrafiltration, check patient status",
            ));
        }
    }

    if let Some(venous) = measurements.get(keys::VENOUS_PRESSURE) {
        if *venous > VENOUS_PRESSURE_CRITICAL {
            return Some(AnomalyResult::new(
                Severity::Critical,
                format!("Venous pressure elevated: VP {venous} mmHg (critical >{VENOUS_PRESSURE_CRITICAL})"),
                "Check for venous needle malposition or venous line occlusion",
            ));
        }
    }

    if let Some(temperature) = measurements.get(keys::DIALYSATE_TEMPERATURE) {
        if *temperature > TEMPERATURE_WARNING {
            return Some(AnomalyResult::new(
                Severity::High,
                format!("Temperature elevated: {temperature:.1}°C (warning >{TEMPERATURE_WARNING})"),
                "Check heater calibration and dialysate preparation",
            ));
        }
    }

    if let Some(conductivity) = measurements.get(keys::CONDUCTIVITY) {
        if *conductivity < CONDUCTIVITY_MIN || *conductivity > CONDUCTIVITY_MAX {
            return Some(AnomalyResult::new(
                Severity::High,
                format!(
                    "Conductivity out of range: {conductivity:.2} mS/cm (normal {CONDUCTIVITY_MIN:.1}-{CONDUCTIVITY_MAX:.1})"
                ),
                "Check dialysate composition and conductivity probe",
            ));
        }
    }

    if alarms.get(alarm_keys::PRESSURE_LOW).copied().unwrap_or(false) {
        return Some(AnomalyResult::new(
            Severity::High,
            "Low pressure alarm triggered",
            "Verify patient hemodynamic status",
        ));
    }

    if alarms.get(alarm_keys::PRESSURE_HIGH).copied().unwrap_or(false) {
        return Some(AnomalyResult::new(
            Severity::High,
            "High venous pressure alarm triggered",
            "Check venous line integrity and position",
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn a(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn empty_input_matches_nothing() {
        assert!(analyze(&HashMap::new(), &HashMap::new()).is_none());
    }

    #[test]
    fn healthy_snapshot_matches_nothing() {
        let measurements = m(&[
            (keys::BLOOD_FLOW, 300.0),
            (keys::ARTERIAL_PRESSURE, 120.0),
            (keys::VENOUS_PRESSURE, 80.0),
            (keys::DIALYSATE_TEMPERATURE, 36.5),
            (keys::CONDUCTIVITY, 14.0),
        ]);
        assert!(analyze(&measurements, &HashMap::new()).is_none());
    }

    #[test]
    fn blood_flow_rule_precedes_arterial_pressure_rule() {
        // Both critical conditions hold; rule 1 must win.
        let measurements = m(&[(keys::BLOOD_FLOW, 100.0), (keys::ARTERIAL_PRESSURE, 60.0)]);
        let result = analyze(&measurements, &HashMap::new()).unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.finding.contains("Blood flow critically low"));
    }

    #[test]
    fn hypotension_is_critical() {
        let measurements = m(&[(keys::ARTERIAL_PRESSURE, 60.0)]);
        let result = analyze(&measurements, &HashMap::new()).unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.finding.contains("Hypotension detected"));
        assert!(result.recommendation.contains("reduce ultrafiltration"));
    }

    #[test]
    fn venous_pressure_above_250_is_critical() {
        let measurements = m(&[(keys::VENOUS_PRESSURE, 260.0)]);
        let result = analyze(&measurements, &HashMap::new()).unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.finding.contains("Venous pressure elevated"));
    }

    #[test]
    fn temperature_above_warning_is_high() {
        let measurements = m(&[(keys::DIALYSATE_TEMPERATURE, 38.7)]);
        let result = analyze(&measurements, &HashMap::new()).unwrap();
        assert_eq!(result.severity, Severity::High);
        assert!(result.finding.contains("38.7°C"));
    }

    #[test]
    fn conductivity_out_of_range_cites_two_decimals() {
        let measurements = m(&[(keys::CONDUCTIVITY, 16.0)]);
        let result = analyze(&measurements, &HashMap::new()).unwrap();
        assert_eq!(result.severity, Severity::High);
        assert!(result.finding.contains("16.00 mS/cm"));

        let measurements = m(&[(keys::CONDUCTIVITY, 12.5)]);
        assert!(analyze(&measurements, &HashMap::new()).is_some());
        let measurements = m(&[(keys::CONDUCTIVITY, 13.0)]);
        assert!(analyze(&measurements, &HashMap::new()).is_none());
    }

    #[test]
    fn alarm_flags_match_when_measurements_are_normal() {
        let result = analyze(&HashMap::new(), &a(&[(alarm_keys::PRESSURE_LOW, true)])).unwrap();
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.finding, "Low pressure alarm triggered");

        let result = analyze(&HashMap::new(), &a(&[(alarm_keys::PRESSURE_HIGH, true)])).unwrap();
        assert_eq!(result.finding, "High venous pressure alarm triggered");

        // Unraised flags match nothing.
        let alarms = a(&[(alarm_keys::PRESSURE_LOW, false), (alarm_keys::PRESSURE_HIGH, false)]);
        assert!(analyze(&HashMap::new(), &alarms).is_none());
    }

    #[test]
    fn measurement_rules_outrank_alarm_rules() {
        let measurements = m(&[(keys::DIALYSATE_TEMPERATURE, 39.0)]);
        let alarms = a(&[(alarm_keys::PRESSURE_LOW, true)]);
        let result = analyze(&measurements, &alarms).unwrap();
        assert!(result.finding.contains("Temperature elevated"));
    }

    #[test]
    fn boundary_values_do_not_trigger() {
        let measurements = m(&[
            (keys::BLOOD_FLOW, 150.0),
            (keys::ARTERIAL_PRESSURE, 80.0),
            (keys::VENOUS_PRESSURE, 250.0),
            (keys::DIALYSATE_TEMPERATURE, 38.5),
            (keys::CONDUCTIVITY, 15.0),
        ]);
        assert!(analyze(&measurements, &HashMap::new()).is_none());
    }
}
