//! Telemetry waveform generator for simulated devices.
//!
//! Produces readings around clinically plausible baselines with small
//! random variance, clamped into the register-map ranges and encoded in
//! register format (fixed-point fields multiplied by 100). A hypotension
//! mode shifts arterial pressure down for anomaly demos and tests.

use medlink_core::registers::{RegisterSpec, REGISTER_MAP};
use medlink_core::telemetry::keys;
use rand::Rng;

use crate::bank::RegisterBank;

/// One generated reading in register format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedReading {
    pub blood_flow: u16,
    pub arterial_pressure: u16,
    pub venous_pressure: u16,
    /// Degrees Celsius multiplied by 100.
    pub temperature_raw: u16,
    /// mS/cm multiplied by 100.
    pub conductivity_raw: u16,
    pub treatment_time: u16,
}

/// Stateful waveform generator for one simulated device.
pub struct TelemetryGenerator {
    treatment_time: u16,
    hypotension_mode: bool,
}

const BASE_BLOOD_FLOW: f64 = 300.0;
const BASE_ARTERIAL_PRESSURE: f64 = 120.0;
const BASE_VENOUS_PRESSURE: f64 = 80.0;
const BASE_TEMPERATURE: f64 = 36.5;
const BASE_CONDUCTIVITY: f64 = 14.0;

/// Seconds of treatment time added per generated reading.
const TREATMENT_TICK: u16 = 5;

impl TelemetryGenerator {
    pub fn new() -> Self {
        Self {
            treatment_time: 0,
            hypotension_mode: false,
        }
    }

    /// Generate the next reading and advance treatment time.
    pub fn next_reading(&mut self) -> GeneratedReading {
        let mut rng = rand::thread_rng();

        let blood_flow = BASE_BLOOD_FLOW + rng.gen_range(-20.0..20.0);
        let arterial = if self.hypotension_mode {
            BASE_ARTERIAL_PRESSURE - 40.0 + rng.gen_range(-10.0..10.0)
        } else {
            BASE_ARTERIAL_PRESSURE + rng.gen_range(-5.0..5.0)
        };
        let venous = BASE_VENOUS_PRESSURE + rng.gen_range(-5.0..5.0);
        let temperature = BASE_TEMPERATURE + rng.gen_range(-0.10..0.10);
        let conductivity = BASE_CONDUCTIVITY + rng.gen_range(-0.05..0.05);

        self.treatment_time = self.treatment_time.saturating_add(TREATMENT_TICK);

        GeneratedReading {
            blood_flow: clamp_to_range(keys::BLOOD_FLOW, blood_flow) as u16,
            arterial_pressure: clamp_to_range(keys::ARTERIAL_PRESSURE, arterial) as u16,
            venous_pressure: clamp_to_range(keys::VENOUS_PRESSURE, venous) as u16,
            temperature_raw: (clamp_to_range(keys::DIALYSATE_TEMPERATURE, temperature) * 100.0)
                .round() as u16,
            conductivity_raw: (clamp_to_range(keys::CONDUCTIVITY, conductivity) * 100.0).round()
                as u16,
            treatment_time: self.treatment_time,
        }
    }

    /// Write the next reading into a register bank at the map's addresses.
    pub fn refresh(&mut self, bank: &mut RegisterBank) {
        let reading = self.next_reading();
        bank.store(0, reading.blood_flow);
        bank.store(2, reading.arterial_pressure);
        bank.store(4, reading.venous_pressure);
        bank.store(6, reading.temperature_raw);
        bank.store(8, reading.conductivity_raw);
        bank.store(10, reading.treatment_time);
    }

    /// Shift arterial pressure into hypotension territory.
    pub fn inject_hypotension(&mut self) {
        self.hypotension_mode = true;
    }

    /// Clear injected anomalies.
    pub fn clear_anomalies(&mut self) {
        self.hypotension_mode = false;
    }

    /// Reset treatment time and anomaly state.
    pub fn reset(&mut self) {
        self.treatment_time = 0;
        self.hypotension_mode = false;
    }
}

impl Default for TelemetryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_to_range(key: &str, value: f64) -> f64 {
    let spec: &RegisterSpec = REGISTER_MAP
        .iter()
        .find(|spec| spec.name == key)
        .expect("measurement key present in register map");
    value.clamp(spec.min, spec.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medlink_core::registers::spec_for;

    #[test]
    fn readings_stay_within_register_ranges() {
        let mut generator = TelemetryGenerator::new();
        for _ in 0..200 {
            let reading = generator.next_reading();
            let bf = spec_for(keys::BLOOD_FLOW).unwrap();
            assert!(f64::from(reading.blood_flow) >= bf.min);
            assert!(f64::from(reading.blood_flow) <= bf.max);
            let temp = f64::from(reading.temperature_raw) * 0.01;
            assert!((35.0..=38.0).contains(&temp));
            let cond = f64::from(reading.conductivity_raw) * 0.01;
            assert!((13.5..=14.5).contains(&cond));
        }
    }

    #[test]
    fn treatment_time_advances_per_reading() {
        let mut generator = TelemetryGenerator::new();
        assert_eq!(generator.next_reading().treatment_time, 5);
        assert_eq!(generator.next_reading().treatment_time, 10);
        generator.reset();
        assert_eq!(generator.next_reading().treatment_time, 5);
    }

    #[test]
    fn hypotension_mode_lowers_arterial_pressure() {
        let mut generator = TelemetryGenerator::new();
        generator.inject_hypotension();
        for _ in 0..50 {
            let reading = generator.next_reading();
            assert!(reading.arterial_pressure < 100);
        }
        generator.clear_anomalies();
        let reading = generator.next_reading();
        assert!(reading.arterial_pressure > 100);
    }

    #[test]
    fn refresh_writes_map_addresses() {
        let mut generator = TelemetryGenerator::new();
        let mut bank = RegisterBank::new();
        generator.refresh(&mut bank);
        assert!(bank.load(0) >= 200);
        assert!(bank.load(6) >= 3500);
        assert_eq!(bank.load(10), 5);
    }
}
