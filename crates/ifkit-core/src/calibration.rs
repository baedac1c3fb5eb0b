//! Full-scale conversion of raw analog readings.

use serde::{Deserialize, Serialize};

/// Fixed calibration constants latched when a device attaches.
///
/// A raw sensor reading maps linearly onto `0..=full_scale_voltage`, with
/// `full_scale_raw` as the reading that corresponds to full scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Voltage at full scale.
    #[serde(default = "default_full_scale_voltage")]
    pub full_scale_voltage: f64,
    /// Raw reading at full scale.
    #[serde(default = "default_full_scale_raw")]
    pub full_scale_raw: i32,
}

fn default_full_scale_voltage() -> f64 {
    5.0
}

fn default_full_scale_raw() -> i32 {
    1000
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            full_scale_voltage: default_full_scale_voltage(),
            full_scale_raw: default_full_scale_raw(),
        }
    }
}

impl Calibration {
    /// Create a calibration with explicit constants.
    pub fn new(full_scale_voltage: f64, full_scale_raw: i32) -> Self {
        Self {
            full_scale_voltage,
            full_scale_raw,
        }
    }

    /// Convert a raw sensor value to volts.
    pub fn raw_to_voltage(&self, raw: i32) -> f64 {
        f64::from(raw) * self.full_scale_voltage / f64::from(self.full_scale_raw)
    }

    /// Check the constants are usable for conversion.
    pub fn validate(&self) -> Result<(), String> {
        if self.full_scale_raw <= 0 {
            return Err(format!(
                "full_scale_raw must be positive, got {}",
                self.full_scale_raw
            ));
        }
        if !(self.full_scale_voltage.is_finite() && self.full_scale_voltage > 0.0) {
            return Err(format!(
                "full_scale_voltage must be a positive number, got {}",
                self.full_scale_voltage
            ));
        }
        Ok(())
    }
}
