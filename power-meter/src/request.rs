//! Measurement request and result types.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MeasurementError;

/// Default carrier frequency, 1 GHz.
pub const DEFAULT_FREQUENCY_HZ: f64 = 1e9;

/// Default aperture time, 10 ms.
pub const DEFAULT_APERTURE_S: f64 = 0.01;

/// Parameters of one power measurement.
///
/// Field names serialize in camelCase to match the published parameter
/// schema; fields missing from a JSON body take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeasurementRequest {
    /// VISA resource name of the sensor
    pub resource_name: String,
    /// Carrier frequency in Hz
    pub frequency_hz: f64,
    /// Integration window in seconds
    pub aperture_time_sec: f64,
    /// Let the sensor pick the averaging count
    pub auto_averaging: bool,
    /// Manual averaging count (sent regardless of `auto_averaging`)
    pub averaging_count: i32,
    /// Manual level offset in dB, ignored when a de-embedding file is given
    pub power_offset_db: f64,
    /// Touchstone file with the fixture network; empty for none
    pub deembed_file_path: String,
}

impl Default for MeasurementRequest {
    fn default() -> Self {
        Self {
            resource_name: String::new(),
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            aperture_time_sec: DEFAULT_APERTURE_S,
            auto_averaging: true,
            averaging_count: 1,
            power_offset_db: 0.0,
            deembed_file_path: String::new(),
        }
    }
}

impl MeasurementRequest {
    /// Request with default settings against `resource_name`.
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            ..Self::default()
        }
    }

    /// De-embedding file, or `None` when the path is blank.
    pub fn deembed_path(&self) -> Option<&Path> {
        let trimmed = self.deembed_file_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Path::new(trimmed))
        }
    }

    /// Averaging count as sent to the sensor.
    pub fn sensor_averaging_count(&self) -> Result<u32, MeasurementError> {
        u32::try_from(self.averaging_count)
            .ok()
            .filter(|&count| count >= 1)
            .ok_or_else(|| {
                MeasurementError::InvalidRequest(format!(
                    "averaging count must be at least 1, got {}",
                    self.averaging_count
                ))
            })
    }

    /// Check the request before any instrument I/O.
    pub fn validate(&self) -> Result<(), MeasurementError> {
        let invalid = |msg: String| Err(MeasurementError::InvalidRequest(msg));

        if self.resource_name.trim().is_empty() {
            return invalid("resource name is empty".to_string());
        }
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return invalid(format!(
                "frequency must be a positive number of Hz, got {}",
                self.frequency_hz
            ));
        }
        if !self.aperture_time_sec.is_finite() || self.aperture_time_sec <= 0.0 {
            return invalid(format!(
                "aperture time must be a positive number of seconds, got {}",
                self.aperture_time_sec
            ));
        }
        if !self.power_offset_db.is_finite() {
            return invalid(format!(
                "power offset must be finite, got {}",
                self.power_offset_db
            ));
        }
        self.sensor_averaging_count()?;
        Ok(())
    }
}

/// Outcome of a successful measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementResult {
    /// Calibrated power in dBm
    pub power_dbm: f64,
}
