//! Measurement failures and their abort reports.

use hardware::scpi::ScpiError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use touchstone::TouchstoneError;

/// Abort code reported for every failed measurement.
pub const ABORT_CODE: i32 = -1;

/// Errors that abort a measurement.
#[derive(Error, Debug)]
pub enum MeasurementError {
    /// Request parameters failed validation; no session was opened.
    #[error("Invalid measurement request: {0}")]
    InvalidRequest(String),

    /// The instrument session could not be opened.
    #[error("Error initializing the instrument session:\n{source}")]
    SessionInit {
        #[source]
        source: ScpiError,
    },

    /// Communication or instrument fault after the session was opened.
    #[error(transparent)]
    Instrument(ScpiError),

    /// The acquisition was still running after the whole poll budget.
    #[error("Measurement timed out")]
    Timeout {
        /// Status polls performed
        attempts: u32,
    },

    /// The de-embedding file could not be loaded or evaluated.
    #[error(transparent)]
    Calibration(#[from] TouchstoneError),

    /// The sensor returned a power with no finite dBm value (zero or NaN).
    #[error("Power reading of {watts} W cannot be expressed in dBm")]
    InvalidReading {
        /// Fetched value in watts
        watts: f64,
    },
}

impl From<ScpiError> for MeasurementError {
    fn from(err: ScpiError) -> Self {
        match err {
            ScpiError::MeasurementTimeout { attempts } => MeasurementError::Timeout { attempts },
            other => MeasurementError::Instrument(other),
        }
    }
}

impl MeasurementError {
    /// Code reported to the caller when the measurement aborts.
    pub fn abort_code(&self) -> i32 {
        ABORT_CODE
    }

    /// Whether the failure is attributable to the request rather than the instrument.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, MeasurementError::InvalidRequest(_))
    }

    /// Build the abort report returned to clients.
    pub fn report(&self) -> AbortReport {
        AbortReport {
            code: self.abort_code(),
            message: self.to_string(),
        }
    }
}

/// Body returned for an aborted measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortReport {
    pub code: i32,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_init_message_prefix() {
        let err = MeasurementError::SessionInit {
            source: ScpiError::ConnectionFailed("refused".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Error initializing the instrument session:\nConnection failed: refused"
        );
    }

    #[test]
    fn test_poll_timeout_maps_to_timeout() {
        let err = MeasurementError::from(ScpiError::MeasurementTimeout { attempts: 200 });
        assert!(matches!(err, MeasurementError::Timeout { attempts: 200 }));
        assert_eq!(err.to_string(), "Measurement timed out");
    }

    #[test]
    fn test_bus_errors_keep_their_message() {
        let err = MeasurementError::from(ScpiError::Timeout);
        assert!(matches!(err, MeasurementError::Instrument(ScpiError::Timeout)));
        assert_eq!(err.to_string(), "Timeout waiting for response");
    }

    #[test]
    fn test_invalid_reading_message() {
        let err = MeasurementError::InvalidReading { watts: 0.0 };
        assert_eq!(err.to_string(), "Power reading of 0 W cannot be expressed in dBm");
        assert!(!err.is_invalid_request());
        assert_eq!(err.report().code, -1);
    }

    #[test]
    fn test_report_uses_abort_code() {
        let report = MeasurementError::InvalidRequest("bad".to_string()).report();
        assert_eq!(report.code, -1);
        assert_eq!(report.message, "Invalid measurement request: bad");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], -1);
    }
}
