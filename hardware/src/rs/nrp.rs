//! Rohde & Schwarz NRP Power Sensor Driver
//!
//! This module provides a typed interface to the SCPI command set of the
//! R&S NRP family of thermal and diode power sensors (NRP-Z, NRPxxS(N),
//! NRPxxT(N)). It covers the subset needed for single-shot continuous-average
//! power measurements:
//!
//! - **Configuration**: function select, carrier frequency, averaging, aperture
//! - **Correction**: fixed level offset
//! - **Acquisition**: [`initiate`](NrpSensor::initiate),
//!   [`wait_measurement_complete`](NrpSensor::wait_measurement_complete),
//!   [`fetch_power_watts`](NrpSensor::fetch_power_watts)
//!
//! # Single-shot Measurements
//!
//! After `*RST` the sensor runs in continuous mode. Switching continuous mode
//! off and then issuing `INIT:IMM` starts exactly one acquisition; the
//! `MEASURING` bit (value 16) of the operation condition register stays set
//! until the result is ready for `FETCH?`.
//!
//! ```no_run
//! use hardware::rs::{NrpSensor, PollPolicy};
//! use hardware::scpi::{OpenOptions, ScpiDevice};
//!
//! let device = ScpiDevice::open("TCPIP0::192.168.1.50::5025::SOCKET", OpenOptions::default())?;
//! let mut sensor = NrpSensor::new(device);
//!
//! sensor.reset()?;
//! sensor.set_continuous(false)?;
//! sensor.set_frequency(2.4e9)?;
//! sensor.initiate()?;
//! sensor.wait_measurement_complete(PollPolicy::default())?;
//! sensor.set_ascii_format()?;
//! println!("Power: {} W", sensor.fetch_power_watts()?);
//! # Ok::<(), hardware::scpi::ScpiError>(())
//! ```
//!
//! # References
//!
//! - R&S NRP-Z Power Sensors Operating Manual, chapter "Remote Control Commands"
//! - R&S NRPxxS(N) User Manual, "Status Reporting System"

use std::time::Duration;

use tracing::debug;

use super::status::OperationStatus;
use crate::scpi::{ScpiError, ScpiResult, ScpiSession};

/// Status polls allowed for one acquisition.
pub const MEASUREMENT_POLL_ATTEMPTS: u32 = 200;

/// Delay between status polls.
pub const MEASUREMENT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Fixed-budget polling schedule for acquisition completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of status queries
    pub max_attempts: u32,
    /// Sleep between consecutive queries
    pub interval: Duration,
}

impl PollPolicy {
    /// Create a policy with an explicit budget.
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Worst-case time spent sleeping before the budget runs out.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    /// 200 polls, 20 ms apart (about 4 s).
    fn default() -> Self {
        Self::new(MEASUREMENT_POLL_ATTEMPTS, MEASUREMENT_POLL_INTERVAL)
    }
}

/// Measurement function selected with `SENS:FUNC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum SensorFunction {
    /// Continuous average power
    #[strum(serialize = "POW:AVG")]
    PowerAverage,
    /// Burst average power
    #[strum(serialize = "POW:BURS:AVG")]
    BurstAverage,
    /// Timeslot average power
    #[strum(serialize = "POW:TSL:AVG")]
    TimeslotAverage,
}

/// Averaging terminal control (`SENS:AVER:TCON`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum TerminalControl {
    /// Output only after the full averaging count (repeating average)
    #[strum(serialize = "REP")]
    Repeat,
    /// Output a moving average after every partial result
    #[strum(serialize = "MOV")]
    Moving,
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

/// Parse the power field of a `FETCH?` response.
///
/// The sensor may return several comma-separated values; the first is the
/// measured power in watts.
///
/// # Example
///
/// ```
/// use hardware::rs::parse_power_field;
///
/// assert_eq!(parse_power_field("0.001,1,2").unwrap(), 0.001);
/// assert_eq!(parse_power_field("-1.2E-11").unwrap(), -1.2e-11);
/// ```
pub fn parse_power_field(response: &str) -> ScpiResult<f64> {
    let first = response.split(',').next().unwrap_or_default().trim();
    if first.is_empty() {
        return Err(ScpiError::ParseError("Empty fetch response".to_string()));
    }

    first
        .parse::<f64>()
        .map_err(|_| ScpiError::ParseError(format!("Invalid power value: {first:?}")))
}

/// High-level driver for an R&S NRP power sensor.
///
/// Works over any [`ScpiSession`]; pass a `&mut` session to keep ownership
/// with the caller.
pub struct NrpSensor<S: ScpiSession> {
    session: S,
}

impl<S: ScpiSession> NrpSensor<S> {
    /// Wrap an open session.
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Access the underlying session for raw commands.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Unwrap the driver, returning the session.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Query device identification string.
    pub fn idn(&mut self) -> ScpiResult<String> {
        let response = self.session.query_string("*IDN?")?;
        Ok(response.trim().to_string())
    }

    // ==================== Setup ====================

    /// Reset to default settings and clear the error queue (`*RST`).
    pub fn reset(&mut self) -> ScpiResult<()> {
        self.session.write("*RST")
    }

    /// Enable or disable continuous triggering (`INIT:CONT`).
    ///
    /// Continuous mode must be off for `INIT:IMM` to start a single acquisition.
    pub fn set_continuous(&mut self, enabled: bool) -> ScpiResult<()> {
        self.session.write(&format!("INIT:CONT {}", on_off(enabled)))
    }

    /// Select the measurement function.
    pub fn select_function(&mut self, function: SensorFunction) -> ScpiResult<()> {
        self.session.write(&format!("SENS:FUNC \"{function}\""))
    }

    /// Set the carrier frequency used for the sensor's frequency response correction.
    pub fn set_frequency(&mut self, frequency_hz: f64) -> ScpiResult<()> {
        self.session.write(&format!("SENS:FREQ {frequency_hz}"))
    }

    // ==================== Averaging ====================

    /// Let the sensor choose the averaging count automatically.
    pub fn set_auto_averaging(&mut self, enabled: bool) -> ScpiResult<()> {
        self.session.write(&format!("SENS:AVER:COUN:AUTO {}", on_off(enabled)))
    }

    /// Set the manual averaging count.
    ///
    /// Ignored by the firmware while automatic averaging is on.
    pub fn set_averaging_count(&mut self, count: u32) -> ScpiResult<()> {
        self.session.write(&format!("SENS:AVER:COUN {count}"))
    }

    /// Enable or disable the averaging filter.
    pub fn set_averaging_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.session.write(&format!("SENS:AVER:STAT {}", on_off(enabled)))
    }

    /// Set averaging terminal control.
    pub fn set_terminal_control(&mut self, control: TerminalControl) -> ScpiResult<()> {
        self.session.write(&format!("SENS:AVER:TCON {control}"))
    }

    /// Set the integration window for continuous average power.
    pub fn set_aperture(&mut self, aperture_s: f64) -> ScpiResult<()> {
        self.session.write(&format!("SENS:POW:AVG:APER {aperture_s}"))
    }

    // ==================== Correction ====================

    /// Set the fixed level offset added to every result, in dB.
    pub fn set_offset_db(&mut self, offset_db: f64) -> ScpiResult<()> {
        self.session.write(&format!("SENS:CORR:OFFS {offset_db}"))
    }

    /// Enable or disable the fixed level offset.
    pub fn set_offset_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.session.write(&format!("SENS:CORR:OFFS:STAT {}", on_off(enabled)))
    }

    // ==================== Acquisition ====================

    /// Start a single acquisition (`INIT:IMM`).
    ///
    /// Returns immediately; the sensor measures in the background. Use
    /// [`wait_measurement_complete`](Self::wait_measurement_complete) before fetching.
    pub fn initiate(&mut self) -> ScpiResult<()> {
        self.session.write("INIT:IMM")
    }

    /// Read the operation condition register.
    pub fn operation_condition(&mut self) -> ScpiResult<OperationStatus> {
        let value = self.session.query_int("STAT:OPER:COND?")?;
        let bits = u16::try_from(value).map_err(|_| {
            ScpiError::InvalidResponse(format!("Invalid operation condition: {value}"))
        })?;
        Ok(OperationStatus::from_bits_retain(bits))
    }

    /// Check if an acquisition is still running.
    pub fn is_measuring(&mut self) -> ScpiResult<bool> {
        Ok(self.operation_condition()?.is_measuring())
    }

    /// Poll until the `MEASURING` bit clears or the budget is exhausted.
    ///
    /// Queries the operation condition up to `policy.max_attempts` times,
    /// sleeping `policy.interval` between queries. Returns the number of
    /// queries performed.
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::MeasurementTimeout`] if every query saw the bit set,
    /// or any bus error raised by a query.
    pub fn wait_measurement_complete(&mut self, policy: PollPolicy) -> ScpiResult<u32> {
        for attempt in 1..=policy.max_attempts {
            if !self.is_measuring()? {
                debug!("Measurement complete after {} status poll(s)", attempt);
                return Ok(attempt);
            }

            if attempt < policy.max_attempts {
                std::thread::sleep(policy.interval);
            }
        }

        Err(ScpiError::MeasurementTimeout {
            attempts: policy.max_attempts,
        })
    }

    /// Switch result transfer to text.
    pub fn set_ascii_format(&mut self) -> ScpiResult<()> {
        self.session.write("FORMAT ASCII")
    }

    /// Fetch the raw result string (`FETCH?`).
    pub fn fetch_raw(&mut self) -> ScpiResult<String> {
        self.session.query_string("FETCH?")
    }

    /// Fetch the last result and return its power field in watts.
    pub fn fetch_power_watts(&mut self) -> ScpiResult<f64> {
        let response = self.fetch_raw()?;
        parse_power_field(&response)
    }
}
