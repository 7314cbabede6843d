//! Single-shot power measurement sequence.
//!
//! # Sequence
//!
//! 1. Open a session (identification query on connect, no reset), set a 3 s
//!    command timeout and enable the status check after every command
//! 2. `*RST`, `INIT:CONT OFF`
//! 3. Configure: `INIT:CONT OFF`, function `POW:AVG`, frequency, auto
//!    averaging, averaging count, averaging on with repeat terminal control,
//!    aperture
//! 4. `INIT:IMM`
//! 5. Resolve the level offset (manual, or `|S21|` from a network file)
//! 6. Apply the offset and enable offset correction
//! 7. Poll `STAT:OPER:COND?` until the `MEASURING` bit clears
//! 8. `FORMAT ASCII`, `FETCH?`, first field in watts
//! 9. Convert to dBm; a reading with no finite dBm value aborts
//!
//! The session is closed exactly once when the sequence ends, whether it
//! succeeded or failed. A session that never opened is not closed.

use std::time::Duration;

use hardware::rs::{NrpSensor, PollPolicy, SensorFunction, TerminalControl};
use hardware::scpi::{OpenOptions, ScpiDevice, ScpiResult, ScpiSession};
use tracing::{debug, error, info, warn};

use crate::calibration::resolve_offset;
use crate::convert::watts_to_dbm;
use crate::error::MeasurementError;
use crate::request::{MeasurementRequest, MeasurementResult};

/// Timeout applied to every command of a measurement session.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(3);

/// Opens instrument sessions by resource name.
pub trait SessionFactory {
    type Session: ScpiSession;

    /// Open a session to `resource_name`.
    fn open(&self, resource_name: &str, options: OpenOptions) -> ScpiResult<Self::Session>;
}

/// Opens real instrument sessions.
///
/// `::SOCKET`, `TCPIP` and `host[:port]` names use the raw SCPI socket;
/// `RSNRP`, `USB` and other `::INSTR` names go through VISA, which needs the
/// `visa` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstrumentSessionFactory;

impl SessionFactory for InstrumentSessionFactory {
    type Session = ScpiDevice;

    fn open(&self, resource_name: &str, options: OpenOptions) -> ScpiResult<ScpiDevice> {
        let device = ScpiDevice::open(resource_name, options)?;
        info!(
            "Connected to {} ({})",
            device.endpoint(),
            device.idn().unwrap_or("no identification")
        );
        Ok(device)
    }
}

/// Closes the wrapped session when dropped.
struct SessionGuard<'a, S: ScpiSession> {
    session: S,
    resource_name: &'a str,
}

impl<S: ScpiSession> Drop for SessionGuard<'_, S> {
    fn drop(&mut self) {
        match self.session.close() {
            Ok(()) => debug!("Session to {} closed", self.resource_name),
            Err(e) => warn!("Failed to close session to {}: {}", self.resource_name, e),
        }
    }
}

/// Runs single-shot power measurements.
#[derive(Debug, Clone)]
pub struct MeasurementOrchestrator<F: SessionFactory = InstrumentSessionFactory> {
    factory: F,
    poll_policy: PollPolicy,
}

impl MeasurementOrchestrator<InstrumentSessionFactory> {
    /// Orchestrator that talks to real sensors.
    pub fn new() -> Self {
        Self::with_factory(InstrumentSessionFactory)
    }
}

impl Default for MeasurementOrchestrator<InstrumentSessionFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SessionFactory> MeasurementOrchestrator<F> {
    /// Orchestrator using a custom session factory and the default poll budget.
    pub fn with_factory(factory: F) -> Self {
        Self {
            factory,
            poll_policy: PollPolicy::default(),
        }
    }

    /// Replace the completion poll budget.
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll_policy
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Perform one measurement.
    ///
    /// # Errors
    ///
    /// - [`MeasurementError::InvalidRequest`] before any I/O
    /// - [`MeasurementError::SessionInit`] if the session cannot be opened
    /// - [`MeasurementError::Timeout`] if the acquisition never completes
    /// - [`MeasurementError::InvalidReading`] if the fetched power is zero or NaN
    /// - [`MeasurementError::Instrument`] or [`MeasurementError::Calibration`]
    ///   for any other failure after the session was opened
    pub fn measure(
        &self,
        request: &MeasurementRequest,
    ) -> Result<MeasurementResult, MeasurementError> {
        request.validate()?;

        let result = self.run(request);
        if let Err(e) = &result {
            error!("Measurement on {} aborted: {}", request.resource_name, e);
        }
        result
    }

    fn run(&self, request: &MeasurementRequest) -> Result<MeasurementResult, MeasurementError> {
        let averaging_count = request.sensor_averaging_count()?;

        let session = self
            .factory
            .open(&request.resource_name, OpenOptions::id_query_only())
            .map_err(|source| MeasurementError::SessionInit { source })?;

        let mut guard = SessionGuard {
            session,
            resource_name: &request.resource_name,
        };
        guard.session.set_timeout(COMMAND_TIMEOUT);
        guard.session.set_status_checking(true);

        let mut sensor = NrpSensor::new(&mut guard.session);

        // ==================== Setup ====================

        sensor.reset()?;
        sensor.set_continuous(false)?;

        // ==================== Configuration ====================

        sensor.set_continuous(false)?;
        sensor.select_function(SensorFunction::PowerAverage)?;
        sensor.set_frequency(request.frequency_hz)?;
        sensor.set_auto_averaging(request.auto_averaging)?;
        sensor.set_averaging_count(averaging_count)?;
        sensor.set_averaging_enabled(true)?;
        sensor.set_terminal_control(TerminalControl::Repeat)?;
        sensor.set_aperture(request.aperture_time_sec)?;

        // ==================== Acquisition ====================

        sensor.initiate()?;

        let offset = resolve_offset(
            request.frequency_hz,
            request.power_offset_db,
            request.deembed_path(),
        )?;
        debug!("Level offset: {}", offset);
        sensor.set_offset_db(offset.db())?;
        sensor.set_offset_enabled(true)?;

        let polls = sensor.wait_measurement_complete(self.poll_policy)?;
        debug!("Acquisition finished after {} poll(s)", polls);

        sensor.set_ascii_format()?;
        let power_w = sensor.fetch_power_watts()?;
        let power_dbm = watts_to_dbm(power_w);
        if !power_dbm.is_finite() {
            return Err(MeasurementError::InvalidReading { watts: power_w });
        }

        info!("Measured power: {} W, {:.3} dBm", power_w, power_dbm);
        Ok(MeasurementResult { power_dbm })
    }
}
