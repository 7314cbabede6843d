//! Single-shot RF power measurement service.
//!
//! Configures an R&S NRP power sensor over SCPI, triggers one acquisition,
//! waits for it to complete, and returns the calibrated power in dBm. The
//! level offset comes either from the request or from a Touchstone
//! de-embedding file describing the test fixture.
//!
//! # Modules
//!
//! - [`orchestrator`] - The measurement sequence and session lifecycle
//! - [`request`] - Request/result types and validation
//! - [`calibration`] - Level offset resolution
//! - [`convert`] - Watts to dBm
//! - [`schema`] - Parameter schema published to clients
//! - [`config`] - Service configuration file
//! - [`server`] - HTTP host
//! - [`error`] - Measurement errors and abort reports
//!
//! # Example
//!
//! ```no_run
//! use power_meter::{MeasurementOrchestrator, MeasurementRequest};
//!
//! let orchestrator = MeasurementOrchestrator::new();
//! let mut request = MeasurementRequest::new("TCPIP0::192.168.1.50::5025::SOCKET");
//! request.frequency_hz = 2.4e9;
//! request.deembed_file_path = "fixtures/cable.s2p".to_string();
//!
//! let result = orchestrator.measure(&request)?;
//! println!("{:.3} dBm", result.power_dbm);
//! # Ok::<(), power_meter::MeasurementError>(())
//! ```

pub mod calibration;
pub mod config;
pub mod convert;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod schema;
pub mod server;

pub use calibration::{resolve_offset, CalibrationOffset};
pub use config::ServiceConfig;
pub use error::{AbortReport, MeasurementError, ABORT_CODE};
pub use orchestrator::{
    InstrumentSessionFactory, MeasurementOrchestrator, SessionFactory, COMMAND_TIMEOUT,
};
pub use request::{MeasurementRequest, MeasurementResult};
pub use schema::{measurement_schema, MeasurementSchema};
