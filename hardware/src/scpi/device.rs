//! SCPI sessions over raw TCP sockets or VISA.
//!
//! LAN instruments such as the R&S NRP power sensors expose a raw socket
//! service (port 5025) that accepts SCPI commands as plain text. USB sensors
//! are opened through a VISA library when the `visa` feature is enabled.
//!
//! # Protocol Overview
//!
//! Every message is a single line terminated with LF (0x0A). Commands produce
//! no response; queries end in `?` and produce exactly one response line.
//!
//! ```text
//! > SENS:FREQ 1000000000
//! > STAT:OPER:COND?
//! < 16
//! ```
//!
//! ## Error Checking
//!
//! With status checking enabled (the default), every command and query is
//! followed by `*STB?`. When the error-queue bit (value 4) is set, the driver
//! drains `SYST:ERR?` until it reports `0,"No error"` and fails the call with
//! [`ScpiError::InstrumentStatus`].
//!
//! # Example
//!
//! ```no_run
//! use hardware::scpi::{OpenOptions, ScpiDevice};
//! use std::time::Duration;
//!
//! let mut device = ScpiDevice::open(
//!     "TCPIP0::192.168.1.50::5025::SOCKET",
//!     OpenOptions::id_query_only(),
//! )?;
//! device.set_timeout(Duration::from_secs(3));
//!
//! println!("Connected to: {}", device.idn().unwrap_or("unknown"));
//! device.write("INIT:CONT OFF")?;
//! let status = device.query_int("STAT:OPER:COND?")?;
//! println!("Operation condition: {status}");
//! device.close()?;
//! # Ok::<(), hardware::scpi::ScpiError>(())
//! ```

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use super::link::Link;
use super::resource::{Endpoint, VisaResource};
use super::response::{format_errors, parse_error_entry, parse_int, ErrorQueueEntry};
use super::session::{OpenOptions, ScpiSession};
use super::status::StatusByte;

/// Default timeout for connecting and for each bus operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on `SYST:ERR?` reads while draining the error queue.
const MAX_ERROR_QUEUE_DRAIN: usize = 32;

/// Errors that can occur during SCPI communication.
#[derive(Error, Debug)]
pub enum ScpiError {
    /// Low-level I/O error (socket or VISA read/write failure).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to open the connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The resource name cannot be reached by this transport.
    #[error("Unsupported resource: {0}")]
    UnsupportedResource(String),

    /// No response received within the timeout period.
    #[error("Timeout waiting for response")]
    Timeout,

    /// The session was already closed.
    #[error("Session is closed")]
    Closed,

    /// Response from the instrument doesn't match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Failed to parse a response value.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The instrument queued one or more errors while processing a command.
    #[error("Instrument error after '{command}': {}", format_errors(.errors))]
    InstrumentStatus {
        /// Command after which the error check fired
        command: String,
        /// Entries drained from `SYST:ERR?`
        errors: Vec<ErrorQueueEntry>,
    },

    /// A measurement was still running when the poll budget ran out.
    #[error("Measurement timed out after {attempts} status polls")]
    MeasurementTimeout {
        /// Number of status queries performed
        attempts: u32,
    },
}

/// Result type for SCPI operations.
pub type ScpiResult<T> = Result<T, ScpiError>;

/// SCPI instrument connected over a raw TCP socket or a VISA session.
///
/// Provides:
///
/// - Connection management via [`open`](Self::open) and [`connect`](Self::connect)
/// - Raw message I/O via [`send`](Self::send) and [`read`](Self::read)
/// - Checked commands and queries via [`write`](Self::write) and [`query`](Self::query)
/// - Error queue access via [`read_error_queue`](Self::read_error_queue)
///
/// For typed power sensor control, wrap the device in
/// [`NrpSensor`](crate::rs::NrpSensor).
pub struct ScpiDevice {
    link: Link,
    endpoint: Endpoint,
    timeout: Duration,
    status_checking: bool,
    idn: Option<String>,
    closed: bool,
}

impl ScpiDevice {
    /// Open a session to the instrument named by a VISA resource string.
    ///
    /// TCP/IP names connect to the raw SCPI socket; other `::INSTR` names are
    /// opened through VISA. Then optionally resets the instrument and/or
    /// caches its identification string as requested by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::UnsupportedResource`] for resource names no
    /// transport can reach (VISA names without the `visa` feature),
    /// [`ScpiError::ConnectionFailed`] if the connection cannot be opened, or
    /// any error raised by the connect-time queries.
    pub fn open(resource_name: &str, options: OpenOptions) -> ScpiResult<Self> {
        let mut device = match Endpoint::parse(resource_name)? {
            Endpoint::Socket(resource) => Self::connect(resource)?,
            Endpoint::Visa(name) => Self::connect_visa(&name)?,
        };

        if options.reset {
            device.write("*RST")?;
        }

        if options.id_query {
            let idn = device.query("*IDN?")?;
            debug!("Instrument identification: {}", idn);
            device.idn = Some(idn);
        }

        Ok(device)
    }

    /// Connect to an instrument endpoint.
    ///
    /// Each resolved address is tried in turn with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::ConnectionFailed`] if no address accepts the connection.
    pub fn connect(resource: VisaResource) -> ScpiResult<Self> {
        let addrs = (resource.host(), resource.port())
            .to_socket_addrs()
            .map_err(|e| ScpiError::ConnectionFailed(format!("Cannot resolve {resource}: {e}")))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, DEFAULT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
                    stream.set_write_timeout(Some(DEFAULT_TIMEOUT))?;
                    stream.set_nodelay(true)?;

                    debug!("Connected to SCPI instrument at {}", addr);

                    return Ok(Self::with_link(Link::Tcp(stream), Endpoint::Socket(resource)));
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(ScpiError::ConnectionFailed(match last_error {
            Some(e) => format!("Failed to connect to {resource}: {e}"),
            None => format!("No addresses found for {resource}"),
        }))
    }

    /// Open a resource through the VISA library.
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::ConnectionFailed`] if VISA cannot open the resource.
    #[cfg(feature = "visa")]
    pub fn connect_visa(resource_name: &str) -> ScpiResult<Self> {
        let link = super::visa::VisaLink::open(resource_name, DEFAULT_TIMEOUT)?;
        let mut device = Self::with_link(
            Link::Visa(link),
            Endpoint::Visa(resource_name.to_string()),
        );
        device.set_timeout(DEFAULT_TIMEOUT);
        Ok(device)
    }

    /// VISA resources need the `visa` feature.
    ///
    /// # Errors
    ///
    /// Always returns [`ScpiError::UnsupportedResource`].
    #[cfg(not(feature = "visa"))]
    pub fn connect_visa(resource_name: &str) -> ScpiResult<Self> {
        Err(ScpiError::UnsupportedResource(format!(
            "{resource_name} needs a VISA library; rebuild with the `visa` feature"
        )))
    }

    fn with_link(link: Link, endpoint: Endpoint) -> Self {
        Self {
            link,
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            status_checking: true,
            idn: None,
            closed: false,
        }
    }

    /// Endpoint this device is connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Identification string cached at open time, if it was queried.
    pub fn idn(&self) -> Option<&str> {
        self.idn.as_deref()
    }

    /// Current per-operation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the timeout for read/write operations.
    ///
    /// A timeout the transport rejects (such as zero) leaves the previous one
    /// in effect.
    pub fn set_timeout(&mut self, timeout: Duration) {
        match self.link.set_timeout(timeout) {
            Ok(()) => self.timeout = timeout,
            Err(e) => debug!(
                "Keeping {:?} timeout on {}, {:?} rejected: {}",
                self.timeout, self.endpoint, timeout, e
            ),
        }
    }

    /// Enable or disable the `*STB?` check after each command and query.
    pub fn set_status_checking(&mut self, enabled: bool) {
        self.status_checking = enabled;
    }

    /// Whether status checking is enabled.
    pub fn status_checking(&self) -> bool {
        self.status_checking
    }

    /// Send a raw message to the instrument.
    ///
    /// Appends a newline if not present. Does not read a response or check
    /// the error queue.
    pub fn send(&mut self, command: &str) -> ScpiResult<()> {
        self.ensure_open()?;

        let mut msg = command.to_string();
        if !msg.ends_with('\n') {
            msg.push('\n');
        }

        debug!("SCPI send: {:?}", msg.trim());
        self.link.send(msg.as_bytes())
    }

    /// Read one response line from the instrument.
    ///
    /// Reads bytes until LF and strips the trailing CR/LF.
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::Timeout`] if no complete line arrives within the
    /// configured timeout.
    pub fn read(&mut self) -> ScpiResult<String> {
        self.ensure_open()?;

        let response = self.link.read_line()?;
        trace!("SCPI recv: {:?}", response);
        Ok(response)
    }

    /// Send a command and check the instrument status afterwards.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use hardware::scpi::{OpenOptions, ScpiDevice};
    /// # let mut device = ScpiDevice::open("192.168.1.50", OpenOptions::default())?;
    /// device.write("SENS:FREQ 2.4e9")?;
    /// # Ok::<(), hardware::scpi::ScpiError>(())
    /// ```
    pub fn write(&mut self, command: &str) -> ScpiResult<()> {
        self.send(command)?;
        self.check_after(command)
    }

    /// Send a query, read the response, and check the instrument status.
    pub fn query(&mut self, command: &str) -> ScpiResult<String> {
        self.send(command)?;
        let response = self.read()?;
        self.check_after(command)?;
        Ok(response)
    }

    /// Send a query and parse the response as an integer.
    pub fn query_int(&mut self, command: &str) -> ScpiResult<i64> {
        let response = self.query(command)?;
        parse_int(&response)
    }

    /// Read the IEEE 488.2 status byte (`*STB?`) without further checks.
    pub fn read_status_byte(&mut self) -> ScpiResult<StatusByte> {
        self.send("*STB?")?;
        let response = self.read()?;
        let value = parse_int(&response)?;
        let bits = u8::try_from(value)
            .map_err(|_| ScpiError::InvalidResponse(format!("Invalid status byte: {response}")))?;
        Ok(StatusByte::from_bits_retain(bits))
    }

    /// Drain the instrument error queue.
    ///
    /// Reads `SYST:ERR?` until the instrument reports code `0`. Returns the
    /// entries in the order the instrument reported them.
    pub fn read_error_queue(&mut self) -> ScpiResult<Vec<ErrorQueueEntry>> {
        let mut errors = Vec::new();
        for _ in 0..MAX_ERROR_QUEUE_DRAIN {
            self.send("SYST:ERR?")?;
            let entry = parse_error_entry(&self.read()?)?;
            if entry.code == 0 {
                break;
            }
            errors.push(entry);
        }
        Ok(errors)
    }

    /// Check the status byte and fail if the instrument queued errors.
    ///
    /// Returns `Ok(())` if the error-queue bit is clear.
    pub fn check_status(&mut self, command: &str) -> ScpiResult<()> {
        let stb = self.read_status_byte()?;
        if !stb.has_errors() {
            return Ok(());
        }

        let errors = self.read_error_queue()?;
        if errors.is_empty() {
            return Ok(());
        }

        Err(ScpiError::InstrumentStatus {
            command: command.trim().to_string(),
            errors,
        })
    }

    /// Shut the connection down.
    ///
    /// Subsequent I/O fails with [`ScpiError::Closed`]; closing twice is a no-op.
    pub fn close(&mut self) -> ScpiResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.link.shutdown()?;

        debug!("SCPI session to {} closed", self.endpoint);
        Ok(())
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_after(&mut self, command: &str) -> ScpiResult<()> {
        if self.status_checking {
            self.check_status(command)
        } else {
            Ok(())
        }
    }

    fn ensure_open(&self) -> ScpiResult<()> {
        if self.closed {
            Err(ScpiError::Closed)
        } else {
            Ok(())
        }
    }
}

impl ScpiSession for ScpiDevice {
    fn write(&mut self, command: &str) -> ScpiResult<()> {
        ScpiDevice::write(self, command)
    }

    fn query_string(&mut self, command: &str) -> ScpiResult<String> {
        self.query(command)
    }

    fn query_int(&mut self, command: &str) -> ScpiResult<i64> {
        ScpiDevice::query_int(self, command)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        ScpiDevice::set_timeout(self, timeout)
    }

    fn set_status_checking(&mut self, enabled: bool) {
        ScpiDevice::set_status_checking(self, enabled)
    }

    fn close(&mut self) -> ScpiResult<()> {
        ScpiDevice::close(self)
    }
}
