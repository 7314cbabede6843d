//! VISA-style resource names and how each one is reached.
//!
//! The measurement stack addresses instruments with VISA resource strings so
//! that the same names work with vendor tooling. TCP/IP resources are served
//! over the raw SCPI socket; every other `::INSTR` resource (USB, the R&S
//! `RSNRP` sensor bus, GPIB, ...) goes through a VISA library.
//!
//! | Resource | Endpoint |
//! |----------|----------|
//! | `TCPIP0::192.168.1.50::5025::SOCKET` | socket `192.168.1.50:5025` |
//! | `TCPIP::nrp33sn-101234::INSTR` | socket `nrp33sn-101234:5025` |
//! | `TCPIP0::10.0.0.7::inst0::INSTR` | socket `10.0.0.7:5025` |
//! | `10.0.0.7:5025`, `10.0.0.7` | socket `10.0.0.7:5025` |
//! | `[fe80::1]:5025`, `::1` | socket on the IPv6 address |
//! | `RSNRP::0x0003::101234::INSTR` | VISA |
//! | `USB0::0x0AAD::0x0138::101234::INSTR` | VISA |

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use super::device::{ScpiError, ScpiResult};

/// Port of the raw SCPI socket service on LAN instruments.
pub const DEFAULT_SCPI_PORT: u16 = 5025;

/// A TCP endpoint for an instrument served over the raw SCPI socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisaResource {
    host: String,
    port: u16,
}

impl VisaResource {
    /// Create a resource from an explicit host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a TCP/IP VISA resource string or a `host[:port]` shorthand.
    ///
    /// IPv6 hosts are written bare (`::1`) or bracketed (`[::1]:5025`).
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::UnsupportedResource`] for empty names, non-TCP/IP
    /// interfaces (`USB`, `GPIB`, `ASRL`, ...), unknown resource classes, or
    /// an invalid port. Use [`Endpoint::parse`] to accept those too.
    ///
    /// # Example
    ///
    /// ```
    /// use hardware::scpi::VisaResource;
    ///
    /// let res = VisaResource::parse("TCPIP0::192.168.1.50::5025::SOCKET")?;
    /// assert_eq!(res.host(), "192.168.1.50");
    /// assert_eq!(res.port(), 5025);
    /// # Ok::<(), hardware::scpi::ScpiError>(())
    /// ```
    pub fn parse(resource: &str) -> ScpiResult<Self> {
        let trimmed = resource.trim();
        if trimmed.is_empty() {
            return Err(ScpiError::UnsupportedResource(
                "empty resource name".to_string(),
            ));
        }

        if let Some(bracketed) = trimmed.strip_prefix('[') {
            return Self::parse_bracketed(trimmed, bracketed);
        }
        if trimmed.parse::<Ipv6Addr>().is_ok() {
            return Ok(Self::new(trimmed, DEFAULT_SCPI_PORT));
        }

        if trimmed.contains("::") {
            return Self::parse_visa(trimmed);
        }

        match trimmed.rsplit_once(':') {
            Some((host, port)) => Ok(Self::new(host, parse_port(trimmed, port)?)),
            None => Ok(Self::new(trimmed, DEFAULT_SCPI_PORT)),
        }
    }

    fn parse_bracketed(resource: &str, bracketed: &str) -> ScpiResult<Self> {
        let unsupported = || ScpiError::UnsupportedResource(resource.to_string());
        let (host, rest) = bracketed.split_once(']').ok_or_else(unsupported)?;
        if host.parse::<Ipv6Addr>().is_err() {
            return Err(unsupported());
        }

        let port = match rest.strip_prefix(':') {
            Some(port) => parse_port(resource, port)?,
            None if rest.is_empty() => DEFAULT_SCPI_PORT,
            None => return Err(unsupported()),
        };
        Ok(Self::new(host, port))
    }

    fn parse_visa(resource: &str) -> ScpiResult<Self> {
        let unsupported = || ScpiError::UnsupportedResource(resource.to_string());
        let parts: Vec<&str> = resource.split("::").map(str::trim).collect();

        let interface = parts[0].to_ascii_uppercase();
        let board = interface.strip_prefix("TCPIP").ok_or_else(unsupported)?;
        if !board.chars().all(|c| c.is_ascii_digit()) {
            return Err(unsupported());
        }

        let host = parts.get(1).copied().unwrap_or_default();
        if host.is_empty() {
            return Err(unsupported());
        }

        let class = parts[parts.len() - 1].to_ascii_uppercase();
        match (class.as_str(), parts.len()) {
            ("SOCKET", 4) => Ok(Self::new(host, parse_port(resource, parts[2])?)),
            ("INSTR", 3) | ("INSTR", 4) => Ok(Self::new(host, DEFAULT_SCPI_PORT)),
            _ => Err(unsupported()),
        }
    }

    /// Host name or IP address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

fn parse_port(resource: &str, port: &str) -> ScpiResult<u16> {
    port.trim()
        .parse::<u16>()
        .map_err(|_| ScpiError::UnsupportedResource(format!("invalid port in {resource}")))
}

impl fmt::Display for VisaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for VisaResource {
    type Err = ScpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How an instrument named by a resource string is reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Raw SCPI socket
    Socket(VisaResource),
    /// Resource opened through a VISA library, by its full name
    Visa(String),
}

impl Endpoint {
    /// Route a resource name to the socket or to VISA.
    ///
    /// # Errors
    ///
    /// Returns [`ScpiError::UnsupportedResource`] for names that are neither
    /// socket-reachable nor a VISA `::INSTR` resource.
    ///
    /// # Example
    ///
    /// ```
    /// use hardware::scpi::Endpoint;
    ///
    /// let usb = Endpoint::parse("RSNRP::0x0003::101234::INSTR")?;
    /// assert!(matches!(usb, Endpoint::Visa(_)));
    ///
    /// let lan = Endpoint::parse("TCPIP0::10.0.0.7::5025::SOCKET")?;
    /// assert!(matches!(lan, Endpoint::Socket(_)));
    /// # Ok::<(), hardware::scpi::ScpiError>(())
    /// ```
    pub fn parse(resource: &str) -> ScpiResult<Self> {
        let trimmed = resource.trim();
        if is_visa_instr(trimmed) {
            Ok(Endpoint::Visa(trimmed.to_string()))
        } else {
            VisaResource::parse(trimmed).map(Endpoint::Socket)
        }
    }

    /// Key identifying the instrument, equal for names that address the same one.
    pub fn key(&self) -> String {
        match self {
            Endpoint::Socket(resource) => resource.to_string(),
            Endpoint::Visa(name) => name.to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Socket(resource) => write!(f, "{resource}"),
            Endpoint::Visa(name) => write!(f, "{name}"),
        }
    }
}

/// A non-TCP/IP `<interface>::...::INSTR` name.
fn is_visa_instr(resource: &str) -> bool {
    let mut parts = resource.split("::").map(str::trim);
    let interface = parts.next().unwrap_or_default().to_ascii_uppercase();
    let class = parts.last().unwrap_or_default();

    let board = interface.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    interface.len() > board.len()
        && board.chars().all(|c| c.is_ascii_digit())
        && !interface.starts_with("TCPIP")
        && class.eq_ignore_ascii_case("INSTR")
}
