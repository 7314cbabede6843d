//! VISA transport for instruments outside the LAN socket service.
//!
//! NRP-Z sensors hang off USB and are only reachable through a VISA library
//! (R&S VISA or NI-VISA), addressed as `RSNRP::<product id>::<serial>::INSTR`
//! or `USB0::0x0AAD::<product id>::<serial>::INSTR`.

use std::ffi::CString;
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use tracing::debug;
use visa_rs::attribute::AttrTmoValue;
use visa_rs::prelude::*;

use super::device::{ScpiError, ScpiResult};

/// Bytes requested per VISA read.
const READ_CHUNK: usize = 1024;

/// An open VISA session and the resource manager that owns it.
pub(crate) struct VisaLink {
    // Dropped before the manager
    instr: Option<Instrument>,
    _rm: DefaultRM,
}

impl VisaLink {
    /// Open `resource_name`, waiting at most `timeout` for the resource.
    pub(crate) fn open(resource_name: &str, timeout: Duration) -> ScpiResult<Self> {
        let rm = DefaultRM::new().map_err(|e| {
            ScpiError::ConnectionFailed(format!("Failed to create VISA resource manager: {e}"))
        })?;
        let name = CString::new(resource_name)
            .map_err(|_| ScpiError::UnsupportedResource(resource_name.to_string()))?;

        let instr = rm
            .open(&name.into(), AccessMode::NO_LOCK, timeout)
            .map_err(|e| {
                ScpiError::ConnectionFailed(format!("Failed to open {resource_name}: {e}"))
            })?;

        debug!("Opened VISA session to {}", resource_name);
        Ok(Self {
            instr: Some(instr),
            _rm: rm,
        })
    }

    fn instr(&mut self) -> ScpiResult<&mut Instrument> {
        self.instr.as_mut().ok_or(ScpiError::Closed)
    }

    pub(crate) fn send(&mut self, message: &[u8]) -> ScpiResult<()> {
        let instr = self.instr()?;
        instr.write_all(message)?;
        instr.flush()?;
        Ok(())
    }

    /// Read until LF or the end of the VISA message.
    pub(crate) fn read_line(&mut self) -> ScpiResult<String> {
        let instr = self.instr()?;
        let mut chunk = [0u8; READ_CHUNK];
        let mut bytes = Vec::new();

        loop {
            let n = instr.read(&mut chunk).map_err(|e| {
                if e.kind() == ErrorKind::TimedOut {
                    ScpiError::Timeout
                } else {
                    ScpiError::Io(e)
                }
            })?;
            bytes.extend_from_slice(&chunk[..n]);

            // A short read ends the message
            if n < READ_CHUNK || bytes.last() == Some(&b'\n') {
                break;
            }
        }

        Ok(String::from_utf8_lossy(&bytes)
            .trim_end_matches(|c| c == '\r' || c == '\n')
            .to_string())
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) -> ScpiResult<()> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let attr = AttrTmoValue::new_checked(millis).ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, format!("Invalid VISA timeout {timeout:?}"))
        })?;

        self.instr()?
            .set_attr(attr)
            .map_err(|e| io::Error::new(ErrorKind::Other, e.to_string()).into())
    }

    /// Close the session; the resource manager stays open until drop.
    pub(crate) fn close(&mut self) -> ScpiResult<()> {
        if self.instr.take().is_some() {
            debug!("VISA session closed");
        }
        Ok(())
    }
}
