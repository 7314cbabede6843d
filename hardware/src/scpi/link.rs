//! Byte transports underneath [`ScpiDevice`](super::ScpiDevice).

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::device::{ScpiError, ScpiResult};

/// An open connection to one instrument.
pub(crate) enum Link {
    /// Raw SCPI socket
    Tcp(TcpStream),
    /// VISA session
    #[cfg(feature = "visa")]
    Visa(super::visa::VisaLink),
}

impl Link {
    /// Write a complete, terminated message.
    pub(crate) fn send(&mut self, message: &[u8]) -> ScpiResult<()> {
        match self {
            Link::Tcp(stream) => {
                stream.write_all(message)?;
                stream.flush()?;
                Ok(())
            }
            #[cfg(feature = "visa")]
            Link::Visa(visa) => visa.send(message),
        }
    }

    /// Read one response line without its CR/LF terminator.
    pub(crate) fn read_line(&mut self) -> ScpiResult<String> {
        match self {
            Link::Tcp(stream) => read_socket_line(stream),
            #[cfg(feature = "visa")]
            Link::Visa(visa) => visa.read_line(),
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) -> ScpiResult<()> {
        match self {
            Link::Tcp(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                Ok(())
            }
            #[cfg(feature = "visa")]
            Link::Visa(visa) => visa.set_timeout(timeout),
        }
    }

    /// Release the connection.
    pub(crate) fn shutdown(&mut self) -> ScpiResult<()> {
        match self {
            Link::Tcp(stream) => match stream.shutdown(Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
                Err(e) => Err(e.into()),
            },
            #[cfg(feature = "visa")]
            Link::Visa(visa) => visa.close(),
        }
    }
}

/// Read bytes until LF; the socket timeout bounds the wait.
fn read_socket_line(stream: &mut TcpStream) -> ScpiResult<String> {
    let mut buf = [0u8; 1];
    let mut bytes = Vec::new();

    loop {
        match stream.read(&mut buf) {
            Ok(0) => {
                return Err(ScpiError::ConnectionFailed(
                    "Connection closed by instrument".to_string(),
                ))
            }
            Ok(_) => {
                if buf[0] == b'\n' {
                    break;
                }
                bytes.push(buf[0]);
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                return Err(ScpiError::Timeout);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(String::from_utf8_lossy(&bytes)
        .trim_end_matches('\r')
        .to_string())
}
