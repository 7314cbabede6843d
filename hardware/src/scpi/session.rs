//! Instrument session trait for measurement workflows.

use std::time::Duration;

use super::device::ScpiResult;
use super::response::parse_int;

/// Options applied while opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    /// Query `*IDN?` right after connecting
    pub id_query: bool,
    /// Send `*RST` right after connecting
    pub reset: bool,
}

impl OpenOptions {
    /// Identification query on connect, no reset.
    pub fn id_query_only() -> Self {
        Self {
            id_query: true,
            reset: false,
        }
    }
}

/// Interface for an open command/response instrument session.
///
/// Abstracts the bus transport so measurement sequences can run against
/// scripted sessions in tests.
pub trait ScpiSession {
    /// Send a command that produces no response.
    fn write(&mut self, command: &str) -> ScpiResult<()>;

    /// Send a query and return the response with line terminators removed.
    fn query_string(&mut self, command: &str) -> ScpiResult<String>;

    /// Send a query and parse the response as an integer.
    fn query_int(&mut self, command: &str) -> ScpiResult<i64> {
        let response = self.query_string(command)?;
        parse_int(&response)
    }

    /// Set the timeout applied to each bus operation.
    fn set_timeout(&mut self, timeout: Duration);

    /// Enable or disable the instrument error check after every command.
    fn set_status_checking(&mut self, enabled: bool);

    /// Release the session. Calling it again is a no-op.
    fn close(&mut self) -> ScpiResult<()>;
}

impl<S: ScpiSession + ?Sized> ScpiSession for &mut S {
    fn write(&mut self, command: &str) -> ScpiResult<()> {
        (**self).write(command)
    }

    fn query_string(&mut self, command: &str) -> ScpiResult<String> {
        (**self).query_string(command)
    }

    fn query_int(&mut self, command: &str) -> ScpiResult<i64> {
        (**self).query_int(command)
    }

    fn set_timeout(&mut self, timeout: Duration) {
        (**self).set_timeout(timeout)
    }

    fn set_status_checking(&mut self, enabled: bool) {
        (**self).set_status_checking(enabled)
    }

    fn close(&mut self) -> ScpiResult<()> {
        (**self).close()
    }
}
