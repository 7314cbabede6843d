//! Parsers for the small set of SCPI response shapes the drivers rely on.

use std::fmt;

use super::device::{ScpiError, ScpiResult};

/// One entry drained from the instrument's `SYST:ERR?` queue.
///
/// SCPI reports errors as `<code>,"<message>"`, with code `0` meaning the
/// queue is empty. Negative codes are standard SCPI errors (e.g. `-113`,
/// "Undefined header"); positive codes are device specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorQueueEntry {
    /// SCPI error code
    pub code: i32,
    /// Message text with the surrounding quotes removed
    pub message: String,
}

impl fmt::Display for ErrorQueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},\"{}\"", self.code, self.message)
    }
}

/// Parse an integer response such as `16`, `+16` or `16.0`.
///
/// Some firmware renders register values in NR2 form, so integral floats are
/// accepted as well.
///
/// # Example
///
/// ```
/// use hardware::scpi::parse_int;
///
/// assert_eq!(parse_int("+16\n").unwrap(), 16);
/// assert_eq!(parse_int("4.0").unwrap(), 4);
/// assert!(parse_int("1.5").is_err());
/// ```
pub fn parse_int(response: &str) -> ScpiResult<i64> {
    let trimmed = response.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
        _ => Err(ScpiError::ParseError(format!(
            "Invalid integer response: {trimmed:?}"
        ))),
    }
}

/// Parse a `SYST:ERR?` response into an [`ErrorQueueEntry`].
///
/// # Example
///
/// ```
/// use hardware::scpi::parse_error_entry;
///
/// let entry = parse_error_entry("-113,\"Undefined header\"").unwrap();
/// assert_eq!(entry.code, -113);
/// assert_eq!(entry.message, "Undefined header");
/// ```
pub fn parse_error_entry(response: &str) -> ScpiResult<ErrorQueueEntry> {
    let trimmed = response.trim();
    let (code, message) = match trimmed.split_once(',') {
        Some((code, message)) => (code, message.trim().trim_matches('"')),
        None => (trimmed, ""),
    };

    let code = code.trim().parse::<i32>().map_err(|_| {
        ScpiError::InvalidResponse(format!("Invalid error queue entry: {trimmed:?}"))
    })?;

    Ok(ErrorQueueEntry {
        code,
        message: message.to_string(),
    })
}

pub(crate) fn format_errors(errors: &[ErrorQueueEntry]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
