use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or evaluating a network file.
#[derive(Error, Debug)]
pub enum TouchstoneError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot determine port count from file name '{0}' (expected .sNp)")]
    UnknownExtension(String),

    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Unsupported network parameter '{0}', only S-parameters are supported")]
    UnsupportedParameter(String),

    #[error("Line {line}: keyword '{keyword}' is not supported")]
    UnsupportedKeyword { line: usize, keyword: String },

    #[error("File declares {declared} ports but {expected} were expected")]
    PortCountMismatch { declared: usize, expected: usize },

    #[error("File declares {declared} {what} but contains {found}")]
    CountMismatch {
        what: &'static str,
        declared: usize,
        found: usize,
    },

    #[error("Incomplete data: {0} trailing value(s) do not form a full frequency point")]
    IncompleteData(usize),

    #[error("Network contains no frequency points")]
    Empty,

    #[error("Frequencies must be strictly increasing ({previous} Hz followed by {next} Hz)")]
    UnsortedFrequencies { previous: f64, next: f64 },

    #[error("Frequency {frequency} Hz is outside the network range [{min}, {max}] Hz")]
    OutOfRange { frequency: f64, min: f64, max: f64 },

    #[error("Parameter S{}{} does not exist in a {ports}-port network", .row + 1, .col + 1)]
    PortIndex { row: usize, col: usize, ports: usize },
}

/// Result type for Touchstone operations.
pub type TouchstoneResult<T> = Result<T, TouchstoneError>;
