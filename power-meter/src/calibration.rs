//! Calibration offset resolution.
//!
//! The level offset applied by the sensor comes from exactly one source:
//! the manual offset in the request, or, when a de-embedding file is given,
//! the fixture's transmission loss `|S21|` in dB at the measurement
//! frequency. A file always replaces the manual offset; the two are never
//! added.

use std::fmt;
use std::path::{Path, PathBuf};

use touchstone::{Network, TouchstoneResult};
use tracing::{info, warn};

/// Level offset applied to the sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOffset {
    /// Caller-supplied offset in dB
    Manual(f64),
    /// `|S21|` in dB from a network file
    Deembedded { db: f64, path: PathBuf },
}

impl CalibrationOffset {
    /// Offset value in dB.
    pub fn db(&self) -> f64 {
        match self {
            CalibrationOffset::Manual(db) => *db,
            CalibrationOffset::Deembedded { db, .. } => *db,
        }
    }

    /// Whether the offset came from a network file.
    pub fn is_deembedded(&self) -> bool {
        matches!(self, CalibrationOffset::Deembedded { .. })
    }
}

impl fmt::Display for CalibrationOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationOffset::Manual(db) => write!(f, "{db} dB (manual)"),
            CalibrationOffset::Deembedded { db, path } => {
                write!(f, "{db} dB (from {})", path.display())
            }
        }
    }
}

/// Resolve the offset for a measurement at `frequency_hz`.
///
/// Without a de-embedding file the manual offset is returned unchanged.
/// With one, the file is loaded and evaluated at `frequency_hz` and
/// `manual_offset_db` is discarded.
pub fn resolve_offset(
    frequency_hz: f64,
    manual_offset_db: f64,
    deembed_path: Option<&Path>,
) -> TouchstoneResult<CalibrationOffset> {
    let Some(path) = deembed_path else {
        return Ok(CalibrationOffset::Manual(manual_offset_db));
    };

    let network = Network::from_file(path)?;
    let db = network.transmission_db_at(frequency_hz)?;

    if manual_offset_db != 0.0 {
        warn!(
            "Manual power offset {} dB is replaced by the de-embedding file",
            manual_offset_db
        );
    }
    info!(
        "Using offset {:.3} dB from network file {}",
        db,
        path.display()
    );

    Ok(CalibrationOffset::Deembedded {
        db,
        path: path.to_path_buf(),
    })
}
