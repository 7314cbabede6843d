//! Touchstone network files and S-parameter lookup.
//!
//! Reads Touchstone files (`.s1p`, `.s2p`, ... `.sNp`, version 1 or 2.x)
//! holding scattering parameters measured on a frequency grid, and evaluates
//! the network at arbitrary frequencies inside that grid. Two-port noise
//! parameters are kept alongside but never interpolated.
//!
//! Supported option line fields:
//!
//! | Field | Values | Default |
//! |-------|--------|---------|
//! | Frequency unit | `Hz`, `kHz`, `MHz`, `GHz` | `GHz` |
//! | Parameter | `S` | `S` |
//! | Format | `RI`, `MA`, `DB` | `MA` |
//! | Reference impedance | `R <ohms>` | `50` |
//!
//! # Example
//!
//! ```
//! use touchstone::Network;
//!
//! let text = "# GHz S DB R 50\n\
//!             1.0  -30 0  -3 0  -3 0  -30 0\n\
//!             2.0  -30 0  -5 0  -5 0  -30 0\n";
//! let network = Network::from_touchstone_str(text, 2)?;
//! assert!((network.transmission_db_at(1.0e9)? + 3.0).abs() < 1e-9);
//! # Ok::<(), touchstone::TouchstoneError>(())
//! ```

mod error;
mod network;
mod options;
mod parser;

pub use error::{TouchstoneError, TouchstoneResult};
pub use network::{ports_from_path, Network, NoiseParameters, ScatteringMatrix};
pub use options::{DataFormat, FrequencyUnit, OptionLine};
