//! N-port networks and frequency interpolation of their S-parameters.

use std::path::Path;

use num_complex::Complex64;
use tracing::debug;

use crate::error::{TouchstoneError, TouchstoneResult};
use crate::parser;

/// Scattering matrix of an N-port network at a single frequency.
///
/// Indices are zero-based: `get(1, 0)` is S21.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringMatrix {
    ports: usize,
    data: Vec<Complex64>,
}

impl ScatteringMatrix {
    pub(crate) fn from_row_major(ports: usize, data: Vec<Complex64>) -> Self {
        debug_assert_eq!(data.len(), ports * ports);
        Self { ports, data }
    }

    /// Number of ports.
    pub fn ports(&self) -> usize {
        self.ports
    }

    /// Complex parameter at `(row, col)`, or `None` if the index is out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex64> {
        if row < self.ports && col < self.ports {
            Some(self.data[row * self.ports + col])
        } else {
            None
        }
    }

    /// Magnitude of the parameter at `(row, col)` in dB (`20·log10|s|`).
    pub fn db(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col).map(|s| 20.0 * s.norm().log10())
    }

    /// Element-wise linear interpolation: `self + t·(other - self)`.
    fn lerp(&self, other: &Self, t: f64) -> Self {
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a + (b - a) * t)
            .collect();
        Self {
            ports: self.ports,
            data,
        }
    }
}

/// Two-port noise parameters at one frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParameters {
    /// Frequency in Hz
    pub frequency: f64,
    /// Minimum noise figure in dB
    pub min_noise_figure_db: f64,
    /// Source reflection coefficient giving the minimum noise figure
    pub optimal_reflection: Complex64,
    /// Effective noise resistance divided by the reference impedance
    pub normalized_noise_resistance: f64,
}

/// An N-port network sampled on a strictly increasing frequency grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    ports: usize,
    frequencies: Vec<f64>,
    matrices: Vec<ScatteringMatrix>,
    reference_impedance: f64,
    noise: Vec<NoiseParameters>,
}

impl Network {
    pub(crate) fn from_parts(
        ports: usize,
        frequencies: Vec<f64>,
        matrices: Vec<ScatteringMatrix>,
        reference_impedance: f64,
        noise: Vec<NoiseParameters>,
    ) -> Self {
        Self {
            ports,
            frequencies,
            matrices,
            reference_impedance,
            noise,
        }
    }

    /// Load a Touchstone file; the port count comes from its `.sNp` extension.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use touchstone::Network;
    ///
    /// let network = Network::from_file("cable.s2p")?;
    /// let loss_db = network.transmission_db_at(2.4e9)?;
    /// println!("S21 at 2.4 GHz: {loss_db:.2} dB");
    /// # Ok::<(), touchstone::TouchstoneError>(())
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> TouchstoneResult<Self> {
        let path = path.as_ref();
        let ports = ports_from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| TouchstoneError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let network = Self::from_touchstone_str(&text, ports)?;
        let (min, max) = network.frequency_range();
        debug!(
            "Loaded {}-port network from {} ({} points, {} Hz to {} Hz)",
            ports,
            path.display(),
            network.point_count(),
            min,
            max
        );
        Ok(network)
    }

    /// Parse Touchstone text for a network with the given port count.
    pub fn from_touchstone_str(text: &str, ports: usize) -> TouchstoneResult<Self> {
        if ports == 0 {
            return Err(TouchstoneError::Syntax {
                line: 0,
                message: "Port count must be at least 1".to_string(),
            });
        }
        parser::parse(text, ports)
    }

    /// Number of ports.
    pub fn ports(&self) -> usize {
        self.ports
    }

    /// Frequency grid in Hz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Scattering matrices, one per grid frequency.
    pub fn matrices(&self) -> &[ScatteringMatrix] {
        &self.matrices
    }

    /// Number of frequency points (always at least one).
    pub fn point_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Reference impedance in ohms, common to all ports.
    pub fn reference_impedance(&self) -> f64 {
        self.reference_impedance
    }

    /// Noise parameters of a two-port file, empty when the file has none.
    pub fn noise(&self) -> &[NoiseParameters] {
        &self.noise
    }

    /// Lowest and highest grid frequency in Hz.
    pub fn frequency_range(&self) -> (f64, f64) {
        let min = self.frequencies.first().copied().unwrap_or(f64::NAN);
        let max = self.frequencies.last().copied().unwrap_or(f64::NAN);
        (min, max)
    }

    /// Scattering matrix at `frequency_hz`.
    ///
    /// A frequency on the grid returns the stored matrix; between grid points
    /// the real and imaginary parts of every element are interpolated
    /// linearly from the two bracketing points.
    ///
    /// # Errors
    ///
    /// Returns [`TouchstoneError::OutOfRange`] if the frequency lies outside
    /// the grid (or is NaN).
    pub fn evaluate_at(&self, frequency_hz: f64) -> TouchstoneResult<ScatteringMatrix> {
        let (min, max) = self.frequency_range();
        if !(frequency_hz >= min && frequency_hz <= max) {
            return Err(TouchstoneError::OutOfRange {
                frequency: frequency_hz,
                min,
                max,
            });
        }

        let idx = match self
            .frequencies
            .binary_search_by(|f| f.total_cmp(&frequency_hz))
        {
            Ok(exact_idx) => return Ok(self.matrices[exact_idx].clone()),
            Err(insert_idx) => insert_idx,
        };

        // Range check above guarantees 0 < idx < len
        let (f1, f2) = (self.frequencies[idx - 1], self.frequencies[idx]);
        let t = (frequency_hz - f1) / (f2 - f1);
        Ok(self.matrices[idx - 1].lerp(&self.matrices[idx], t))
    }

    /// Transmission magnitude `|S21|` in dB at `frequency_hz`.
    pub fn transmission_db_at(&self, frequency_hz: f64) -> TouchstoneResult<f64> {
        self.evaluate_at(frequency_hz)?
            .db(1, 0)
            .ok_or(TouchstoneError::PortIndex {
                row: 1,
                col: 0,
                ports: self.ports,
            })
    }
}

/// Port count encoded in a `.sNp` file extension (case-insensitive).
pub fn ports_from_path(path: &Path) -> TouchstoneResult<usize> {
    let unknown = || TouchstoneError::UnknownExtension(path.display().to_string());

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(unknown)?
        .to_ascii_lowercase();

    ext.strip_prefix('s')
        .and_then(|rest| rest.strip_suffix('p'))
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .ok_or_else(unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two points: S21 goes from 0.5 to 0.25 (RI), everything else constant.
    fn two_port() -> Network {
        let text = "\
# GHz S RI R 50
1.0  0.1 0.0  0.5 0.0   0.6 0.0  0.2 0.0
2.0  0.1 0.0  0.25 0.5  0.6 0.0  0.2 0.0
";
        Network::from_touchstone_str(text, 2).unwrap()
    }

    #[test]
    fn test_exact_grid_point() {
        let network = two_port();
        let m = network.evaluate_at(2e9).unwrap();
        assert_eq!(m, network.matrices()[1]);
    }

    #[test]
    fn test_interpolates_real_and_imaginary() {
        let network = two_port();
        let m = network.evaluate_at(1.5e9).unwrap();
        let s21 = m.get(1, 0).unwrap();
        assert_relative_eq!(s21.re, 0.375, epsilon = 1e-12);
        assert_relative_eq!(s21.im, 0.25, epsilon = 1e-12);
        assert_relative_eq!(m.get(0, 1).unwrap().re, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range() {
        let network = two_port();
        for f in [0.5e9, 2.5e9, f64::NAN] {
            assert!(matches!(
                network.evaluate_at(f),
                Err(TouchstoneError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_transmission_db() {
        let network = two_port();
        assert_relative_eq!(
            network.transmission_db_at(1e9).unwrap(),
            20.0 * 0.5f64.log10(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_transmission_needs_two_ports() {
        let network = Network::from_touchstone_str("# GHz S RI\n1 0.5 0\n", 1).unwrap();
        assert!(matches!(
            network.transmission_db_at(1e9),
            Err(TouchstoneError::PortIndex { ports: 1, .. })
        ));
    }

    #[test]
    fn test_single_point_network() {
        let network = Network::from_touchstone_str("# GHz S RI\n1 0.5 0\n", 1).unwrap();
        assert_eq!(network.frequency_range(), (1e9, 1e9));
        assert!(network.evaluate_at(1e9).is_ok());
        assert!(network.evaluate_at(1.1e9).is_err());
    }

    #[test]
    fn test_matrix_index_bounds() {
        let network = two_port();
        let m = &network.matrices()[0];
        assert_eq!(m.ports(), 2);
        assert!(m.get(2, 0).is_none());
        assert!(m.db(0, 2).is_none());
    }

    #[test]
    fn test_ports_from_path() {
        assert_eq!(ports_from_path(Path::new("cable.s2p")).unwrap(), 2);
        assert_eq!(ports_from_path(Path::new("/data/COUPLER.S3P")).unwrap(), 3);
        assert_eq!(ports_from_path(Path::new("load.s1p")).unwrap(), 1);
        for bad in ["cable.txt", "cable", "cable.s0p", "cable.sp", "cable.s2"] {
            assert!(matches!(
                ports_from_path(Path::new(bad)),
                Err(TouchstoneError::UnknownExtension(_))
            ));
        }
    }

    #[test]
    fn test_zero_ports_rejected() {
        assert!(Network::from_touchstone_str("1 0 0", 0).is_err());
    }
}
