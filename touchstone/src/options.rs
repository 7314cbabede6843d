//! The Touchstone option line: `# <unit> <parameter> <format> R <impedance>`.
//!
//! Every field is optional and may appear in any order. Missing fields take
//! the version 1 defaults: `# GHz S MA R 50`.

use num_complex::Complex64;

use crate::error::{TouchstoneError, TouchstoneResult};

/// Unit of the frequency column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyUnit {
    Hz,
    KHz,
    MHz,
    #[default]
    GHz,
}

impl FrequencyUnit {
    /// Factor converting a value in this unit to hertz.
    pub fn multiplier(self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1e3,
            FrequencyUnit::MHz => 1e6,
            FrequencyUnit::GHz => 1e9,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "HZ" => Some(FrequencyUnit::Hz),
            "KHZ" => Some(FrequencyUnit::KHz),
            "MHZ" => Some(FrequencyUnit::MHz),
            "GHZ" => Some(FrequencyUnit::GHz),
            _ => None,
        }
    }
}

/// Encoding of each complex parameter as a pair of numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    /// Real and imaginary parts
    RealImaginary,
    /// Linear magnitude and angle in degrees
    #[default]
    MagnitudeAngle,
    /// Magnitude in dB and angle in degrees
    DecibelAngle,
}

impl DataFormat {
    /// Decode one number pair into a complex value.
    pub fn to_complex(self, a: f64, b: f64) -> Complex64 {
        match self {
            DataFormat::RealImaginary => Complex64::new(a, b),
            DataFormat::MagnitudeAngle => Complex64::from_polar(a, b.to_radians()),
            DataFormat::DecibelAngle => {
                Complex64::from_polar(10f64.powf(a / 20.0), b.to_radians())
            }
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "RI" => Some(DataFormat::RealImaginary),
            "MA" => Some(DataFormat::MagnitudeAngle),
            "DB" => Some(DataFormat::DecibelAngle),
            _ => None,
        }
    }
}

/// Parsed option line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionLine {
    pub unit: FrequencyUnit,
    pub format: DataFormat,
    /// Reference impedance in ohms
    pub reference_impedance: f64,
}

impl Default for OptionLine {
    fn default() -> Self {
        Self {
            unit: FrequencyUnit::default(),
            format: DataFormat::default(),
            reference_impedance: 50.0,
        }
    }
}

impl OptionLine {
    /// Parse the fields following the leading `#`.
    ///
    /// `line` is the 1-based line number used in error messages.
    pub fn parse(fields: &str, line: usize) -> TouchstoneResult<Self> {
        let mut options = Self::default();
        let mut tokens = fields.split_whitespace();

        while let Some(raw) = tokens.next() {
            let token = raw.to_ascii_uppercase();

            if let Some(unit) = FrequencyUnit::from_token(&token) {
                options.unit = unit;
            } else if let Some(format) = DataFormat::from_token(&token) {
                options.format = format;
            } else if token == "S" {
                // Scattering parameters, the only supported kind
            } else if matches!(token.as_str(), "Y" | "Z" | "H" | "G") {
                return Err(TouchstoneError::UnsupportedParameter(raw.to_string()));
            } else if token == "R" {
                let value = tokens.next().ok_or_else(|| TouchstoneError::Syntax {
                    line,
                    message: "Missing reference impedance after 'R'".to_string(),
                })?;
                options.reference_impedance =
                    value.parse().map_err(|_| TouchstoneError::Syntax {
                        line,
                        message: format!("Invalid reference impedance '{value}'"),
                    })?;
            } else {
                return Err(TouchstoneError::Syntax {
                    line,
                    message: format!("Unknown option '{raw}'"),
                });
            }
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let options = OptionLine::parse("", 1).unwrap();
        assert_eq!(options.unit, FrequencyUnit::GHz);
        assert_eq!(options.format, DataFormat::MagnitudeAngle);
        assert_eq!(options.reference_impedance, 50.0);
    }

    #[test]
    fn test_any_order_and_case() {
        let options = OptionLine::parse(" r 75 ri s mhz", 3).unwrap();
        assert_eq!(options.unit, FrequencyUnit::MHz);
        assert_eq!(options.format, DataFormat::RealImaginary);
        assert_eq!(options.reference_impedance, 75.0);
    }

    #[test]
    fn test_rejects_other_parameters() {
        assert!(matches!(
            OptionLine::parse("GHz Z RI R 50", 1),
            Err(TouchstoneError::UnsupportedParameter(p)) if p == "Z"
        ));
    }

    #[test]
    fn test_rejects_bad_impedance() {
        assert!(matches!(
            OptionLine::parse("GHz S MA R", 4),
            Err(TouchstoneError::Syntax { line: 4, .. })
        ));
        assert!(matches!(
            OptionLine::parse("GHz S MA R fifty", 4),
            Err(TouchstoneError::Syntax { line: 4, .. })
        ));
        assert!(matches!(
            OptionLine::parse("GHz S XY", 2),
            Err(TouchstoneError::Syntax { line: 2, .. })
        ));
    }

    #[test]
    fn test_format_decoding() {
        let ri = DataFormat::RealImaginary.to_complex(0.5, -0.5);
        assert_eq!(ri, Complex64::new(0.5, -0.5));

        let ma = DataFormat::MagnitudeAngle.to_complex(2.0, 90.0);
        assert_relative_eq!(ma.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ma.im, 2.0, epsilon = 1e-12);

        let db = DataFormat::DecibelAngle.to_complex(-20.0, 180.0);
        assert_relative_eq!(db.re, -0.1, epsilon = 1e-12);
        assert_relative_eq!(db.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_multipliers() {
        assert_eq!(FrequencyUnit::Hz.multiplier(), 1.0);
        assert_eq!(FrequencyUnit::KHz.multiplier(), 1e3);
        assert_eq!(FrequencyUnit::MHz.multiplier(), 1e6);
        assert_eq!(FrequencyUnit::GHz.multiplier(), 1e9);
    }
}
