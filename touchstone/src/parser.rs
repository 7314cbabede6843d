//! Touchstone text parser for version 1 and version 2.x files.
//!
//! Version 1 files are a header option line followed by a free stream of
//! numbers. Two-port files may end with a noise parameter block, which
//! starts at the first frequency that does not exceed the previous one.
//!
//! Version 2 files start with `[Version] 2.x` and describe their layout with
//! bracketed keywords; data only appears after `[Network Data]` or
//! `[Noise Data]`, and anything after `[End]` is ignored.

use num_complex::Complex64;

use crate::error::{TouchstoneError, TouchstoneResult};
use crate::network::{Network, NoiseParameters, ScatteringMatrix};
use crate::options::OptionLine;

/// Values per noise point: frequency, NFmin (dB), |Γopt|, ∠Γopt (deg), Rn.
const NOISE_POINT_LEN: usize = 5;

/// Element order of full two-port data points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TwoPortOrder {
    /// `S11 S21 S12 S22`, the only order in version 1 files
    Order21_12,
    /// `S11 S12 S21 S22`
    Order12_21,
}

/// Matrix elements listed per data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatrixFormat {
    Full,
    /// Diagonal and below, row by row
    Lower,
    /// Diagonal and above, row by row
    Upper,
}

/// Where the next line of numbers belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Reference,
    Information,
    Network,
    Noise,
    End,
}

struct Reader {
    ports: usize,
    version2: bool,
    options: Option<OptionLine>,
    two_port_order: TwoPortOrder,
    matrix_format: MatrixFormat,
    declared_frequencies: Option<usize>,
    declared_noise_frequencies: Option<usize>,
    references: Vec<f64>,
    section: Section,
    network_values: Vec<f64>,
    noise_values: Vec<f64>,
}

/// Parse Touchstone text describing a network with `ports` ports.
///
/// Data values may wrap across lines freely; they are consumed as one stream
/// of `1 + 2·N²` numbers per frequency point (`1 + N·(N+1)` for version 2
/// lower or upper matrices).
pub(crate) fn parse(text: &str, ports: usize) -> TouchstoneResult<Network> {
    let mut reader = Reader::new(ports);

    for (idx, raw_line) in text.lines().enumerate() {
        let content = match raw_line.split_once('!') {
            Some((before, _comment)) => before,
            None => raw_line,
        }
        .trim();

        if !content.is_empty() {
            reader.read_line(content, idx + 1)?;
        }
        if reader.section == Section::End {
            break;
        }
    }

    reader.finish()
}

impl Reader {
    fn new(ports: usize) -> Self {
        Self {
            ports,
            version2: false,
            options: None,
            two_port_order: TwoPortOrder::Order21_12,
            matrix_format: MatrixFormat::Full,
            declared_frequencies: None,
            declared_noise_frequencies: None,
            references: Vec::new(),
            section: Section::Header,
            network_values: Vec::new(),
            noise_values: Vec::new(),
        }
    }

    fn read_line(&mut self, content: &str, line: usize) -> TouchstoneResult<()> {
        if self.section == Section::Information {
            if let Some((keyword, _)) = split_keyword(content, line)? {
                if keyword.eq_ignore_ascii_case("end information") {
                    self.section = Section::Header;
                }
            }
            return Ok(());
        }

        if let Some((keyword, rest)) = split_keyword(content, line)? {
            return self.keyword(keyword, rest, line);
        }

        if let Some(fields) = content.strip_prefix('#') {
            // Only the first option line counts
            if self.options.is_none() {
                self.options = Some(OptionLine::parse(fields, line)?);
            }
            return Ok(());
        }

        let values = parse_numbers(content, line)?;
        match self.section {
            Section::Reference => {
                self.references.extend(values);
                if self.references.len() >= self.ports {
                    self.section = Section::Header;
                }
            }
            Section::Network => self.network_values.extend(values),
            Section::Noise => self.noise_values.extend(values),
            Section::Header if !self.version2 => self.network_values.extend(values),
            Section::Header => {
                return Err(TouchstoneError::Syntax {
                    line,
                    message: "Data outside [Network Data] or [Noise Data]".to_string(),
                })
            }
            Section::Information | Section::End => {}
        }
        Ok(())
    }

    fn keyword(&mut self, keyword: &str, rest: &str, line: usize) -> TouchstoneResult<()> {
        let syntax = |message: String| TouchstoneError::Syntax { line, message };
        let name = keyword.to_ascii_lowercase();

        if name == "version" {
            if rest.starts_with("2.") {
                self.version2 = true;
                return Ok(());
            }
            return Err(syntax(format!("Unsupported Touchstone version '{rest}'")));
        }

        // Keywords only exist in version 2 files
        if !self.version2 {
            return Err(TouchstoneError::UnsupportedKeyword {
                line,
                keyword: format!("[{keyword}]"),
            });
        }

        match name.as_str() {
            "number of ports" => {
                let declared = parse_count(rest, line)?;
                if declared != self.ports {
                    return Err(TouchstoneError::PortCountMismatch {
                        declared,
                        expected: self.ports,
                    });
                }
            }
            "two-port data order" => {
                self.two_port_order = match rest {
                    "21_12" => TwoPortOrder::Order21_12,
                    "12_21" => TwoPortOrder::Order12_21,
                    _ => return Err(syntax(format!("Invalid two-port data order '{rest}'"))),
                };
            }
            "number of frequencies" => {
                self.declared_frequencies = Some(parse_count(rest, line)?);
            }
            "number of noise frequencies" => {
                self.declared_noise_frequencies = Some(parse_count(rest, line)?);
            }
            "reference" => {
                self.references = parse_numbers(rest, line)?;
                if self.references.len() < self.ports {
                    self.section = Section::Reference;
                }
            }
            "matrix format" => {
                self.matrix_format = match rest.to_ascii_lowercase().as_str() {
                    "full" => MatrixFormat::Full,
                    "lower" => MatrixFormat::Lower,
                    "upper" => MatrixFormat::Upper,
                    _ => return Err(syntax(format!("Invalid matrix format '{rest}'"))),
                };
            }
            "begin information" => self.section = Section::Information,
            "network data" => self.section = Section::Network,
            "noise data" => {
                if self.ports != 2 {
                    return Err(syntax(
                        "Noise data is only defined for two-port networks".to_string(),
                    ));
                }
                self.section = Section::Noise;
            }
            "end" => self.section = Section::End,
            _ => {
                return Err(TouchstoneError::UnsupportedKeyword {
                    line,
                    keyword: format!("[{keyword}]"),
                })
            }
        }
        Ok(())
    }

    /// Element positions in the order a data point lists them.
    fn cell_order(&self) -> Vec<(usize, usize)> {
        let n = self.ports;
        match self.matrix_format {
            MatrixFormat::Full if n == 2 && self.two_port_order == TwoPortOrder::Order21_12 => {
                vec![(0, 0), (1, 0), (0, 1), (1, 1)]
            }
            MatrixFormat::Full => (0..n).flat_map(|r| (0..n).map(move |c| (r, c))).collect(),
            MatrixFormat::Lower => (0..n).flat_map(|r| (0..=r).map(move |c| (r, c))).collect(),
            MatrixFormat::Upper => (0..n).flat_map(|r| (r..n).map(move |c| (r, c))).collect(),
        }
    }

    fn reference_impedance(&self, options: &OptionLine) -> TouchstoneResult<f64> {
        let Some((&first, rest)) = self.references.split_first() else {
            return Ok(options.reference_impedance);
        };

        if self.references.len() != self.ports {
            return Err(TouchstoneError::CountMismatch {
                what: "reference impedances",
                declared: self.ports,
                found: self.references.len(),
            });
        }
        if rest.iter().any(|&z| z != first) {
            return Err(TouchstoneError::Syntax {
                line: 0,
                message: "Different reference impedances per port are not supported"
                    .to_string(),
            });
        }
        Ok(first)
    }

    fn finish(self) -> TouchstoneResult<Network> {
        let options = self.options.unwrap_or_default();
        let multiplier = options.unit.multiplier();
        let reference_impedance = self.reference_impedance(&options)?;

        let cells = self.cell_order();
        let point_len = 1 + 2 * cells.len();
        let symmetric = self.matrix_format != MatrixFormat::Full;

        let (network_values, noise_values) = if !self.version2 && self.ports == 2 {
            split_noise_block(self.network_values, point_len)
        } else {
            (self.network_values, self.noise_values)
        };

        let remainder = network_values.len() % point_len;
        if remainder != 0 {
            return Err(TouchstoneError::IncompleteData(remainder));
        }
        if network_values.is_empty() {
            return Err(TouchstoneError::Empty);
        }

        let n = self.ports;
        let mut frequencies = Vec::with_capacity(network_values.len() / point_len);
        let mut matrices = Vec::with_capacity(network_values.len() / point_len);

        for point in network_values.chunks_exact(point_len) {
            push_increasing(&mut frequencies, point[0] * multiplier)?;

            let mut data = vec![Complex64::new(0.0, 0.0); n * n];
            for (&(row, col), pair) in cells.iter().zip(point[1..].chunks_exact(2)) {
                let value = options.format.to_complex(pair[0], pair[1]);
                data[row * n + col] = value;
                if symmetric {
                    data[col * n + row] = value;
                }
            }
            matrices.push(ScatteringMatrix::from_row_major(n, data));
        }

        if let Some(declared) = self.declared_frequencies {
            if declared != frequencies.len() {
                return Err(TouchstoneError::CountMismatch {
                    what: "frequencies",
                    declared,
                    found: frequencies.len(),
                });
            }
        }

        let noise = parse_noise(&noise_values, multiplier)?;
        if let Some(declared) = self.declared_noise_frequencies {
            if declared != noise.len() {
                return Err(TouchstoneError::CountMismatch {
                    what: "noise frequencies",
                    declared,
                    found: noise.len(),
                });
            }
        }

        Ok(Network::from_parts(
            n,
            frequencies,
            matrices,
            reference_impedance,
            noise,
        ))
    }
}

/// Split a version 1 two-port value stream at the start of its noise block.
fn split_noise_block(mut values: Vec<f64>, point_len: usize) -> (Vec<f64>, Vec<f64>) {
    let mut start = point_len;
    while start < values.len() {
        if values[start] <= values[start - point_len] {
            let noise = values.split_off(start);
            return (values, noise);
        }
        start += point_len;
    }
    (values, Vec::new())
}

fn parse_noise(values: &[f64], multiplier: f64) -> TouchstoneResult<Vec<NoiseParameters>> {
    let remainder = values.len() % NOISE_POINT_LEN;
    if remainder != 0 {
        return Err(TouchstoneError::IncompleteData(remainder));
    }

    let mut frequencies = Vec::with_capacity(values.len() / NOISE_POINT_LEN);
    let mut noise = Vec::with_capacity(values.len() / NOISE_POINT_LEN);
    for point in values.chunks_exact(NOISE_POINT_LEN) {
        let frequency = point[0] * multiplier;
        push_increasing(&mut frequencies, frequency)?;
        noise.push(NoiseParameters {
            frequency,
            min_noise_figure_db: point[1],
            optimal_reflection: Complex64::from_polar(point[2], point[3].to_radians()),
            normalized_noise_resistance: point[4],
        });
    }
    Ok(noise)
}

fn push_increasing(frequencies: &mut Vec<f64>, frequency: f64) -> TouchstoneResult<()> {
    if let Some(&previous) = frequencies.last() {
        if frequency <= previous {
            return Err(TouchstoneError::UnsortedFrequencies {
                previous,
                next: frequency,
            });
        }
    }
    frequencies.push(frequency);
    Ok(())
}

/// `[Keyword] rest` split into its trimmed parts, or `None` for other lines.
fn split_keyword(content: &str, line: usize) -> TouchstoneResult<Option<(&str, &str)>> {
    let Some(inner) = content.strip_prefix('[') else {
        return Ok(None);
    };
    let (keyword, rest) = inner
        .split_once(']')
        .ok_or_else(|| TouchstoneError::Syntax {
            line,
            message: format!("Unterminated keyword '{content}'"),
        })?;
    Ok(Some((keyword.trim(), rest.trim())))
}

fn parse_numbers(content: &str, line: usize) -> TouchstoneResult<Vec<f64>> {
    content
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| TouchstoneError::Syntax {
                line,
                message: format!("Invalid number '{token}'"),
            })
        })
        .collect()
}

fn parse_count(value: &str, line: usize) -> TouchstoneResult<usize> {
    value.parse().map_err(|_| TouchstoneError::Syntax {
        line,
        message: format!("Invalid count '{value}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_PORT_RI: &str = "\
! Test fixture
# MHz S RI R 50
100  0.1 0.0   0.5 0.0   0.6 0.0   0.2 0.0
200  0.1 0.0   0.25 0.0  0.6 0.0   0.2 0.0 ! trailing comment
";

    #[test]
    fn test_two_port_ordering() {
        let network = parse(TWO_PORT_RI, 2).unwrap();
        assert_eq!(network.frequencies(), &[100e6, 200e6]);
        assert!(network.noise().is_empty());

        let first = &network.matrices()[0];
        assert_eq!(first.get(0, 0), Some(Complex64::new(0.1, 0.0)));
        assert_eq!(first.get(1, 0), Some(Complex64::new(0.5, 0.0)));
        assert_eq!(first.get(0, 1), Some(Complex64::new(0.6, 0.0)));
        assert_eq!(first.get(1, 1), Some(Complex64::new(0.2, 0.0)));
    }

    #[test]
    fn test_wrapped_data_lines() {
        let text = "# GHz S RI\n1.0 0.1 0.0 0.5 0.0\n0.6 0.0 0.2 0.0\n";
        let network = parse(text, 2).unwrap();
        assert_eq!(network.point_count(), 1);
        assert_eq!(network.frequencies(), &[1e9]);
    }

    #[test]
    fn test_three_port_row_major() {
        let mut text = String::from("# Hz S RI\n10");
        for k in 0..9 {
            text.push_str(&format!(" {k} 0"));
        }
        let network = parse(&text, 3).unwrap();
        let m = &network.matrices()[0];
        assert_eq!(m.get(0, 1), Some(Complex64::new(1.0, 0.0)));
        assert_eq!(m.get(1, 0), Some(Complex64::new(3.0, 0.0)));
        assert_eq!(m.get(2, 2), Some(Complex64::new(8.0, 0.0)));
    }

    #[test]
    fn test_default_options() {
        let network = parse("1 1 0\n2 0.5 90\n", 1).unwrap();
        assert_eq!(network.frequencies(), &[1e9, 2e9]);
        assert_eq!(network.reference_impedance(), 50.0);

        let s = network.matrices()[1].get(0, 0).unwrap();
        assert_relative_eq!(s.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(s.im, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_only_first_option_line_counts() {
        let network = parse("# Hz S RI R 75\n# GHz S MA R 50\n5 0.3 0.4\n", 1).unwrap();
        assert_eq!(network.frequencies(), &[5.0]);
        assert_eq!(network.reference_impedance(), 75.0);
        assert_eq!(network.matrices()[0].get(0, 0), Some(Complex64::new(0.3, 0.4)));
    }

    #[test]
    fn test_incomplete_point() {
        let text = "# GHz S RI\n1.0 0.1 0.0 0.5 0.0 0.6 0.0\n";
        assert!(matches!(
            parse(text, 2),
            Err(TouchstoneError::IncompleteData(7))
        ));
    }

    #[test]
    fn test_empty_network() {
        assert!(matches!(
            parse("! only comments\n# GHz S MA\n", 2),
            Err(TouchstoneError::Empty)
        ));
    }

    #[test]
    fn test_unsorted_frequencies() {
        let text = "# Hz S RI\n2 1 0\n1 1 0\n";
        assert!(matches!(
            parse(text, 1),
            Err(TouchstoneError::UnsortedFrequencies { .. })
        ));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let text = "# Hz S RI\n1 1 0\n2 x 0\n";
        assert!(matches!(
            parse(text, 1),
            Err(TouchstoneError::Syntax { line: 3, .. })
        ));
    }

    #[test]
    fn test_two_port_noise_block() {
        let text = "\
# GHz S MA R 50
1.0  0.3 10  0.9 -20  0.05 5  0.4 30
2.0  0.2 15  0.8 -40  0.05 8  0.3 35
! noise parameters
1.0 2.5 0.5 45 0.3
2.0 2.8 0.4 50 0.35
";
        let network = parse(text, 2).unwrap();
        assert_eq!(network.frequencies(), &[1e9, 2e9]);
        assert_relative_eq!(network.matrices()[1].get(1, 0).unwrap().norm(), 0.8, epsilon = 1e-12);

        let noise = network.noise();
        assert_eq!(noise.len(), 2);
        assert_eq!(noise[0].frequency, 1e9);
        assert_eq!(noise[0].min_noise_figure_db, 2.5);
        assert_relative_eq!(noise[0].optimal_reflection.norm(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(noise[0].optimal_reflection.arg().to_degrees(), 45.0, epsilon = 1e-9);
        assert_eq!(noise[1].normalized_noise_resistance, 0.35);
    }

    #[test]
    fn test_noise_block_may_start_at_last_frequency() {
        let text = "# GHz S RI\n1 0 0 1 0 1 0 0 0\n2 0 0 1 0 1 0 0 0\n2 1.5 0.2 10 0.2\n";
        let network = parse(text, 2).unwrap();
        assert_eq!(network.point_count(), 2);
        assert_eq!(network.noise().len(), 1);
    }

    #[test]
    fn test_incomplete_noise_block() {
        let text = "# GHz S RI\n1 0 0 1 0 1 0 0 0\n2 0 0 1 0 1 0 0 0\n1 2.5 0.5 45\n";
        assert!(matches!(
            parse(text, 2),
            Err(TouchstoneError::IncompleteData(4))
        ));
    }

    #[test]
    fn test_keyword_without_version_rejected() {
        let text = "# GHz S MA R 50\n[Number of Ports] 2\n";
        match parse(text, 2) {
            Err(TouchstoneError::UnsupportedKeyword { line, keyword }) => {
                assert_eq!(line, 2);
                assert_eq!(keyword, "[Number of Ports]");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_version_two_network() {
        let text = "\
[Version] 2.0
# GHz S RI R 50
[Number of Ports] 2
[Two-Port Data Order] 12_21
[Number of Frequencies] 2
[Reference] 50 50
[Begin Information]
VNA export, 11 Oct
[End Information]
[Network Data]
1.0  0.1 0.0  0.6 0.0  0.5 0.0  0.2 0.0
2.0  0.1 0.0  0.6 0.0  0.25 0.0 0.2 0.0
[End]
not parsed
";
        let network = parse(text, 2).unwrap();
        assert_eq!(network.frequencies(), &[1e9, 2e9]);
        assert_eq!(network.reference_impedance(), 50.0);

        // 12_21 lists S12 before S21
        let first = &network.matrices()[0];
        assert_eq!(first.get(0, 1), Some(Complex64::new(0.6, 0.0)));
        assert_eq!(first.get(1, 0), Some(Complex64::new(0.5, 0.0)));
        assert_eq!(network.matrices()[1].get(1, 0), Some(Complex64::new(0.25, 0.0)));
    }

    #[test]
    fn test_version_two_noise_data() {
        let text = "\
[Version] 2.0
# MHz S DB R 50
[Number of Ports] 2
[Two-Port Data Order] 21_12
[Number of Frequencies] 1
[Number of Noise Frequencies] 2
[Network Data]
1000  -20 0  -3 0  -40 0  -20 0
[Noise Data]
900  1.8 0.3 20 0.2
1100 2.0 0.3 25 0.2
[End]
";
        let network = parse(text, 2).unwrap();
        assert_relative_eq!(network.transmission_db_at(1e9).unwrap(), -3.0, epsilon = 1e-9);
        assert_eq!(network.noise().len(), 2);
        assert_eq!(network.noise()[1].frequency, 1.1e9);
    }

    #[test]
    fn test_version_two_lower_matrix() {
        let text = "\
[Version] 2.0
# Hz S RI R 50
[Number of Ports] 3
[Reference]
50 50
50
[Matrix Format] Lower
[Network Data]
10  1 0
    2 0  3 0
    4 0  5 0  6 0
";
        let network = parse(text, 3).unwrap();
        let m = &network.matrices()[0];
        assert_eq!(m.get(1, 0), Some(Complex64::new(2.0, 0.0)));
        assert_eq!(m.get(0, 1), Some(Complex64::new(2.0, 0.0)));
        assert_eq!(m.get(2, 1), Some(Complex64::new(5.0, 0.0)));
        assert_eq!(m.get(1, 2), Some(Complex64::new(5.0, 0.0)));
        assert_eq!(m.get(2, 2), Some(Complex64::new(6.0, 0.0)));
    }

    #[test]
    fn test_version_two_header_checks() {
        let ports = "[Version] 2.0\n# GHz S RI\n[Number of Ports] 4\n";
        assert!(matches!(
            parse(ports, 2),
            Err(TouchstoneError::PortCountMismatch { declared: 4, expected: 2 })
        ));

        let count = "[Version] 2.0\n# GHz S RI\n[Number of Frequencies] 3\n[Network Data]\n1 1 0\n";
        assert!(matches!(
            parse(count, 1),
            Err(TouchstoneError::CountMismatch { declared: 3, found: 1, .. })
        ));

        let outside = "[Version] 2.0\n# GHz S RI\n1 1 0\n";
        assert!(matches!(
            parse(outside, 1),
            Err(TouchstoneError::Syntax { line: 3, .. })
        ));

        let mixed = "[Version] 2.0\n# GHz S RI\n[Reference] 50 75\n[Network Data]\n1 1 0 1 0 1 0 1 0\n";
        assert!(matches!(parse(mixed, 2), Err(TouchstoneError::Syntax { .. })));

        let mixed_mode = "[Version] 2.1\n[Mixed-Mode Order] D2,1 C2,1\n";
        assert!(matches!(
            parse(mixed_mode, 2),
            Err(TouchstoneError::UnsupportedKeyword { line: 2, .. })
        ));

        assert!(matches!(
            parse("[Version] 3.0\n", 1),
            Err(TouchstoneError::Syntax { line: 1, .. })
        ));
    }
}
