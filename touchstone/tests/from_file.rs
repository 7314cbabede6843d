//! Loading network files from disk

use std::io::Write;

use approx::assert_relative_eq;
use num_complex::Complex64;
use tempfile::TempDir;
use touchstone::{Network, TouchstoneError};

const CABLE_S2P: &str = "\
! 2 m SMA cable, measured with a VNA
# MHz S DB R 50
! freq   S11         S21          S12          S22
500      -32.1 12.0  -1.00 -80.0  -1.00 -80.0  -31.8 15.0
1000     -30.4 40.0  -1.50 -160.0 -1.50 -160.0 -30.0 44.0
2000     -27.9 95.0  -2.50 40.0   -2.50 40.0   -27.5 99.0
";

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_two_port_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "cable.s2p", CABLE_S2P);

    let network = Network::from_file(&path).unwrap();
    assert_eq!(network.ports(), 2);
    assert_eq!(network.point_count(), 3);
    assert_eq!(network.frequency_range(), (500e6, 2000e6));

    assert_relative_eq!(network.transmission_db_at(1e9).unwrap(), -1.5, epsilon = 1e-9);
    assert_relative_eq!(network.transmission_db_at(2e9).unwrap(), -2.5, epsilon = 1e-9);
}

#[test]
fn test_interpolated_transmission_between_points() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "cable.S2P", CABLE_S2P);

    let network = Network::from_file(&path).unwrap();
    let db = network.transmission_db_at(1.5e9).unwrap();

    // Midpoint of the complex values, not of the dB magnitudes
    let s1 = Complex64::from_polar(10f64.powf(-1.5 / 20.0), (-160f64).to_radians());
    let s2 = Complex64::from_polar(10f64.powf(-2.5 / 20.0), 40f64.to_radians());
    let expected = 20.0 * ((s1 + s2) / 2.0).norm().log10();
    assert_relative_eq!(db, expected, epsilon = 1e-9);
    assert!(db < -2.5);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = Network::from_file(dir.path().join("absent.s2p"));
    assert!(matches!(result, Err(TouchstoneError::Io { .. })));
}

#[test]
fn test_wrong_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "cable.csv", CABLE_S2P);
    assert!(matches!(
        Network::from_file(&path),
        Err(TouchstoneError::UnknownExtension(_))
    ));
}

#[test]
fn test_port_count_mismatch() {
    let dir = TempDir::new().unwrap();
    // Ten values do not split into one-port points of three
    let path = write_file(&dir, "cable.s1p", "# GHz S RI\n1 0.1 0 0.5 0 0.6 0 0.2 0 0.3\n");
    assert!(Network::from_file(&path).is_err());
}

#[test]
fn test_out_of_range_frequency() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "cable.s2p", CABLE_S2P);
    let network = Network::from_file(&path).unwrap();

    match network.transmission_db_at(6e9) {
        Err(TouchstoneError::OutOfRange { frequency, min, max }) => {
            assert_eq!(frequency, 6e9);
            assert_eq!(min, 500e6);
            assert_eq!(max, 2000e6);
        }
        other => panic!("Expected OutOfRange, got {other:?}"),
    }
}

#[test]
fn test_amplifier_export_with_noise_block() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "lna.s2p",
        "\
! LNA, S-parameters followed by noise parameters
# GHz S DB R 50
1.0  -12 170  15.0 80  -30 10  -10 -20
2.0  -14 150  14.0 40  -29 15  -11 -35
1.0  0.9 0.35 40 0.18
2.0  1.1 0.30 70 0.16
",
    );

    let network = Network::from_file(&path).unwrap();
    assert_eq!(network.point_count(), 2);
    assert_eq!(network.noise().len(), 2);
    let s1 = Complex64::from_polar(10f64.powf(15.0 / 20.0), 80f64.to_radians());
    let s2 = Complex64::from_polar(10f64.powf(14.0 / 20.0), 40f64.to_radians());
    let expected = 20.0 * ((s1 + s2) / 2.0).norm().log10();
    assert_relative_eq!(network.transmission_db_at(1.5e9).unwrap(), expected, epsilon = 1e-9);
    assert_relative_eq!(network.noise()[1].min_noise_figure_db, 1.1);
}

#[test]
fn test_version_two_file_with_declared_ports() {
    let dir = TempDir::new().unwrap();
    let contents = "\
[Version] 2.0
# GHz S DB R 50
[Number of Ports] 2
[Two-Port Data Order] 21_12
[Number of Frequencies] 2
[Network Data]
1.0  -30 0  -1.0 0  -1.0 0  -30 0
2.0  -30 0  -2.0 0  -2.0 0  -30 0
[End]
";
    let path = write_file(&dir, "cable_v2.s2p", contents);
    let network = Network::from_file(&path).unwrap();
    assert_relative_eq!(network.transmission_db_at(2e9).unwrap(), -2.0, epsilon = 1e-9);

    let wrong = write_file(&dir, "cable_v2.s3p", contents);
    assert!(matches!(
        Network::from_file(&wrong),
        Err(TouchstoneError::PortCountMismatch { declared: 2, expected: 3 })
    ));
}
