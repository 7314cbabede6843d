//! Tests against a real NRP sensor.
//!
//! Run with `NRP_RESOURCE=TCPIP0::<host>::5025::SOCKET cargo test -p hardware --features hardware-tests`.

#![cfg(feature = "hardware-tests")]

use std::time::Duration;

use hardware::rs::{NrpSensor, PollPolicy, SensorFunction, TerminalControl};
use hardware::scpi::{OpenOptions, ScpiDevice};

fn open_sensor() -> NrpSensor<ScpiDevice> {
    let resource = std::env::var("NRP_RESOURCE").expect("NRP_RESOURCE must be set");
    let mut device = ScpiDevice::open(&resource, OpenOptions::id_query_only()).unwrap();
    device.set_timeout(Duration::from_secs(3));
    NrpSensor::new(device)
}

#[test]
fn test_identification() {
    let mut sensor = open_sensor();
    let idn = sensor.idn().unwrap();
    assert!(idn.contains("NRP"), "unexpected identification {idn}");
    sensor.session_mut().close().unwrap();
}

#[test]
fn test_single_shot_measurement() {
    let mut sensor = open_sensor();

    sensor.reset().unwrap();
    sensor.set_continuous(false).unwrap();
    sensor.select_function(SensorFunction::PowerAverage).unwrap();
    sensor.set_frequency(1e9).unwrap();
    sensor.set_auto_averaging(true).unwrap();
    sensor.set_averaging_enabled(true).unwrap();
    sensor.set_terminal_control(TerminalControl::Repeat).unwrap();
    sensor.set_aperture(0.01).unwrap();
    sensor.initiate().unwrap();

    let polls = sensor
        .wait_measurement_complete(PollPolicy::default())
        .unwrap();
    assert!(polls >= 1);

    sensor.set_ascii_format().unwrap();
    let watts = sensor.fetch_power_watts().unwrap();
    assert!(watts.is_finite());

    let mut device = sensor.into_session();
    assert!(device.read_error_queue().unwrap().is_empty());
    device.close().unwrap();
}
