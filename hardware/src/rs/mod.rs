mod nrp;
mod status;

pub use nrp::{
    parse_power_field, NrpSensor, PollPolicy, SensorFunction, TerminalControl,
    MEASUREMENT_POLL_ATTEMPTS, MEASUREMENT_POLL_INTERVAL,
};
pub use status::OperationStatus;
