use bitflags::bitflags;

bitflags! {
    /// NRP operation condition register (`STAT:OPER:COND?`).
    ///
    /// The condition register reflects the live sensor state; bits clear on
    /// their own once the activity finishes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperationStatus: u16 {
        /// Zeroing or self-calibration in progress
        const CALIBRATING = 1 << 0;
        /// Sensor settling after a configuration change
        const SETTLING = 1 << 1;
        /// Automatic range switching in progress
        const RANGING = 1 << 2;
        /// A measurement is being acquired
        const MEASURING = 1 << 4;
        /// Armed and waiting for a trigger event
        const WAITING_FOR_TRIGGER = 1 << 5;
    }
}

impl OperationStatus {
    /// True while an acquisition started by `INIT:IMM` is still running.
    pub fn is_measuring(self) -> bool {
        self.contains(OperationStatus::MEASURING)
    }
}
