//! IEEE 488.2 status byte.

use bitflags::bitflags;

bitflags! {
    /// Status byte register as returned by `*STB?`.
    ///
    /// Only the bits defined by IEEE 488.2 and SCPI are named; bits 0 and 1
    /// are device specific and retained as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusByte: u8 {
        /// Error/event queue is not empty
        const ERROR_QUEUE = 1 << 2;
        /// Questionable status summary
        const QUESTIONABLE = 1 << 3;
        /// Message available in the output queue
        const MESSAGE_AVAILABLE = 1 << 4;
        /// Standard event status summary
        const EVENT_STATUS = 1 << 5;
        /// Request service / master summary status
        const SERVICE_REQUEST = 1 << 6;
        /// Operation status summary
        const OPERATION = 1 << 7;
    }
}

impl StatusByte {
    /// True if the instrument has queued errors that `SYST:ERR?` would report.
    pub fn has_errors(self) -> bool {
        self.contains(StatusByte::ERROR_QUEUE)
    }
}
