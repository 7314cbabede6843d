mod device;
mod link;
mod resource;
mod response;
mod session;
mod status;
#[cfg(feature = "visa")]
mod visa;

pub use device::{ScpiDevice, ScpiError, ScpiResult, DEFAULT_TIMEOUT};
pub use resource::{Endpoint, VisaResource, DEFAULT_SCPI_PORT};
pub use response::{parse_error_entry, parse_int, ErrorQueueEntry};
pub use session::{OpenOptions, ScpiSession};
pub use status::StatusByte;
