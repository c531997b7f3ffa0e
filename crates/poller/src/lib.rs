#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Telemetry station monitor: polls one device and emits time-aligned records.

pub mod cache;
pub mod cadence;
pub mod clock;
pub mod error;
pub mod identify;
pub mod poll;
pub mod sampler;
pub mod session;
pub mod shutdown;
pub mod snmp;
pub mod status;

pub use cache::ScanCache;
pub use cadence::{CadenceState, CadenceStats, Drift, Outcome};
pub use clock::{Clock, SystemClock, TokioClock};
pub use error::{PollError, SessionError};
pub use session::{DeviceSession, SessionTarget};
