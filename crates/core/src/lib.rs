#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and logic for the telemetry station monitor.

pub mod channel;
pub mod config;
pub mod error;
pub mod interval;
pub mod profile;
pub mod record;
pub mod snapshot;

mod util;

pub use error::{ConfigError, IntervalError};
pub use interval::SampleInterval;
pub use profile::{DeviceProfile, PollPlan};
pub use snapshot::Snapshot;
pub use util::round_to;
