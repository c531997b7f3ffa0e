use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or resolving the station configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::config::TsmConfig`].
    #[error("parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// No config file was given and none was found on the search path.
    #[error("no config file found (searched {searched:?})")]
    NotFound {
        /// Candidate paths that were tried.
        searched: Vec<PathBuf>,
    },

    /// The config parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),

    /// None of the group OIDs answered with a model name.
    #[error("model not found in model group OID list {oids:?}")]
    ModelNotFound {
        /// Group OIDs that were queried.
        oids: Vec<String>,
    },

    /// The device reported a model that no group lists.
    #[error("model {0:?} is not listed in any model group")]
    UnknownModel(String),

    /// The device reported a model group that the config does not describe.
    #[error("model group {0:?} not found in config")]
    UnknownModelGroup(String),
}

/// Errors raised while validating a requested sample interval.
#[derive(Debug, Error, PartialEq)]
pub enum IntervalError {
    /// Not a number.
    #[error("invalid sample interval {0:?}: not a number")]
    NotANumber(String),

    /// Outside the supported range.
    #[error("invalid sample interval {value} must be between {min} and {max} seconds")]
    OutOfRange {
        /// Requested value in seconds.
        value: f64,
        /// Smallest accepted interval in seconds.
        min: u64,
        /// Largest accepted interval in seconds.
        max: u64,
    },
}
