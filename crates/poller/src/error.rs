use thiserror::Error;
use tsm_core::{ConfigError, IntervalError};

/// Failures of the device protocol client.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A query or close was attempted without a connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called twice.
    #[error("already connected")]
    AlreadyConnected,

    /// The transport could not be set up.
    #[error("connect {target}: {source}")]
    Connect {
        /// Address that was dialled.
        target: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An identifier is not a dotted numeric OID.
    #[error("invalid identifier {0:?}")]
    BadIdentifier(String),

    /// The device did not answer or answered with an error.
    #[error("query failed: {0}")]
    Query(String),
}

/// Errors that end a `poll` or `status` command.
#[derive(Debug, Error)]
pub enum PollError {
    /// Bad or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bad sample interval.
    #[error(transparent)]
    Interval(#[from] IntervalError),

    /// The device did not name a configured model.
    #[error("could not identify controller: {0}")]
    Identification(#[source] ConfigError),

    /// The device session could not be opened.
    #[error("could not connect to device: {0}")]
    Connect(#[source] SessionError),

    /// A one-shot query failed.
    #[error("device query failed: {0}")]
    Query(#[source] SessionError),

    /// The background sampler refused to start.
    #[error("could not start internal polling loop: {0}")]
    SamplerStart(String),

    /// The background sampler task panicked or was aborted.
    #[error("internal polling loop failed: {0}")]
    Sampler(#[from] tokio::task::JoinError),

    /// Writing a record to the output sink failed.
    #[error("write record: {0}")]
    Sink(#[from] std::io::Error),
}
