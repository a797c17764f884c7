//! Error types
//!
//! Every fallible operation in the crate returns [`Result`]. Per-request and
//! per-session failures are contained by their callers; only [`Error::EngineDied`]
//! is fatal to the process.

use std::time::Duration;

use crate::engine::{EngineError, MediaKind};
use crate::packaging::PackagingState;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No leasable port left in the configured range
    #[error("no ports available in range {min}-{max}")]
    ResourceExhausted { min: u16, max: u16 },

    /// The media engine rejected a call
    #[error("media engine error: {0}")]
    Engine(#[from] EngineError),

    /// A prerequisite transport or producer does not exist yet
    #[error("{0} not ready")]
    TransportNotReady(&'static str),

    /// A referenced peer, producer, consumer or transport is unknown
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// The encoder process could not be started
    #[error("failed to spawn encoder process: {0}")]
    ProcessSpawnFailed(#[source] std::io::Error),

    /// A process did not exit within its grace period
    #[error("process did not exit within {0:?}")]
    Timeout(Duration),

    /// The peer has started closing and no longer accepts resources
    #[error("peer {0} is closing")]
    PeerClosed(String),

    /// The peer already has a producer of this kind
    #[error("peer already produces {0}")]
    DuplicateProducer(MediaKind),

    /// Illegal packaging state transition
    #[error("invalid packaging transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: PackagingState,
        to: PackagingState,
    },

    /// Packaging startup was abandoned because the session is being torn down
    #[error("packaging session cancelled")]
    Cancelled,

    /// The router cannot deliver this producer with the given capabilities
    #[error("cannot consume producer {0}")]
    CannotConsume(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem or socket error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The media engine itself terminated
    #[error("media engine terminated")]
    EngineDied,
}

impl Error {
    /// Shorthand for [`Error::NotFound`]
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Whether the process must stop because of this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::EngineDied)
    }
}
