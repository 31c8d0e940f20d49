use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias for muxpipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a Redis Cluster.
///
/// The enum is `Clone` so that a single node failure can be recorded in
/// every deferred result it affects, and so a resolved result can be read
/// any number of times.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
    /// An IO error occurred (connection refused, reset, timed out...).
    #[error("IO error: {source}")]
    Io {
        /// The underlying IO error.
        source: Arc<io::Error>,
    },

    /// A reply could not be decoded or did not have the expected shape.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error.
        message: String,
    },

    /// The server returned an error for a specific command.
    #[error("server error: {message}")]
    Server {
        /// Error message from server.
        message: String,
    },

    /// Authentication failed.
    #[error("authentication failed")]
    Auth,

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of invalid argument.
        message: String,
    },

    /// Key moved to another node (permanent redirect).
    ///
    /// The slot has been migrated to a different node. The pipeline records
    /// this on the affected result and refreshes its slot map so that the
    /// next flush routes correctly.
    #[error("MOVED to slot {slot} at {address}")]
    Moved {
        /// The slot number (0-16383).
        slot: u16,
        /// The address of the node owning this slot (e.g., "127.0.0.1:7001").
        address: String,
    },

    /// Temporary redirect during slot migration.
    ///
    /// Retrying requires sending ASKING to the target node first; the
    /// pipeline never does this on its own.
    #[error("ASK to slot {slot} at {address}")]
    Ask {
        /// The slot number (0-16383).
        slot: u16,
        /// The address of the node temporarily handling this slot.
        address: String,
    },

    /// The server reported CLUSTERDOWN.
    #[error("CLUSTERDOWN cluster is down")]
    ClusterDown,

    /// Multi-key command with keys in different slots.
    ///
    /// All keys of one command must map to the same slot. Use hash tags
    /// `{...}` to force keys into the same slot.
    #[error("CROSSSLOT keys in multi-key operation map to different slots")]
    CrossSlot,

    /// No node in the current topology serves this slot.
    #[error("slot {slot} is not assigned to any node")]
    SlotUnassigned {
        /// The unassigned slot.
        slot: u16,
    },

    /// No node could be reached to discover the cluster topology.
    #[error("cluster unavailable: {message}")]
    ClusterUnavailable {
        /// Description of what was tried.
        message: String,
    },

    /// The API was used out of order, e.g. reading a result before flush.
    #[error("illegal state: {message}")]
    Usage {
        /// Description of the misuse.
        message: String,
    },
}

impl Error {
    /// Returns true for MOVED and ASK redirects.
    pub fn is_redirect(&self) -> bool {
        matches!(self, Error::Moved { .. } | Error::Ask { .. })
    }

    /// Returns true for client-side routing failures.
    pub fn is_routing(&self) -> bool {
        matches!(self, Error::CrossSlot | Error::SlotUnassigned { .. })
    }

    /// Returns true for connection-level failures.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Io { .. })
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io {
            source: Arc::new(source),
        }
    }
}
