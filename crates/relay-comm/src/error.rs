//! Error and status types for the transport layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Outcome of endpoint setup.
///
/// Starts as `Pending` and moves to exactly one other value, exactly once.
/// Every value except `Pending` and `Success` is a setup failure that is
/// fatal to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
pub enum ConnectResult {
    #[default]
    #[error("connection pending")]
    Pending,
    #[error("connected")]
    Success,
    #[error("address could not be resolved")]
    AddrInfoError,
    #[error("no resolved address accepted the connection")]
    FailedToConnect,
    #[error("could not bind the listening port")]
    FailedToBind,
    #[error("could not listen on the bound socket")]
    ListenFailure,
    #[error("could not switch the listening socket to non-blocking mode")]
    BlockingFailure,
    #[error("could not create a socket or its worker threads")]
    CreateSocketFailure,
}

impl ConnectResult {
    /// True for every value except `Pending`.
    pub fn is_terminal(self) -> bool {
        self != ConnectResult::Pending
    }
}

/// Fatal (or, for `SendTimeout`, transient) failure of one connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer closed its end; a read returned zero bytes.
    #[error("peer disconnected")]
    PeerDisconnected,
    #[error("receive failed: {0:?}")]
    ReceivePoll(io::ErrorKind),
    #[error("send failed: {0:?}")]
    SendPoll(io::ErrorKind),
    /// Part of a frame went out and the rest could not; the stream is no
    /// longer aligned to frame boundaries.
    #[error("short write: sent {sent} of {expected} bytes")]
    SendCount { sent: usize, expected: usize },
    /// The socket did not become writable within the poll timeout.
    #[error("send timed out")]
    SendTimeout,
    #[error("not connected")]
    NotConnected,
    /// The payload does not fit the 32-bit length field of a frame header.
    #[error("payload of {0} bytes is too large to frame")]
    PayloadTooLarge(usize),
}

impl TransportError {
    /// Only a send timeout with nothing written may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::SendTimeout)
    }
}

/// Misuse and side-channel errors that do not affect any connection.
#[derive(Debug, Error)]
pub enum CommError {
    #[error("endpoint already started")]
    AlreadyStarted,
    #[error("failed to write snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
