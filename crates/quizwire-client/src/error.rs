//! Client error types.

use std::time::Duration;

use quizwire_core::ConnectionError;
use quizwire_proto::ProtocolError;
use thiserror::Error;

/// Errors surfaced by client components.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection state machine error
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Wire or payload error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error returned by a subscription handler.
///
/// Logged by the multiplexer and never propagated further: one failing
/// handler does not stop delivery to the others.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Message body did not parse
    #[error("bad message body: {0}")]
    Protocol(#[from] ProtocolError),

    /// Consumer is gone (its inbox was dropped)
    #[error("consumer closed")]
    Closed,

    /// Anything else the handler wants logged
    #[error("{0}")]
    Other(String),
}

/// Errors from fetching room results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No response within the configured timeout
    #[error("fetch timed out after {after:?}")]
    Timeout {
        /// Timeout that elapsed
        after: Duration,
    },

    /// A fetch for this room code is already outstanding
    #[error("fetch already in progress for room {0}")]
    InProgress(String),

    /// Server answered with a non-success status
    #[error("server returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Request could not be sent or the response not read
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body was not the expected JSON
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}
