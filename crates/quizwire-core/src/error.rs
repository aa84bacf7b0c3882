//! Error types for the connection layer.
//!
//! Transport failures (socket errors, missed heartbeats, slow connects) are
//! recovered by the reconnect policy. Only [`ConnectionError::RetriesExhausted`]
//! is terminal.

use std::time::Duration;

use quizwire_proto::Command;
use thiserror::Error;

use crate::connection::ConnectionStatus;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation not valid in the current status
    #[error("invalid state transition: cannot {operation} while {status:?}")]
    InvalidState {
        /// Status when the operation was attempted
        status: ConnectionStatus,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Received a frame the current status does not allow
    #[error("unexpected {command} frame while {status:?}")]
    UnexpectedFrame {
        /// Status when the frame arrived
        status: ConnectionStatus,
        /// Command of the offending frame
        command: Command,
    },

    /// Broker rejected the session with an ERROR frame
    #[error("broker error: {0}")]
    Rejected(String),

    /// CONNECTED did not arrive in time
    #[error("connect timeout after {elapsed:?}")]
    ConnectTimeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Broker went silent for longer than the negotiated heartbeat allows
    #[error("heartbeat timeout after {elapsed:?} of silence")]
    HeartbeatTimeout {
        /// Silence observed
        elapsed: Duration,
    },

    /// Protocol error from frame parsing/validation
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Reconnect cap reached. No further automatic attempts are made.
    #[error("gave up after {attempts} reconnect attempts")]
    RetriesExhausted {
        /// Reconnect attempts made before giving up
        attempts: u32,
    },
}

impl ConnectionError {
    /// Returns true if this error is recovered by the reconnect policy.
    ///
    /// Local misuse (invalid state, unexpected frames) and the terminal
    /// retries-exhausted error are not transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Rejected(_)
                | Self::ConnectTimeout { .. }
                | Self::HeartbeatTimeout { .. }
                | Self::Transport(_)
        )
    }
}

impl From<quizwire_proto::ProtocolError> for ConnectionError {
    fn from(err: quizwire_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
