//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire data.
///
/// Every variant describes a single malformed frame or payload. None of them
/// say anything about the health of the connection that carried it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input contained no frame at all.
    #[error("empty frame")]
    Empty,

    /// Frame exceeds [`crate::MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Actual size in bytes
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Binary message was not valid UTF-8 text.
    #[error("frame is not valid UTF-8")]
    NonUtf8,

    /// Command line is not a known STOMP command.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Header section never terminated by a blank line.
    #[error("unterminated header section")]
    UnterminatedHeaders,

    /// Header line without a `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Header value used an escape sequence STOMP does not define.
    #[error("invalid escape sequence in header: {0:?}")]
    InvalidEscape(String),

    /// A header the command requires is absent.
    #[error("{command} frame missing required header {header:?}")]
    MissingHeader {
        /// Command of the offending frame
        command: &'static str,
        /// Name of the absent header
        header: &'static str,
    },

    /// `content-length` header did not parse or overran the input.
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),

    /// Body was not followed by the NUL terminator.
    #[error("missing NUL frame terminator")]
    MissingTerminator,

    /// Body did not parse as the expected JSON payload.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
