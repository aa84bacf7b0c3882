//! Multiplexer inputs and outputs.

use std::time::Duration;

use quizwire_core::{ConnectionError, ConnectionStatus};
use quizwire_proto::{Frame, ProtocolError, ServerEvent};

/// A MESSAGE frame routed to a topic.
///
/// Handlers receive this by reference. It carries everything a handler
/// needs, so handlers never reach back into shared state to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was delivered on.
    pub topic: String,
    /// Broker message id, if the broker set one.
    pub message_id: Option<String>,
    /// Raw JSON body.
    pub body: String,
}

impl InboundMessage {
    /// Parse the body as a tagged [`ServerEvent`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPayload` if the body is not a known envelope
    pub fn event(&self) -> Result<ServerEvent, ProtocolError> {
        ServerEvent::from_json(&self.body)
    }
}

/// Actions the multiplexer produces for the transport driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxAction {
    /// Open a new WebSocket, then call `transport_opened` or
    /// `transport_failed`.
    OpenTransport,

    /// Close the WebSocket.
    CloseTransport,

    /// Write this frame.
    Transmit(Frame),

    /// Write an end-of-line heartbeat.
    Heartbeat,

    /// Connection status changed. Emitted after any resubscription frames.
    Status(ConnectionStatus),

    /// A reconnect will be attempted after `delay`.
    ReconnectScheduled {
        /// 1-based attempt number
        attempt: u32,
        /// Fixed delay before the attempt
        delay: Duration,
    },

    /// Reconnect attempts exhausted. Nothing further happens until
    /// `connect` is called again.
    Fatal(ConnectionError),
}
