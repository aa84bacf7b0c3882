//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the runtime from a specific socket, input
//! source and renderer. Each frontend implements it, while the generic
//! [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use crate::{SessionEvent, SessionSnapshot};

/// Something that happened on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text received.
    Text(String),
    /// The transport closed or failed.
    Closed {
        /// Description for logs.
        reason: String,
    },
}

/// Abstracts I/O operations for the runtime.
///
/// # Implementations
///
/// - **CLI**: stdin lines for input, tokio-tungstenite for the socket
/// - **Simulation**: in-memory broker with injected events
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next user event.
    ///
    /// Returns `None` when nothing is pending.
    fn poll_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<SessionEvent>, Self::Error>> + Send;

    /// Open the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be opened. The runtime
    /// reports it to the session as a transport failure.
    fn open_transport(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Write text to the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is closed.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Next transport event, or `None` if nothing is pending.
    fn recv_event(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Close the transport.
    fn close_transport(&mut self);

    /// Render the session.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails. This stops the runtime.
    fn render(&mut self, snapshot: &SessionSnapshot) -> Result<(), Self::Error>;

    /// Release resources before the runtime returns.
    fn stop(&mut self);
}
