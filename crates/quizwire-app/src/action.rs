//! Session side-effects.
//!
//! [`SessionAction`]s are instructions produced by the [`crate::Session`]
//! for the runtime to execute against the driver.

/// Actions produced by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open the transport, then report `TransportOpened` or
    /// `TransportFailed`.
    OpenTransport,

    /// Close the transport.
    CloseTransport,

    /// Write this text to the transport.
    Send(String),

    /// Fetch final results for a finished room, then report
    /// `ResultsFetched`.
    FetchResults {
        /// Room code.
        room_code: String,
    },

    /// Something visible changed.
    Render,

    /// Stop the runtime.
    Quit,
}
