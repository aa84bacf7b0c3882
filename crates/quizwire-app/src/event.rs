//! Session input events.
//!
//! Events come from three places:
//! - The user (enter a room, answer, chat) and the periodic tick
//! - The transport (opened, failed, text received)
//! - The runtime itself (a result fetch completed)

use quizwire_client::{FetchError, RoomResults};

/// Events processed by the [`crate::Session`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Periodic tick. Drives heart-beats, reconnects, chat timeouts and
    /// round timers.
    Tick,

    /// Start a broker session.
    Connect {
        /// Bearer token.
        credential: String,
    },

    /// Leave the room, end the broker session and forget the credential.
    Disconnect,

    /// The transport requested by `OpenTransport` is up.
    TransportOpened,

    /// The transport failed or closed.
    TransportFailed {
        /// Description for logs.
        reason: String,
    },

    /// Text received from the transport.
    Wire(String),

    /// Subscribe to a room's topics and start following its match.
    EnterRoom {
        /// Room id.
        room_id: String,
    },

    /// Stop following the current room.
    LeaveRoom,

    /// Ask the server to start the match (host only).
    StartGame,

    /// Answer the current question.
    SubmitAnswer {
        /// Chosen option text.
        option: String,
    },

    /// Send a chat message to the current room.
    SendChat {
        /// Message text.
        text: String,
    },

    /// The chat view was opened or closed.
    ChatViewed(bool),

    /// A result fetch requested with `FetchResults` finished.
    ///
    /// Ignored unless `room_code` is still the followed room's code.
    ResultsFetched {
        /// Room code the fetch was made for.
        room_code: String,
        /// Outcome of the fetch.
        result: Result<RoomResults, FetchError>,
    },

    /// Leave everything and stop.
    Quit,
}
