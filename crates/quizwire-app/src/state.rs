//! Read-only session state for rendering and invariant checks.

use quizwire_client::{ChatEntry, ConnectionStatus, Room, RoomResults, RoundSnapshot};

/// One subscribed topic as seen by the multiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicState {
    /// Topic address.
    pub topic: String,
    /// Local handlers registered for it.
    pub handlers: usize,
    /// Whether a network subscription is live.
    pub network: bool,
}

/// Everything a frontend shows, captured at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// The local user.
    pub user_id: String,
    /// Broker connection status.
    pub status: ConnectionStatus,
    /// Reconnect attempts exhausted.
    pub failed: bool,
    /// Room being followed.
    pub room_id: Option<String>,
    /// Room and roster, once the server sent them.
    pub room: Option<Room>,
    /// Round state of the followed room.
    pub round: Option<RoundSnapshot>,
    /// Number of round timers running.
    pub live_timers: usize,
    /// Chat messages, oldest first.
    pub messages: Vec<ChatEntry>,
    /// Unread chat messages from others.
    pub unread: usize,
    /// Subscribed topics.
    pub topics: Vec<TopicState>,
    /// Final results of the followed room, once fetched.
    pub results: Option<RoomResults>,
    /// Last error worth showing to the user.
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    /// Topic state for `topic`.
    pub fn topic(&self, topic: &str) -> Option<&TopicState> {
        self.topics.iter().find(|t| t.topic == topic)
    }
}
