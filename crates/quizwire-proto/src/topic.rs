//! Broker topic and destination naming.
//!
//! Room-scoped topics live under `/topic/room/{room_id}/...`, per-player
//! topics under `/topic/player/{user_id}/...`. Client publishes go to
//! `/app/...` destinations.

use std::fmt;

/// Facets of a room that the server broadcasts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomFacet {
    /// Room roster and status updates.
    Quiz,
    /// Chat broadcasts.
    Chat,
    /// Informational game messages ("Game started", ...).
    GameInfo,
    /// Pre-game countdown ticks.
    GameCountdown,
    /// New round questions.
    GameQuestion,
    /// Per-round results.
    GameResults,
    /// Final leaderboard.
    GameEnd,
}

impl RoomFacet {
    /// Every room facet, in subscription order.
    pub const ALL: [Self; 7] = [
        Self::Quiz,
        Self::Chat,
        Self::GameInfo,
        Self::GameCountdown,
        Self::GameQuestion,
        Self::GameResults,
        Self::GameEnd,
    ];

    /// Path suffix after `/topic/room/{id}/`.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Chat => "chat",
            Self::GameInfo => "game/info",
            Self::GameCountdown => "game/countdown",
            Self::GameQuestion => "game/question",
            Self::GameResults => "game/results",
            Self::GameEnd => "game/end",
        }
    }
}

/// Facets addressed to a single player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerFacet {
    /// Answer validation for this player.
    Answer,
    /// Errors for this player (rejected chat messages, ...).
    Error,
}

impl PlayerFacet {
    /// Every player facet.
    pub const ALL: [Self; 2] = [Self::Answer, Self::Error];

    /// Path suffix after `/topic/player/{id}/`.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Answer => "game/answer",
            Self::Error => "error",
        }
    }
}

/// A topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicAddress {
    /// `/topic/room/{room_id}/{facet}`
    Room {
        /// Room identifier.
        room_id: String,
        /// Facet within the room.
        facet: RoomFacet,
    },
    /// `/topic/player/{user_id}/{facet}`
    Player {
        /// Player identifier.
        user_id: String,
        /// Facet addressed to the player.
        facet: PlayerFacet,
    },
}

impl TopicAddress {
    /// Room topic address.
    pub fn room(room_id: impl Into<String>, facet: RoomFacet) -> Self {
        Self::Room { room_id: room_id.into(), facet }
    }

    /// Player topic address.
    pub fn player(user_id: impl Into<String>, facet: PlayerFacet) -> Self {
        Self::Player { user_id: user_id.into(), facet }
    }
}

impl fmt::Display for TopicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room { room_id, facet } => write!(f, "/topic/room/{room_id}/{}", facet.suffix()),
            Self::Player { user_id, facet } => {
                write!(f, "/topic/player/{user_id}/{}", facet.suffix())
            },
        }
    }
}

/// Topic string for a room facet.
pub fn room_topic(room_id: &str, facet: RoomFacet) -> String {
    TopicAddress::room(room_id, facet).to_string()
}

/// Topic string for a player facet.
pub fn player_topic(user_id: &str, facet: PlayerFacet) -> String {
    TopicAddress::player(user_id, facet).to_string()
}

/// Client publish destinations.
pub mod destination {
    /// Answer submissions.
    pub const ANSWER: &str = "/app/game/answer";

    /// Host request to start the game in a room.
    pub fn start_game(room_id: &str, host_id: &str) -> String {
        format!("/app/game/start/{room_id}/{host_id}")
    }

    /// Chat publishes for a room.
    pub fn chat(room_id: &str) -> String {
        format!("/app/chat/{room_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_topics_render() {
        assert_eq!(room_topic("7", RoomFacet::Chat), "/topic/room/7/chat");
        assert_eq!(room_topic("7", RoomFacet::GameQuestion), "/topic/room/7/game/question");
    }

    #[test]
    fn player_topics_render() {
        assert_eq!(player_topic("u1", PlayerFacet::Answer), "/topic/player/u1/game/answer");
        assert_eq!(player_topic("u1", PlayerFacet::Error), "/topic/player/u1/error");
    }

    #[test]
    fn destinations() {
        assert_eq!(destination::start_game("r1", "h1"), "/app/game/start/r1/h1");
        assert_eq!(destination::chat("r1"), "/app/chat/r1");
    }
}
