//! Room roster payloads.

use serde::{Deserialize, Deserializer, Serialize};

/// One player's entry in a room roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInRoom {
    /// Roster entry id.
    pub id: String,
    /// Linked user id. Unique within a room.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Avatar reference, if the player has one.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Current score.
    #[serde(default)]
    pub score: i64,
}

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Players are gathering.
    #[default]
    NotStarted,
    /// A match is running.
    InProgress,
    /// The match has ended.
    Completed,
}

/// Whole-room snapshot as broadcast on the `quiz` facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room id used in topic names.
    pub id: String,
    /// Short shareable join code. Accepted as a JSON number or string.
    #[serde(deserialize_with = "code_from_number_or_string")]
    pub code: String,
    /// User id of the host.
    pub host_id: String,
    /// Room display name.
    #[serde(default)]
    pub name: String,
    /// Number of rounds in the match.
    pub rounds: u32,
    /// Player capacity.
    pub max_players: u32,
    /// Room status.
    #[serde(default)]
    pub status: RoomStatus,
    /// Player roster.
    #[serde(default)]
    pub players: Vec<PlayerInRoom>,
}

/// A player left the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    /// User id of the departing player.
    pub user_id: String,
}

fn code_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Number(u64),
        Text(String),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Number(n) => n.to_string(),
        Code::Text(s) => s,
    })
}
