//! Chat and per-player error payloads.

use serde::{Deserialize, Serialize};

/// Chat message published by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSend {
    /// Author.
    pub user_id: String,
    /// Message text.
    pub msg: String,
    /// Client correlation id, echoed back by the server.
    pub temp_id: String,
}

/// Chat message broadcast by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcast {
    /// Server-assigned id.
    #[serde(default)]
    pub id: Option<String>,
    /// Author.
    pub user_id: String,
    /// Message text.
    pub msg: String,
    /// Correlation id of the originating send, if the author supplied one.
    #[serde(default)]
    pub temp_id: Option<String>,
    /// Server timestamp in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Author display name as known to the server.
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Error addressed to a single player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerError {
    /// Error text.
    pub message: String,
    /// Correlation id of the rejected send, if any.
    #[serde(default)]
    pub temp_id: Option<String>,
}
