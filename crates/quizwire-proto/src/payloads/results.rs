//! Finished-match results returned by the results endpoint.

use serde::{Deserialize, Serialize};

/// One ranked entry of a finished match. The endpoint returns them sorted by
/// rank, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Final score.
    pub score: i64,
    /// Quiz topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Fraction of correct answers, 0.0 to 1.0.
    #[serde(default)]
    pub accuracy: f64,
    /// Longest streak of correct answers.
    #[serde(default)]
    pub streak: u32,
    /// Avatar reference.
    #[serde(default)]
    pub avatar: Option<String>,
}
