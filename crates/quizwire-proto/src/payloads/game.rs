//! Round lifecycle payloads: countdown, questions, validation, results.

use serde::{Deserialize, Serialize};

use super::room::PlayerInRoom;
use crate::errors::{ProtocolError, Result};

/// Pre-game countdown tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    /// Seconds remaining before the first question.
    pub countdown: u32,
    /// Optional human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Informational game message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    /// Message text.
    pub message: String,
}

/// Default time limit when the server omits one.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

/// A question broadcast opening a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomQuestion {
    /// Question id. Validation events reference it.
    pub question_id: String,
    /// Prompt text.
    pub question: String,
    /// Answer options.
    pub options: Vec<String>,
    /// 1-based round number.
    pub round_number: u32,
    /// Total rounds in the match.
    pub total_rounds: u32,
    /// Difficulty tag.
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Topic tag.
    #[serde(default)]
    pub topic: Option<String>,
    /// Seconds allowed to answer.
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
}

impl RoomQuestion {
    /// Reject questions that parse but cannot be played.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPayload` if there are no options, the time
    ///   limit is zero or the round number is zero
    pub fn validate(&self) -> Result<()> {
        if self.options.is_empty() {
            return Err(ProtocolError::InvalidPayload("question has no options".into()));
        }
        if self.time_limit == 0 {
            return Err(ProtocolError::InvalidPayload("question time limit is zero".into()));
        }
        if self.round_number == 0 {
            return Err(ProtocolError::InvalidPayload("round number is zero".into()));
        }
        Ok(())
    }
}

/// Server verdict on one player's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerValidation {
    /// Player the verdict belongs to.
    pub user_id: String,
    /// Question the answer was for.
    pub question_id: String,
    /// Whether the answer was correct.
    pub is_correct: bool,
    /// Player score after this answer.
    pub new_score: i64,
    /// The correct option.
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Optional server message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Scores at the end of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResults {
    /// Round that ended.
    pub round_number: u32,
    /// The correct option.
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Prompt text of the round.
    #[serde(default)]
    pub question: Option<String>,
    /// Player scores.
    pub players: Vec<PlayerInRoom>,
}

/// Final leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    /// Optional closing message.
    #[serde(default)]
    pub message: Option<String>,
    /// Final standings.
    pub leaderboard: Vec<PlayerInRoom>,
}

/// Answer published by the client to [`crate::topic::destination::ANSWER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    /// Room the answer belongs to.
    pub room_id: String,
    /// Answering player.
    pub user_id: String,
    /// Question being answered.
    pub question_id: String,
    /// Chosen option.
    pub selected_option: String,
    /// Whole seconds spent before answering.
    pub time_spent: u32,
}
