//! JSON bodies carried in MESSAGE and SEND frames.
//!
//! Server broadcasts are wrapped in a tagged envelope:
//!
//! ```json
//! {"kind": "question", "payload": {"questionId": "q1", ...}}
//! ```
//!
//! An unknown `kind`, or a payload missing a required field, fails to parse.
//! Client publishes ([`ChatSend`], [`AnswerSubmission`]) are sent bare.

mod chat;
mod game;
mod results;
mod room;

use serde::{Deserialize, Serialize};

pub use chat::{ChatBroadcast, ChatSend, ServerError};
pub use game::{
    AnswerSubmission, AnswerValidation, Countdown, DEFAULT_TIME_LIMIT_SECS, GameEnd, GameInfo,
    RoomQuestion, RoundResults,
};
pub use results::PlayerResult;
pub use room::{PlayerInRoom, PlayerLeft, RoomSnapshot, RoomStatus};

use crate::errors::Result;

/// Every event the server pushes to a subscribed client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Whole room snapshot.
    Room(RoomSnapshot),
    /// A player joined.
    PlayerJoined(PlayerInRoom),
    /// A player left.
    PlayerLeft(PlayerLeft),
    /// Pre-game countdown tick.
    Countdown(Countdown),
    /// Informational message.
    Info(GameInfo),
    /// A new round's question.
    Question(RoomQuestion),
    /// Verdict on one player's answer.
    Validation(AnswerValidation),
    /// Scores at the end of a round.
    RoundResults(RoundResults),
    /// Final leaderboard.
    GameEnd(GameEnd),
    /// Chat broadcast.
    Chat(ChatBroadcast),
    /// Error addressed to this player.
    Error(ServerError),
}

/// Discriminant of a [`ServerEvent`], for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`ServerEvent::Room`]
    Room,
    /// [`ServerEvent::PlayerJoined`]
    PlayerJoined,
    /// [`ServerEvent::PlayerLeft`]
    PlayerLeft,
    /// [`ServerEvent::Countdown`]
    Countdown,
    /// [`ServerEvent::Info`]
    Info,
    /// [`ServerEvent::Question`]
    Question,
    /// [`ServerEvent::Validation`]
    Validation,
    /// [`ServerEvent::RoundResults`]
    RoundResults,
    /// [`ServerEvent::GameEnd`]
    GameEnd,
    /// [`ServerEvent::Chat`]
    Chat,
    /// [`ServerEvent::Error`]
    Error,
}

impl ServerEvent {
    /// Parse an envelope from a frame body.
    ///
    /// Question payloads are additionally checked with
    /// [`RoomQuestion::validate`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPayload` if the body is not a known envelope
    pub fn from_json(body: &str) -> Result<Self> {
        let event: Self = serde_json::from_str(body)?;
        if let Self::Question(question) = &event {
            question.validate()?;
        }
        Ok(event)
    }

    /// Serialize into an envelope.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPayload` if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Room(_) => EventKind::Room,
            Self::PlayerJoined(_) => EventKind::PlayerJoined,
            Self::PlayerLeft(_) => EventKind::PlayerLeft,
            Self::Countdown(_) => EventKind::Countdown,
            Self::Info(_) => EventKind::Info,
            Self::Question(_) => EventKind::Question,
            Self::Validation(_) => EventKind::Validation,
            Self::RoundResults(_) => EventKind::RoundResults,
            Self::GameEnd(_) => EventKind::GameEnd,
            Self::Chat(_) => EventKind::Chat,
            Self::Error(_) => EventKind::Error,
        }
    }
}
