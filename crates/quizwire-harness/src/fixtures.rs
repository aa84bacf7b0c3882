//! Builders for the server events tests publish.

use quizwire_proto::{
    ServerEvent,
    payloads::{
        AnswerValidation, ChatBroadcast, Countdown, GameEnd, PlayerInRoom, PlayerResult,
        RoomQuestion, RoomSnapshot, RoomStatus, RoundResults, ServerError,
    },
};

/// A roster entry whose entry id is derived from the user id.
pub fn player(user_id: &str, name: &str, score: i64) -> PlayerInRoom {
    PlayerInRoom {
        id: format!("p-{user_id}"),
        user_id: user_id.to_string(),
        name: name.to_string(),
        avatar: None,
        score,
    }
}

/// A room snapshot hosted by `host_id` with `players`.
pub fn room(room_id: &str, code: &str, host_id: &str, players: Vec<PlayerInRoom>) -> ServerEvent {
    ServerEvent::Room(RoomSnapshot {
        id: room_id.to_string(),
        code: code.to_string(),
        host_id: host_id.to_string(),
        name: format!("Room {code}"),
        rounds: 3,
        max_players: 8,
        status: RoomStatus::NotStarted,
        players,
    })
}

/// A countdown tick.
pub fn countdown(seconds: u32) -> ServerEvent {
    ServerEvent::Countdown(Countdown { countdown: seconds, message: None })
}

/// Question `round` of `total` with options "A" to "D".
pub fn question(round: u32, total: u32, time_limit: u32) -> ServerEvent {
    ServerEvent::Question(RoomQuestion {
        question_id: format!("q{round}"),
        question: format!("Question {round}?"),
        options: ["A", "B", "C", "D"].map(String::from).to_vec(),
        round_number: round,
        total_rounds: total,
        difficulty: None,
        topic: None,
        time_limit,
    })
}

/// Verdict on `user_id`'s answer to question `round`.
pub fn validation(user_id: &str, round: u32, is_correct: bool, new_score: i64) -> ServerEvent {
    ServerEvent::Validation(AnswerValidation {
        user_id: user_id.to_string(),
        question_id: format!("q{round}"),
        is_correct,
        new_score,
        correct_answer: Some("A".to_string()),
        message: None,
    })
}

/// Standings after `round`.
pub fn round_results(round: u32, players: Vec<PlayerInRoom>) -> ServerEvent {
    ServerEvent::RoundResults(RoundResults {
        round_number: round,
        correct_answer: Some("A".to_string()),
        question: None,
        players,
    })
}

/// Final leaderboard.
pub fn game_end(leaderboard: Vec<PlayerInRoom>) -> ServerEvent {
    ServerEvent::GameEnd(GameEnd { message: Some("Game over".to_string()), leaderboard })
}

/// Chat broadcast. `temp_id` echoes a client correlation id.
pub fn chat(id: &str, user_id: &str, text: &str, temp_id: Option<&str>) -> ServerEvent {
    ServerEvent::Chat(ChatBroadcast {
        id: Some(id.to_string()),
        user_id: user_id.to_string(),
        msg: text.to_string(),
        temp_id: temp_id.map(str::to_string),
        timestamp: None,
        user_name: None,
    })
}

/// Error addressed to one player. `temp_id` names a rejected chat message.
pub fn error(message: &str, temp_id: Option<&str>) -> ServerEvent {
    ServerEvent::Error(ServerError {
        message: message.to_string(),
        temp_id: temp_id.map(str::to_string),
    })
}

/// A ranked result entry.
pub fn result(user_id: &str, score: i64) -> PlayerResult {
    PlayerResult {
        id: user_id.to_string(),
        name: user_id.to_uppercase(),
        score,
        topic: None,
        accuracy: 0.5,
        streak: 1,
        avatar: None,
    }
}
