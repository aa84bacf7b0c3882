//! Quiz round state machine.
//!
//! Drives one room through its match lifecycle from server events, user
//! answers and whole-second timer ticks. Pure: returns [`RoundAction`]s for
//! the caller to execute (start/cancel timers, publish an answer, update the
//! room roster).
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐ countdown hits 0 ┌─────────┐  question  ┌──────────┐
//! │ Initial │─────────────────>│ Loading │───────────>│ Question │<──┐
//! └─────────┘                  └─────────┘            └──────────┘   │
//!      │ question                                answer │ │ timeout   │
//!      └───────────────────────────────> Question       ↓ ↓           │
//!                                                    ┌────────┐       │
//!                                                    │ Result │───────┘
//!                                                    └────────┘ question
//!
//!   any ──(game end)──> FinalResults
//! ```
//!
//! # Invariants
//!
//! - At most one timer is live. Each (re)start gets a fresh [`TimerToken`];
//!   ticks carrying any other token are ignored, so a timer from a
//!   superseded round can never drive a transition.
//! - A question whose round number is not newer than the current one is a
//!   redelivery and changes nothing.
//! - Validations for a question other than the current one are discarded.

use std::time::Duration;

use quizwire_proto::{
    ServerEvent,
    payloads::{
        AnswerSubmission, AnswerValidation, Countdown, GameEnd, PlayerInRoom, RoomQuestion,
        RoomStatus, RoundResults,
    },
};

use crate::room_store::{RoomPatch, RoomUpdate};

/// Period of every round timer.
pub const TICK: Duration = Duration::from_secs(1);

/// Lifecycle states of a match, as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundState {
    /// Pre-game countdown.
    Initial,
    /// Countdown over, waiting for the first question.
    Loading,
    /// Accepting one answer.
    Question,
    /// Answer locked in (or time ran out), waiting for the next question.
    Result,
    /// Match over. Terminal.
    FinalResults,
}

/// Identifies one started timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Raw value, for logging and timer tables.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Work for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAction {
    /// Start a repeating timer. Each period, call
    /// [`RoundMachine::timer_fired`] with `token`.
    StartTimer {
        /// Token to pass back
        token: TimerToken,
        /// Tick period
        period: Duration,
    },
    /// Stop the timer with this token.
    CancelTimer(TimerToken),
    /// Publish this answer. Report a synchronous send failure with
    /// [`RoundMachine::answer_send_failed`].
    SubmitAnswer(AnswerSubmission),
    /// Apply this roster change to the room store.
    UpdateRoom(RoomUpdate),
}

/// Read-only view of the round for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSnapshot {
    /// Current state.
    pub state: RoundState,
    /// Current question, if one has arrived.
    pub current_question: Option<RoomQuestion>,
    /// Whole seconds left to answer.
    pub time_left: u32,
    /// Seconds left in the pre-game countdown.
    pub countdown: Option<u32>,
    /// Option the user picked this round.
    pub selected_answer: Option<String>,
    /// Server verdict on the user's answer.
    pub is_correct: Option<bool>,
    /// Correct option, once known.
    pub correct_answer: Option<String>,
    /// User's score after the last validation.
    pub score: Option<i64>,
    /// Seconds the user took to answer.
    pub time_spent: Option<u32>,
    /// Standings at the end of the last round, best first.
    pub round_results: Option<RoundResults>,
    /// Final standings, best first.
    pub leaderboard: Vec<PlayerInRoom>,
    /// Latest informational message from the server.
    pub status_message: Option<String>,
}

/// The round state machine for one room and one user.
#[derive(Debug)]
pub struct RoundMachine {
    room_id: String,
    user_id: String,
    state: RoundState,
    question: Option<RoomQuestion>,
    time_left: u32,
    countdown: Option<u32>,
    selected_answer: Option<String>,
    is_correct: Option<bool>,
    correct_answer: Option<String>,
    score: Option<i64>,
    time_spent: Option<u32>,
    round_results: Option<RoundResults>,
    leaderboard: Vec<PlayerInRoom>,
    status_message: Option<String>,
    timer: Option<TimerToken>,
    next_token: u64,
}

impl RoundMachine {
    /// New machine in [`RoundState::Initial`].
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            state: RoundState::Initial,
            question: None,
            time_left: 0,
            countdown: None,
            selected_answer: None,
            is_correct: None,
            correct_answer: None,
            score: None,
            time_spent: None,
            round_results: None,
            leaderboard: Vec::new(),
            status_message: None,
            timer: None,
            next_token: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Token of the live timer, if any.
    pub fn active_timer(&self) -> Option<TimerToken> {
        self.timer
    }

    /// Read-only snapshot.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            state: self.state,
            current_question: self.question.clone(),
            time_left: self.time_left,
            countdown: self.countdown,
            selected_answer: self.selected_answer.clone(),
            is_correct: self.is_correct,
            correct_answer: self.correct_answer.clone(),
            score: self.score,
            time_spent: self.time_spent,
            round_results: self.round_results.clone(),
            leaderboard: self.leaderboard.clone(),
            status_message: self.status_message.clone(),
        }
    }

    /// Feed a raw message body. Bodies that fail to parse are logged and
    /// dropped without touching state.
    pub fn handle_body(&mut self, body: &str) -> Vec<RoundAction> {
        match ServerEvent::from_json(body) {
            Ok(event) => self.handle_event(event),
            Err(error) => {
                tracing::warn!(%error, "dropping malformed round event");
                Vec::new()
            },
        }
    }

    /// Feed a parsed server event. Events unrelated to rounds are ignored.
    pub fn handle_event(&mut self, event: ServerEvent) -> Vec<RoundAction> {
        if self.state == RoundState::FinalResults {
            tracing::debug!(kind = ?event.kind(), "match over, ignoring event");
            return Vec::new();
        }

        match event {
            ServerEvent::Countdown(countdown) => self.on_countdown(&countdown),
            ServerEvent::Info(info) => {
                self.status_message = Some(info.message);
                Vec::new()
            },
            ServerEvent::Question(question) => self.on_question(question),
            ServerEvent::Validation(validation) => self.on_validation(validation),
            ServerEvent::RoundResults(results) => self.on_round_results(results),
            ServerEvent::GameEnd(end) => self.on_game_end(end),
            ServerEvent::Room(_)
            | ServerEvent::PlayerJoined(_)
            | ServerEvent::PlayerLeft(_)
            | ServerEvent::Chat(_)
            | ServerEvent::Error(_) => Vec::new(),
        }
    }

    /// The user picked `option`.
    ///
    /// Ignored outside [`RoundState::Question`], after an answer is locked in,
    /// or for an option the question does not offer.
    pub fn submit_answer(&mut self, option: &str) -> Vec<RoundAction> {
        if self.state != RoundState::Question || self.selected_answer.is_some() {
            tracing::debug!(state = ?self.state, "answer ignored");
            return Vec::new();
        }
        let Some(question) = &self.question else {
            return Vec::new();
        };
        if !question.options.iter().any(|o| o == option) {
            tracing::warn!(option, "answer is not one of the offered options");
            return Vec::new();
        }

        let time_spent = question.time_limit.saturating_sub(self.time_left);
        let submission = AnswerSubmission {
            room_id: self.room_id.clone(),
            user_id: self.user_id.clone(),
            question_id: question.question_id.clone(),
            selected_option: option.to_string(),
            time_spent,
        };

        self.selected_answer = Some(option.to_string());
        self.time_spent = Some(time_spent);
        self.state = RoundState::Result;

        let mut actions = self.cancel_timer();
        actions.push(RoundAction::SubmitAnswer(submission));
        actions
    }

    /// Publishing the answer for `question_id` failed synchronously.
    ///
    /// Returns to [`RoundState::Question`] with the answer cleared so the user
    /// can retry, resuming the countdown where it stopped.
    pub fn answer_send_failed(&mut self, question_id: &str) -> Vec<RoundAction> {
        let current = self.question.as_ref().map(|q| q.question_id.as_str());
        if self.state != RoundState::Result
            || current != Some(question_id)
            || self.selected_answer.is_none()
        {
            return Vec::new();
        }

        tracing::warn!(question_id, "answer not sent, reopening question");
        self.selected_answer = None;
        self.time_spent = None;

        if self.time_left == 0 {
            return Vec::new();
        }
        self.state = RoundState::Question;
        self.start_timer()
    }

    /// One whole second elapsed on the timer `token`.
    pub fn timer_fired(&mut self, token: TimerToken) -> Vec<RoundAction> {
        if self.timer != Some(token) {
            tracing::debug!(token = token.value(), "stale timer tick ignored");
            return Vec::new();
        }

        match self.state {
            RoundState::Initial => {
                let left = self.countdown.unwrap_or(0).saturating_sub(1);
                self.countdown = Some(left);
                if left == 0 {
                    self.state = RoundState::Loading;
                    return self.cancel_timer();
                }
                Vec::new()
            },
            RoundState::Question => {
                self.time_left = self.time_left.saturating_sub(1);
                if self.time_left == 0 {
                    // Time ran out: lock the round without sending anything.
                    self.state = RoundState::Result;
                    self.time_spent = self.question.as_ref().map(|q| q.time_limit);
                    return self.cancel_timer();
                }
                Vec::new()
            },
            RoundState::Loading | RoundState::Result | RoundState::FinalResults => {
                self.cancel_timer()
            },
        }
    }

    /// The owner is going away. Cancels any live timer.
    pub fn teardown(&mut self) -> Vec<RoundAction> {
        self.cancel_timer()
    }

    fn on_countdown(&mut self, countdown: &Countdown) -> Vec<RoundAction> {
        if self.state != RoundState::Initial {
            return Vec::new();
        }
        if let Some(message) = &countdown.message {
            self.status_message = Some(message.clone());
        }

        self.countdown = Some(countdown.countdown);
        let mut actions = self.cancel_timer();
        actions.push(status_update(RoomStatus::InProgress));
        if countdown.countdown == 0 {
            self.state = RoundState::Loading;
        } else {
            actions.extend(self.start_timer());
        }
        actions
    }

    fn on_question(&mut self, question: RoomQuestion) -> Vec<RoundAction> {
        if let Some(current) = &self.question
            && question.round_number <= current.round_number
        {
            tracing::debug!(
                round = question.round_number,
                current = current.round_number,
                "duplicate or stale question ignored"
            );
            return Vec::new();
        }

        tracing::info!(
            round = question.round_number,
            total = question.total_rounds,
            time_limit = question.time_limit,
            "new question"
        );

        self.state = RoundState::Question;
        self.time_left = question.time_limit;
        self.question = Some(question);
        self.countdown = None;
        self.selected_answer = None;
        self.is_correct = None;
        self.correct_answer = None;
        self.time_spent = None;
        self.round_results = None;

        let mut actions = self.cancel_timer();
        actions.push(status_update(RoomStatus::InProgress));
        actions.extend(self.start_timer());
        actions
    }

    fn on_validation(&mut self, validation: AnswerValidation) -> Vec<RoundAction> {
        let current = self.question.as_ref().map(|q| q.question_id.as_str());
        if current != Some(validation.question_id.as_str()) {
            tracing::debug!(
                question = %validation.question_id,
                "validation for superseded question"
            );
            return Vec::new();
        }

        if validation.user_id == self.user_id {
            self.is_correct = Some(validation.is_correct);
            self.score = Some(validation.new_score);
            if validation.correct_answer.is_some() {
                self.correct_answer = validation.correct_answer;
            }
        }

        vec![RoundAction::UpdateRoom(RoomUpdate::SetScore {
            user_id: validation.user_id,
            score: validation.new_score,
        })]
    }

    fn on_round_results(&mut self, mut results: RoundResults) -> Vec<RoundAction> {
        let current_round = self.question.as_ref().map(|q| q.round_number);
        if current_round.is_some_and(|r| results.round_number < r) {
            tracing::debug!(round = results.round_number, "results for superseded round");
            return Vec::new();
        }

        results.players.sort_by(|a, b| b.score.cmp(&a.score));
        if self.correct_answer.is_none() {
            self.correct_answer.clone_from(&results.correct_answer);
        }

        let mut actions = Vec::new();
        if self.state == RoundState::Question && current_round == Some(results.round_number) {
            self.state = RoundState::Result;
            actions.extend(self.cancel_timer());
        }

        actions.push(RoundAction::UpdateRoom(RoomUpdate::MergeScores(results.players.clone())));
        self.round_results = Some(results);
        actions
    }

    fn on_game_end(&mut self, mut end: GameEnd) -> Vec<RoundAction> {
        tracing::info!("match over");
        end.leaderboard.sort_by(|a, b| b.score.cmp(&a.score));

        self.state = RoundState::FinalResults;
        if let Some(message) = end.message {
            self.status_message = Some(message);
        }
        self.leaderboard.clone_from(&end.leaderboard);

        let mut actions = self.cancel_timer();
        actions.push(RoundAction::UpdateRoom(RoomUpdate::ReplacePlayers(end.leaderboard)));
        actions.push(status_update(RoomStatus::Completed));
        actions
    }

    fn start_timer(&mut self) -> Vec<RoundAction> {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.timer = Some(token);
        vec![RoundAction::StartTimer { token, period: TICK }]
    }

    fn cancel_timer(&mut self) -> Vec<RoundAction> {
        self.timer.take().map(RoundAction::CancelTimer).into_iter().collect()
    }
}

/// Room status implied by a round event.
fn status_update(status: RoomStatus) -> RoundAction {
    RoundAction::UpdateRoom(RoomUpdate::Patch(RoomPatch::status(status)))
}
