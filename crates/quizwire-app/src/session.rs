//! One user's live session.
//!
//! The [`Session`] owns the [`Multiplexer`] and every consumer of it: the
//! round machine, the chat pipeline and the room store. Consumers never call
//! each other. Subscription handlers only forward messages into the session
//! inbox; the session drains the inbox after each socket read and routes
//! every event to the one component that owns its state.
//!
//! # Responsibilities
//!
//! - Translate [`SessionEvent`]s into multiplexer and component calls
//! - Subscribe every room and player topic on room entry and release them
//!   on leave
//! - Run the round timer: at most one, keyed by its [`TimerToken`]
//! - Turn multiplexer actions into [`SessionAction`]s for the runtime

use std::{collections::VecDeque, time::Duration};

use quizwire_client::{
    ChatPipeline, ClientConfig, FetchError, HandlerError, InboundMessage, Multiplexer, MuxAction,
    RoomResults, RoomStore, RoundAction, RoundMachine, RoundState, Subscription, TimerToken,
};
use quizwire_core::Environment;
use quizwire_proto::{
    ServerEvent, WireMessage,
    topic::{PlayerFacet, RoomFacet, destination, player_topic, room_topic},
};
use tokio::sync::mpsc;

use crate::{SessionAction, SessionEvent, SessionSnapshot, TopicState};

/// Wait before asking again for results whose fetch failed.
const RESULTS_RETRY_DELAY: Duration = Duration::from_secs(5);

/// The running round timer.
#[derive(Debug, Clone, Copy)]
struct RoundTimer<I> {
    token: TimerToken,
    started: I,
    period: Duration,
    fired: u64,
}

/// A user's session: connection, room, round and chat.
///
/// Generic over [`Environment`] so the same code runs against the real clock
/// and the simulated one.
pub struct Session<E: Environment> {
    user_id: String,
    mux: Multiplexer<E>,
    room: RoomStore,
    chat: ChatPipeline<E::Instant>,
    round: Option<RoundMachine>,
    room_id: Option<String>,
    subscriptions: Vec<Subscription>,
    inbox_tx: mpsc::UnboundedSender<InboundMessage>,
    inbox: mpsc::UnboundedReceiver<InboundMessage>,
    timer: Option<RoundTimer<E::Instant>>,
    results_requested: bool,
    results_failed_at: Option<E::Instant>,
    results: Option<RoomResults>,
    last_error: Option<String>,
}

impl<E: Environment> Session<E> {
    /// Create a disconnected session for `user_id`.
    pub fn new(env: E, user_id: impl Into<String>, config: &ClientConfig) -> Self {
        let user_id = user_id.into();
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        Self {
            mux: Multiplexer::new(env, config.connection.clone()),
            room: RoomStore::new(config.leave_policy),
            chat: ChatPipeline::new(user_id.clone(), config.chat_ack_timeout),
            user_id,
            round: None,
            room_id: None,
            subscriptions: Vec::new(),
            inbox_tx,
            inbox,
            timer: None,
            results_requested: false,
            results_failed_at: None,
            results: None,
            last_error: None,
        }
    }

    /// The local user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The multiplexer.
    pub fn multiplexer(&self) -> &Multiplexer<E> {
        &self.mux
    }

    /// The room store.
    pub fn room_store(&self) -> &RoomStore {
        &self.room
    }

    /// The chat pipeline.
    pub fn chat(&self) -> &ChatPipeline<E::Instant> {
        &self.chat
    }

    /// The round machine of the followed room.
    pub fn round(&self) -> Option<&RoundMachine> {
        self.round.as_ref()
    }

    /// Room being followed.
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Process one event.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        let mut render = true;

        match event {
            SessionEvent::Tick => {
                render = self.tick();
            },
            SessionEvent::Connect { credential } => {
                // A new credential discards every handler, so the room goes first
                if self.mux.credential().is_some_and(|c| c != credential) {
                    self.leave_room();
                }
                self.mux.connect(&credential);
            },
            SessionEvent::Disconnect => {
                self.leave_room();
                self.mux.disconnect();
            },
            SessionEvent::TransportOpened => {
                if let Err(error) = self.mux.transport_opened() {
                    tracing::warn!(%error, "unexpected transport open");
                }
            },
            SessionEvent::TransportFailed { reason } => self.mux.transport_failed(&reason),
            SessionEvent::Wire(text) => {
                self.mux.receive(&text);
                self.drain_inbox();
            },
            SessionEvent::EnterRoom { room_id } => self.enter_room(room_id),
            SessionEvent::LeaveRoom => self.leave_room(),
            SessionEvent::StartGame => self.start_game(),
            SessionEvent::SubmitAnswer { option } => {
                if let Some(round) = self.round.as_mut() {
                    let round_actions = round.submit_answer(&option);
                    self.apply_round(round_actions);
                }
            },
            SessionEvent::SendChat { text } => {
                if let Some(room_id) = &self.room_id {
                    self.chat.send_optimistic(&mut self.mux, room_id, &self.room, &text);
                } else {
                    tracing::debug!("chat ignored, not in a room");
                }
            },
            SessionEvent::ChatViewed(open) => self.chat.set_open(open),
            SessionEvent::ResultsFetched { room_code, result } => {
                self.results_fetched(&room_code, result);
            },
            SessionEvent::Quit => {
                self.leave_room();
                self.mux.disconnect();
                actions.push(SessionAction::Quit);
            },
        }

        render |= self.collect_mux_actions(&mut actions);
        if let Some(room_code) = self.results_due(self.mux.env().now()) {
            self.results_requested = true;
            actions.push(SessionAction::FetchResults { room_code });
        }
        if render {
            actions.push(SessionAction::Render);
        }
        actions
    }

    /// Read-only view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user_id: self.user_id.clone(),
            status: self.mux.status(),
            failed: self.mux.is_failed(),
            room_id: self.room_id.clone(),
            room: self.room.room().cloned(),
            round: self.round.as_ref().map(RoundMachine::snapshot),
            live_timers: usize::from(self.timer.is_some()),
            messages: self.chat.messages().to_vec(),
            unread: self.chat.unread(),
            topics: self
                .mux
                .active_topics()
                .into_iter()
                .map(|topic| TopicState {
                    topic: topic.to_string(),
                    handlers: self.mux.handler_count(topic),
                    network: self.mux.is_network_subscribed(topic),
                })
                .collect(),
            results: self.results.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Returns whether anything visible changed.
    fn tick(&mut self) -> bool {
        self.mux.tick();
        let now = self.mux.env().now();
        let expired = self.chat.tick(now);
        self.fire_timer(now) | expired
    }

    /// Deliver every period that elapsed since the timer started.
    fn fire_timer(&mut self, now: E::Instant) -> bool {
        let mut fired = false;
        loop {
            let Some(timer) = self.timer.as_mut() else {
                break;
            };
            let period_ms = timer.period.as_millis().max(1);
            let due = ((now - timer.started).as_millis() / period_ms) as u64;
            if timer.fired >= due {
                break;
            }
            timer.fired += 1;
            let token = timer.token;

            let Some(round) = self.round.as_mut() else {
                self.timer = None;
                break;
            };
            let actions = round.timer_fired(token);
            self.apply_round(actions);
            fired = true;
        }
        fired
    }

    fn enter_room(&mut self, room_id: String) {
        if self.room_id.as_deref() == Some(room_id.as_str()) {
            return;
        }
        self.leave_room();
        tracing::info!(%room_id, "entering room");

        let topics = RoomFacet::ALL
            .iter()
            .map(|&facet| room_topic(&room_id, facet))
            .chain(PlayerFacet::ALL.iter().map(|&facet| player_topic(&self.user_id, facet)));
        for topic in topics.collect::<Vec<_>>() {
            let inbox = self.inbox_tx.clone();
            let subscription = self.mux.subscribe(
                &topic,
                Box::new(move |message: &InboundMessage| {
                    inbox.send(message.clone()).map_err(|_| HandlerError::Closed)
                }),
            );
            self.subscriptions.push(subscription);
        }

        self.round = Some(RoundMachine::new(room_id.clone(), self.user_id.clone()));
        self.room_id = Some(room_id);
    }

    fn leave_room(&mut self) {
        let Some(room_id) = self.room_id.take() else {
            return;
        };
        tracing::info!(%room_id, "leaving room");

        for subscription in self.subscriptions.drain(..) {
            self.mux.unsubscribe(subscription);
        }
        if let Some(mut round) = self.round.take() {
            round.teardown();
        }
        self.timer = None;
        self.room.clear_room();
        self.chat.clear();
        self.results = None;
        self.results_requested = false;
        self.results_failed_at = None;

        // Messages already queued for the old room
        while self.inbox.try_recv().is_ok() {}
    }

    fn start_game(&mut self) {
        let Some(room_id) = &self.room_id else {
            tracing::debug!("start ignored, not in a room");
            return;
        };
        if let Some(room) = self.room.room()
            && room.host_id != self.user_id
        {
            tracing::warn!(host = %room.host_id, "only the host can start the game");
            return;
        }
        let body = serde_json::json!({});
        if !self.mux.send(&destination::start_game(room_id, &self.user_id), &body) {
            self.last_error = Some("not connected".to_string());
        }
    }

    fn drain_inbox(&mut self) {
        while let Ok(message) = self.inbox.try_recv() {
            self.route(&message);
        }
    }

    fn route(&mut self, message: &InboundMessage) {
        let event = match message.event() {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(topic = %message.topic, %error, "dropping unparseable event");
                return;
            },
        };
        tracing::debug!(topic = %message.topic, kind = ?event.kind(), "event");

        match event {
            ServerEvent::Room(snapshot) => self.room.set_room(snapshot),
            ServerEvent::PlayerJoined(player) => self.room.upsert_player(player),
            ServerEvent::PlayerLeft(left) => self.room.player_left(&left.user_id),
            ServerEvent::Chat(broadcast) => self.chat.receive(broadcast, &self.room),
            ServerEvent::Error(error) => {
                if error.temp_id.is_some() {
                    self.chat.reject(&error);
                } else {
                    tracing::warn!(message = %error.message, "server error");
                    self.last_error = Some(error.message);
                }
            },
            round_event @ (ServerEvent::Countdown(_)
            | ServerEvent::Info(_)
            | ServerEvent::Question(_)
            | ServerEvent::Validation(_)
            | ServerEvent::RoundResults(_)
            | ServerEvent::GameEnd(_)) => {
                if let Some(round) = self.round.as_mut() {
                    let actions = round.handle_event(round_event);
                    self.apply_round(actions);
                }
            },
        }
    }

    fn apply_round(&mut self, actions: Vec<RoundAction>) {
        let mut queue = VecDeque::from(actions);
        while let Some(action) = queue.pop_front() {
            match action {
                RoundAction::StartTimer { token, period } => {
                    let started = self.mux.env().now();
                    self.timer = Some(RoundTimer { token, started, period, fired: 0 });
                },
                RoundAction::CancelTimer(token) => {
                    if self.timer.is_some_and(|t| t.token == token) {
                        self.timer = None;
                    }
                },
                RoundAction::SubmitAnswer(submission) => {
                    if !self.mux.send(destination::ANSWER, &submission) {
                        tracing::warn!(question = %submission.question_id, "answer not sent");
                        if let Some(round) = self.round.as_mut() {
                            queue.extend(round.answer_send_failed(&submission.question_id));
                        }
                    }
                },
                RoundAction::UpdateRoom(update) => self.room.apply(update),
            }
        }
    }

    fn results_fetched(&mut self, room_code: &str, result: Result<RoomResults, FetchError>) {
        let current = self.room.room().is_some_and(|room| room.code == room_code);
        if !self.results_requested || !current {
            tracing::debug!(room_code, "dropping results for a room no longer followed");
            return;
        }
        match result {
            Ok(results) => {
                self.results_requested = false;
                self.results = Some(results);
            },
            Err(error) => {
                tracing::warn!(room_code, %error, "could not load final results");
                // Permanent failures stay requested, so they are not retried
                if error.is_transient() {
                    self.results_requested = false;
                    self.results_failed_at = Some(self.mux.env().now());
                }
                self.last_error = Some(error.to_string());
            },
        }
    }

    fn results_due(&self, now: E::Instant) -> Option<String> {
        if self.results_requested || self.results.is_some() {
            return None;
        }
        if self.results_failed_at.is_some_and(|failed| now - failed < RESULTS_RETRY_DELAY) {
            return None;
        }
        let finished = self.round.as_ref().is_some_and(|r| r.state() == RoundState::FinalResults);
        if !finished {
            return None;
        }
        self.room.room().map(|room| room.code.clone())
    }

    /// Returns whether the status changed.
    fn collect_mux_actions(&mut self, actions: &mut Vec<SessionAction>) -> bool {
        let mut status_changed = false;
        for action in self.mux.take_actions() {
            match action {
                MuxAction::OpenTransport => actions.push(SessionAction::OpenTransport),
                MuxAction::CloseTransport => actions.push(SessionAction::CloseTransport),
                MuxAction::Transmit(frame) => actions.push(SessionAction::Send(frame.encode())),
                MuxAction::Heartbeat => {
                    actions.push(SessionAction::Send(WireMessage::HEARTBEAT.to_string()));
                },
                MuxAction::Status(status) => {
                    tracing::info!(?status, "connection status");
                    status_changed = true;
                },
                MuxAction::ReconnectScheduled { attempt, delay } => {
                    tracing::info!(attempt, ?delay, "reconnect scheduled");
                },
                MuxAction::Fatal(error) => {
                    tracing::error!(%error, "giving up on broker connection");
                    self.last_error = Some(error.to_string());
                    status_changed = true;
                },
            }
        }
        status_changed
    }
}

impl<E: Environment> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("room_id", &self.room_id)
            .field("mux", &self.mux)
            .finish_non_exhaustive()
    }
}
