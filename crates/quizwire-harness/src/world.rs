//! Synchronous single-client simulation.
//!
//! [`SimWorld`] wires one [`Session`] to one [`SimBroker`] on a [`SimEnv`]
//! clock and executes every session action in place. Each call runs until
//! neither side has anything left to say, then observes the session and
//! checks the invariant registry, so a test only ever sees quiescent
//! states.
//!
//! ```text
//!   step(event) ──> Session ──actions──> SimBroker
//!                      ^                    │
//!                      └──── Wire(text) ────┘
//! ```

use std::{collections::VecDeque, time::Duration};

use quizwire_app::{Session, SessionAction, SessionEvent, SessionSnapshot};
use quizwire_client::ClientConfig;
use quizwire_proto::ServerEvent;

use crate::{
    SimBroker, SimEnv,
    invariants::{BrokerSnapshot, ClientObserver, InvariantRegistry, SystemSnapshot, Violation},
};

/// Clock granularity of [`SimWorld::advance`].
pub const TICK_STEP: Duration = Duration::from_millis(100);

/// One session, one broker, one virtual clock.
pub struct SimWorld {
    env: SimEnv,
    session: Session<SimEnv>,
    broker: SimBroker,
    observer: ClientObserver,
    invariants: InvariantRegistry,
    violations: Vec<Violation>,
    fetch_requests: Vec<String>,
    renders: usize,
}

impl SimWorld {
    /// World for `user_id` with default configuration and seed 0.
    pub fn new(user_id: &str) -> Self {
        Self::with_config(user_id, &ClientConfig::default(), 0)
    }

    /// World for `user_id` with `config`, randomness derived from `seed`.
    pub fn with_config(user_id: &str, config: &ClientConfig, seed: u64) -> Self {
        let env = SimEnv::with_seed(seed);
        Self {
            session: Session::new(env.clone(), user_id, config),
            env,
            broker: SimBroker::new(),
            observer: ClientObserver::new(0),
            invariants: InvariantRegistry::standard(),
            violations: Vec::new(),
            fetch_requests: Vec::new(),
            renders: 0,
        }
    }

    /// Connect with `credential` and run the handshake to completion.
    pub fn connect(&mut self, credential: &str) {
        self.step(SessionEvent::Connect { credential: credential.to_string() });
    }

    /// Feed `event` to the session and run until quiet.
    pub fn step(&mut self, event: SessionEvent) {
        let mut events = VecDeque::from([event]);
        while let Some(event) = events.pop_front() {
            for action in self.session.handle(event) {
                self.execute(action, &mut events);
            }
            if events.is_empty() {
                events.extend(self.broker.take_outbound().into_iter().map(SessionEvent::Wire));
            }
        }
        self.observe();
    }

    /// Publish `event` on `topic` and deliver it. Returns the number of
    /// subscriptions it reached.
    pub fn publish(&mut self, topic: &str, event: &ServerEvent) -> usize {
        let delivered = self.broker.publish(topic, event);
        self.step(SessionEvent::Tick);
        delivered
    }

    /// Move the clock forward by `by`, ticking every [`TICK_STEP`].
    pub fn advance(&mut self, by: Duration) {
        let mut left = by;
        while !left.is_zero() {
            let step = left.min(TICK_STEP);
            self.env.advance(step);
            left -= step;
            self.step(SessionEvent::Tick);
        }
    }

    /// Break the link from the broker side.
    pub fn drop_link(&mut self, reason: &str) {
        self.broker.drop_link();
        self.step(SessionEvent::TransportFailed { reason: reason.to_string() });
    }

    /// The session.
    pub fn session(&self) -> &Session<SimEnv> {
        &self.session
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// The broker.
    pub fn broker(&self) -> &SimBroker {
        &self.broker
    }

    /// The broker, mutably.
    pub fn broker_mut(&mut self) -> &mut SimBroker {
        &mut self.broker
    }

    /// The shared clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Every invariant violation seen so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Room codes the session asked to fetch results for, drained.
    pub fn take_fetch_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.fetch_requests)
    }

    /// Number of render requests so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    fn execute(&mut self, action: SessionAction, events: &mut VecDeque<SessionEvent>) {
        match action {
            SessionAction::OpenTransport => {
                if self.broker.accept_link() {
                    events.push_back(SessionEvent::TransportOpened);
                } else {
                    let reason = "link refused".to_string();
                    events.push_back(SessionEvent::TransportFailed { reason });
                }
            },
            SessionAction::CloseTransport => self.broker.drop_link(),
            SessionAction::Send(text) => {
                if self.broker.link_open() {
                    self.broker.receive(&text);
                } else {
                    let reason = "link closed".to_string();
                    events.push_back(SessionEvent::TransportFailed { reason });
                }
            },
            SessionAction::FetchResults { room_code } => self.fetch_requests.push(room_code),
            SessionAction::Render => self.renders += 1,
            SessionAction::Quit => {},
        }
    }

    fn observe(&mut self) {
        let broker = BrokerSnapshot::of(&self.broker);
        let client = self.observer.observe(self.session.snapshot(), Some(broker));
        if let Err(violations) = self.invariants.check_all(&SystemSnapshot::single(client)) {
            for violation in &violations {
                tracing::error!(%violation, "invariant violated");
            }
            self.violations.extend(violations);
        }
    }
}

impl std::fmt::Debug for SimWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimWorld")
            .field("env", &self.env)
            .field("session", &self.session)
            .field("violations", &self.violations.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use quizwire_client::ConnectionStatus;
    use quizwire_proto::topic::{RoomFacet, room_topic};

    use super::*;
    use crate::fixtures;

    #[test]
    fn connect_reaches_connected() {
        let mut world = SimWorld::new("u1");
        world.connect("token");
        assert_eq!(world.snapshot().status, ConnectionStatus::Connected);
        assert_eq!(world.broker().connects(), 1);
        assert!(world.violations().is_empty());
    }

    #[test]
    fn published_events_reach_the_session() {
        let mut world = SimWorld::new("u1");
        world.connect("token");
        world.step(SessionEvent::EnterRoom { room_id: "r1".into() });

        let room = fixtures::room("r1", "ABC", "u1", vec![fixtures::player("u1", "Ann", 0)]);
        assert_eq!(world.publish(&room_topic("r1", RoomFacet::Quiz), &room), 1);
        assert_eq!(world.snapshot().room.map(|r| r.code), Some("ABC".to_string()));
        assert!(world.violations().is_empty());
    }

    #[test]
    fn advance_moves_the_clock() {
        let mut world = SimWorld::new("u1");
        world.advance(Duration::from_millis(350));
        assert_eq!(world.env().elapsed(), Duration::from_millis(350));
    }
}
