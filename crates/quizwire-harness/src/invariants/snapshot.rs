//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Some invariants are about how state evolves (chat status never moves
//! backwards), so a [`ClientObserver`] carries that history from one
//! snapshot to the next.

use std::collections::BTreeMap;

use quizwire_app::SessionSnapshot;
use quizwire_client::DeliveryStatus;

use crate::SimBroker;

/// Snapshot of the entire system state.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }
}

/// What the broker sees of one client link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerSnapshot {
    /// A STOMP session is established.
    pub session_open: bool,
    /// Live network subscriptions per topic.
    pub live_subscriptions: BTreeMap<String, usize>,
}

impl BrokerSnapshot {
    /// Capture `broker`.
    pub fn of(broker: &SimBroker) -> Self {
        Self {
            session_open: broker.session_open(),
            live_subscriptions: broker.live_subscriptions(),
        }
    }
}

/// Snapshot of a single client's observable state, with history.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    /// Client identifier.
    pub id: usize,
    /// Current session state.
    pub session: SessionSnapshot,
    /// The broker side of this client's link, when simulated.
    pub broker: Option<BrokerSnapshot>,
    /// Every distinct status each own chat message went through.
    pub chat_history: BTreeMap<String, Vec<DeliveryStatus>>,
    /// Every distinct round number displayed, in order.
    pub rounds_seen: Vec<u32>,
}

/// Accumulates history across snapshots of one client.
#[derive(Debug, Clone, Default)]
pub struct ClientObserver {
    id: usize,
    room_id: Option<String>,
    chat_history: BTreeMap<String, Vec<DeliveryStatus>>,
    rounds_seen: Vec<u32>,
}

impl ClientObserver {
    /// Observer for client `id`.
    pub fn new(id: usize) -> Self {
        Self { id, ..Self::default() }
    }

    /// Record `session` and return the snapshot including history.
    pub fn observe(
        &mut self,
        session: SessionSnapshot,
        broker: Option<BrokerSnapshot>,
    ) -> ClientSnapshot {
        // Round numbering restarts with each room
        if session.room_id != self.room_id {
            self.room_id.clone_from(&session.room_id);
            self.rounds_seen.clear();
        }

        for entry in &session.messages {
            let Some(id) = &entry.correlation_id else {
                continue;
            };
            let history = self.chat_history.entry(id.clone()).or_default();
            if history.last() != Some(&entry.status) {
                history.push(entry.status);
            }
        }

        let round = session
            .round
            .as_ref()
            .and_then(|r| r.current_question.as_ref())
            .map(|q| q.round_number);
        if let Some(round) = round
            && self.rounds_seen.last() != Some(&round)
        {
            self.rounds_seen.push(round);
        }

        ClientSnapshot {
            id: self.id,
            session,
            broker,
            chat_history: self.chat_history.clone(),
            rounds_seen: self.rounds_seen.clone(),
        }
    }
}
