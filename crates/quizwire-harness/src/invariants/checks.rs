//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{BTreeSet, HashSet};

use quizwire_client::{ConnectionStatus, DeliveryStatus, RoundState};

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// One network subscription per topic with handlers, and none without.
///
/// Client side: a topic with handlers is network-subscribed exactly when the
/// session is connected. Broker side (when simulated): while both ends
/// consider the session up, the broker holds exactly one subscription for
/// each topic with handlers and nothing else.
pub struct NetworkMatchesHandlers;

impl Invariant for NetworkMatchesHandlers {
    fn name(&self) -> &'static str {
        "network_matches_handlers"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let connected = client.session.status == ConnectionStatus::Connected;
            for topic in &client.session.topics {
                if topic.handlers == 0 {
                    return Err(self.violation(format!(
                        "client {}: topic {} listed with no handlers",
                        client.id, topic.topic
                    )));
                }
                if topic.network != connected {
                    return Err(self.violation(format!(
                        "client {}: topic {} network={} while status {:?}",
                        client.id, topic.topic, topic.network, client.session.status
                    )));
                }
            }

            let Some(broker) = &client.broker else {
                continue;
            };
            if !(connected && broker.session_open) {
                continue;
            }
            let local: BTreeSet<&str> =
                client.session.topics.iter().map(|t| t.topic.as_str()).collect();
            let remote: BTreeSet<&str> =
                broker.live_subscriptions.keys().map(String::as_str).collect();
            if local != remote {
                return Err(self.violation(format!(
                    "client {}: handlers on {local:?} but broker subscriptions on {remote:?}",
                    client.id
                )));
            }
            if let Some((topic, count)) = broker.live_subscriptions.iter().find(|(_, n)| **n != 1) {
                return Err(self.violation(format!(
                    "client {}: {count} network subscriptions for {topic}",
                    client.id
                )));
            }
        }
        Ok(())
    }
}

/// Chat delivery status only moves `Sending -> Sent` or `Sending -> Failed`.
pub struct ChatStatusMonotonic;

impl Invariant for ChatStatusMonotonic {
    fn name(&self) -> &'static str {
        "chat_status_monotonic"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for (id, history) in &client.chat_history {
                let valid = match history.as_slice() {
                    [] | [_] => true,
                    [DeliveryStatus::Sending, settled] => *settled != DeliveryStatus::Sending,
                    _ => false,
                };
                if !valid {
                    return Err(self.violation(format!(
                        "client {}: message {id} went {history:?}",
                        client.id
                    )));
                }
            }

            let mut seen = HashSet::new();
            for entry in &client.session.messages {
                if let Some(id) = &entry.correlation_id
                    && !seen.insert(id)
                {
                    return Err(self.violation(format!(
                        "client {}: two entries for message {id}",
                        client.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// At most one roster entry per user id.
pub struct UniqueRoster;

impl Invariant for UniqueRoster {
    fn name(&self) -> &'static str {
        "unique_roster"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(room) = &client.session.room else {
                continue;
            };
            let mut seen = HashSet::new();
            for player in &room.players {
                if !seen.insert(player.user_id.as_str()) {
                    return Err(self.violation(format!(
                        "client {}: user {} listed twice in room {}",
                        client.id, player.user_id, room.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A round timer runs exactly while a countdown or a question is live.
///
/// A timer in any other state could tick a transition in a round it does
/// not belong to.
pub struct TimerMatchesRound;

impl Invariant for TimerMatchesRound {
    fn name(&self) -> &'static str {
        "timer_matches_round"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let session = &client.session;
            if session.live_timers > 1 {
                return Err(self.violation(format!(
                    "client {}: {} timers",
                    client.id, session.live_timers
                )));
            }
            let round_state = session.round.as_ref().map(|r| r.state);
            let live = session.live_timers == 1;

            if live && !matches!(round_state, Some(RoundState::Initial | RoundState::Question)) {
                return Err(self.violation(format!(
                    "client {}: timer live in {round_state:?}",
                    client.id
                )));
            }
            if !live && round_state == Some(RoundState::Question) {
                return Err(self.violation(format!(
                    "client {}: question without a timer",
                    client.id
                )));
            }
        }
        Ok(())
    }
}

/// Displayed round numbers only increase within a room.
pub struct RoundsIncrease;

impl Invariant for RoundsIncrease {
    fn name(&self) -> &'static str {
        "rounds_increase"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for pair in client.rounds_seen.windows(2) {
                if pair[1] <= pair[0] {
                    return Err(self.violation(format!(
                        "client {}: round went {} → {}",
                        client.id, pair[0], pair[1]
                    )));
                }
            }
        }
        Ok(())
    }
}

trait ViolationExt {
    fn violation(&self, message: String) -> Violation;
}

impl<T: Invariant> ViolationExt for T {
    fn violation(&self, message: String) -> Violation {
        Violation { invariant: self.name(), message }
    }
}
