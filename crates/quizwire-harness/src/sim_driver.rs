//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the CLI's WebSocket driver but
//! for deterministic testing. It implements [`Driver`] so the same
//! [`quizwire_app::Runtime`] orchestration code runs in both production and
//! simulation. The transport is a [`SimBroker`] held in shared state, so a
//! test keeps a clone of the driver to inject events, publish server events
//! and break the link while the runtime owns the other clone.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use quizwire_app::{Driver, SessionEvent, SessionSnapshot, TransportEvent};
use quizwire_proto::ServerEvent;

use crate::{
    SimBroker,
    invariants::{ClientObserver, InvariantRegistry, SystemSnapshot},
};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Shared state for event injection.
#[derive(Default)]
struct SharedState {
    broker: SimBroker,
    pending_events: VecDeque<SessionEvent>,
    /// Broker output not yet handed to the runtime
    inbound: VecDeque<String>,
    closed: VecDeque<String>,
    renders: usize,
    last_render: Option<SessionSnapshot>,
    observer: ClientObserver,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Clones share the same broker and event queues.
#[derive(Clone, Default)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl SimDriver {
    /// Create a new simulation driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `registry` against every rendered snapshot.
    ///
    /// A violation fails the render, which stops the runtime with the
    /// violation as its error.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    /// Inject a [`SessionEvent`] for processing.
    pub fn inject_event(&self, event: SessionEvent) {
        self.lock().pending_events.push_back(event);
    }

    /// Deliver `event` on `topic` through the broker.
    pub fn publish(&self, topic: &str, event: &ServerEvent) -> usize {
        self.lock().broker.publish(topic, event)
    }

    /// Break the link from the broker side.
    pub fn drop_link(&self, reason: &str) {
        let mut state = self.lock();
        state.broker.drop_link();
        state.inbound.clear();
        state.closed.push_back(reason.to_string());
    }

    /// Run `f` with the broker.
    pub fn with_broker<R>(&self, f: impl FnOnce(&mut SimBroker) -> R) -> R {
        f(&mut self.lock().broker)
    }

    /// Check if there are pending events to process.
    pub fn has_pending(&self) -> bool {
        let state = self.lock();
        !state.pending_events.is_empty()
            || !state.inbound.is_empty()
            || !state.closed.is_empty()
            || state.broker.has_outbound()
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.lock().renders
    }

    /// The last rendered snapshot.
    pub fn last_render(&self) -> Option<SessionSnapshot> {
        self.lock().last_render.clone()
    }

    /// Whether the runtime has stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SimDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDriver").field("invariants", &self.invariants).finish_non_exhaustive()
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<SessionEvent>, Self::Error> {
        Ok(self.lock().pending_events.pop_front())
    }

    async fn open_transport(&mut self) -> Result<(), Self::Error> {
        if self.lock().broker.accept_link() {
            Ok(())
        } else {
            Err(SimDriverError("link refused".to_string()))
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if !state.broker.link_open() {
            return Err(SimDriverError("link closed".to_string()));
        }
        state.broker.receive(&text);
        Ok(())
    }

    async fn recv_event(&mut self) -> Option<TransportEvent> {
        let mut state = self.lock();
        if let Some(reason) = state.closed.pop_front() {
            return Some(TransportEvent::Closed { reason });
        }
        if state.inbound.is_empty() {
            let outbound = state.broker.take_outbound();
            state.inbound.extend(outbound);
        }
        state.inbound.pop_front().map(TransportEvent::Text)
    }

    fn close_transport(&mut self) {
        let mut state = self.lock();
        state.broker.drop_link();
        state.inbound.clear();
    }

    fn render(&mut self, snapshot: &SessionSnapshot) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.renders += 1;
        state.last_render = Some(snapshot.clone());

        let Some(registry) = &self.invariants else {
            return Ok(());
        };
        // Frames may still be in flight, so the broker side is not compared
        let client = state.observer.observe(snapshot.clone(), None);
        registry.check_all(&SystemSnapshot::single(client)).map_err(|violations| {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            SimDriverError(messages.join("; "))
        })
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use quizwire_proto::Frame;

    use super::*;

    #[test]
    fn inject_event_queues_event() {
        let driver = SimDriver::new();
        driver.inject_event(SessionEvent::Tick);
        assert!(driver.has_pending());
    }

    #[tokio::test]
    async fn refused_link_fails_open() {
        let mut driver = SimDriver::new();
        driver.with_broker(|b| b.set_refuse_links(true));
        assert!(driver.open_transport().await.is_err());
    }

    #[tokio::test]
    async fn broker_replies_come_back_as_text() {
        let mut driver = SimDriver::new();
        driver.open_transport().await.unwrap();
        driver.send_text(Frame::connect("token", "/", (0, 0)).encode()).await.unwrap();

        let Some(TransportEvent::Text(text)) = driver.recv_event().await else {
            panic!("expected CONNECTED");
        };
        assert!(text.starts_with("CONNECTED"));
        assert!(driver.recv_event().await.is_none());
    }

    #[tokio::test]
    async fn dropped_link_reports_closed_once() {
        let mut driver = SimDriver::new();
        driver.open_transport().await.unwrap();
        driver.drop_link("reset");

        let closed = TransportEvent::Closed { reason: "reset".into() };
        assert_eq!(driver.recv_event().await, Some(closed));
        assert!(driver.send_text("\n".into()).await.is_err());
        assert!(driver.recv_event().await.is_none());
    }
}
