//! Connection multiplexer.
//!
//! One broker connection shared by any number of independent consumers. Each
//! consumer subscribes a handler to a topic and gets back a
//! [`Subscription`] handle. The multiplexer keeps the network subscriptions
//! in step with the [`TopicRegistry`], re-establishes them after every
//! reconnect, and fans inbound MESSAGE frames out to every handler of the
//! topic.
//!
//! # Responsibilities
//!
//! - Drive the [`Connection`] state machine and translate its actions into
//!   [`MuxAction`]s for the transport driver
//! - Resubscribe every live topic before reporting `Connected`
//! - Isolate handler failures: an `Err` or a panic in one handler is logged
//!   and the remaining handlers still run
//! - Make `send` a plain boolean: `false` when not connected, never an error

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
};

use quizwire_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionStatus, Environment, HandlerId,
    RegistryAction, TopicRegistry,
};
use quizwire_proto::{Command, Frame, WireMessage};
use serde::Serialize;

use crate::{
    error::{ClientError, HandlerError},
    event::{InboundMessage, MuxAction},
};

/// Callback invoked for every message on a subscribed topic.
pub type Handler = Box<dyn FnMut(&InboundMessage) -> Result<(), HandlerError> + Send>;

/// Handle returned by [`Multiplexer::subscribe`].
///
/// Pass it back to [`Multiplexer::unsubscribe`] to remove exactly this
/// handler. Unsubscribing a handle whose handler is already gone (after a
/// credential change, for example) is a no-op.
#[must_use = "dropping a Subscription leaks the handler; pass it to unsubscribe"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    topic: String,
    id: HandlerId,
}

impl Subscription {
    /// Topic this handle subscribes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// The connection multiplexer.
pub struct Multiplexer<E: Environment> {
    env: E,
    connection: Connection<E::Instant>,
    registry: TopicRegistry,
    handlers: HashMap<HandlerId, Handler>,
    actions: Vec<MuxAction>,
    reported: ConnectionStatus,
}

impl<E: Environment> Multiplexer<E> {
    /// Create a disconnected multiplexer.
    pub fn new(env: E, config: ConnectionConfig) -> Self {
        Self {
            env,
            connection: Connection::new(config),
            registry: TopicRegistry::new(),
            handlers: HashMap::new(),
            actions: Vec::new(),
            reported: ConnectionStatus::Disconnected,
        }
    }

    /// Environment in use.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Whether a session is established.
    pub fn is_connected(&self) -> bool {
        self.connection.status() == ConnectionStatus::Connected
    }

    /// Credential of the current session, if any.
    pub fn credential(&self) -> Option<&str> {
        self.connection.credential()
    }

    /// Whether reconnects were exhausted.
    pub fn is_failed(&self) -> bool {
        self.connection.is_failed()
    }

    /// Topics with at least one handler.
    pub fn active_topics(&self) -> Vec<&str> {
        self.registry.active_topics()
    }

    /// Number of handlers registered for `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        self.registry.handler_count(topic)
    }

    /// Whether `topic` has a live network subscription.
    pub fn is_network_subscribed(&self, topic: &str) -> bool {
        self.registry.is_network_subscribed(topic)
    }

    /// Drain pending actions for the driver.
    pub fn take_actions(&mut self) -> Vec<MuxAction> {
        std::mem::take(&mut self.actions)
    }

    /// Start or keep a session for `credential`.
    ///
    /// Same credential: no-op while a session exists or is being set up.
    /// Different credential: the old session, its network subscriptions and
    /// its local handlers are torn down first.
    pub fn connect(&mut self, credential: &str) {
        let now = self.env.now();
        let actions = self.connection.connect(credential, now);
        self.apply(actions);
    }

    /// Tear down the session and every handler (provider unmount).
    pub fn disconnect(&mut self) {
        let actions = self.connection.disconnect();
        self.apply(actions);
    }

    /// The transport requested by [`MuxAction::OpenTransport`] is open.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connection` if no connect attempt is in progress
    pub fn transport_opened(&mut self) -> Result<(), ClientError> {
        let now = self.env.now();
        let actions = self.connection.transport_opened(now)?;
        self.apply(actions);
        Ok(())
    }

    /// The transport failed to open, errored or closed.
    pub fn transport_failed(&mut self, reason: &str) {
        let now = self.env.now();
        let actions = self.connection.transport_failed(reason, now);
        self.apply(actions);
    }

    /// Process one inbound WebSocket text message.
    ///
    /// Undecodable or unexpected frames are logged and dropped.
    pub fn receive(&mut self, text: &str) {
        let message = match WireMessage::decode(text) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, "dropping undecodable frame");
                return;
            },
        };

        let now = self.env.now();
        let actions = match self.connection.handle_message(&message, now) {
            Ok(actions) => actions,
            Err(error) => {
                tracing::warn!(%error, "dropping unexpected frame");
                return;
            },
        };
        self.apply(actions);

        if let WireMessage::Frame(frame) = message
            && frame.command == Command::Message
            && self.is_connected()
        {
            self.dispatch(frame);
        }
    }

    /// Periodic maintenance: heartbeats, timeouts, due reconnects.
    pub fn tick(&mut self) {
        let now = self.env.now();
        let actions = self.connection.tick(now);
        self.apply(actions);
    }

    /// Register `handler` for `topic`.
    ///
    /// The first handler for a topic triggers a network SUBSCRIBE if the
    /// connection is up. Otherwise the subscribe happens on the next
    /// successful connect.
    pub fn subscribe(&mut self, topic: &str, handler: Handler) -> Subscription {
        let live = self.is_connected();
        let (id, action) = self.registry.add(topic, live);
        self.handlers.insert(id, handler);
        tracing::debug!(topic, handler = id.value(), "subscribed");

        if let Some(action) = action {
            self.apply_registry(action);
        }
        Subscription { topic: topic.to_string(), id }
    }

    /// Remove the handler behind `subscription`.
    ///
    /// Removing the last handler of a topic sends UNSUBSCRIBE. Other
    /// handlers on the same topic are unaffected.
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        if self.handlers.remove(&subscription.id).is_none() {
            return;
        }
        tracing::debug!(
            topic = %subscription.topic,
            handler = subscription.id.value(),
            "unsubscribed"
        );

        let live = self.is_connected();
        if let Some(action) = self.registry.remove(&subscription.topic, subscription.id, live) {
            self.apply_registry(action);
        }
    }

    /// Publish `body` as JSON to `destination`.
    ///
    /// Returns `false` without sending anything if the connection is not
    /// established or the body does not serialize.
    pub fn send<T: Serialize>(&mut self, destination: &str, body: &T) -> bool {
        if !self.is_connected() {
            tracing::debug!(destination, status = ?self.status(), "send refused, not connected");
            return false;
        }

        let json = match serde_json::to_string(body) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(destination, %error, "send refused, body does not serialize");
                return false;
            },
        };

        self.transmit(Frame::send(destination, json));
        true
    }

    fn dispatch(&mut self, frame: Frame) {
        let Some(subscription) = frame.header("subscription") else {
            tracing::warn!("dropping MESSAGE without subscription header");
            return;
        };
        // Frames for a released id may still be in flight after UNSUBSCRIBE
        let topic = self.registry.topic_for_subscription(subscription).map(str::to_string);
        let Some(topic) = topic else {
            tracing::debug!(subscription, "dropping MESSAGE for a closed subscription");
            return;
        };

        let ids = self.registry.handlers(&topic);
        if ids.is_empty() {
            tracing::debug!(%topic, "no handlers for MESSAGE");
            return;
        }

        let message = InboundMessage {
            topic,
            message_id: frame.header("message-id").map(str::to_string),
            body: frame.body,
        };

        for id in ids {
            let Some(handler) = self.handlers.get_mut(&id) else {
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| handler(&message))) {
                Ok(Ok(())) => {},
                Ok(Err(error)) => {
                    tracing::warn!(
                        topic = %message.topic,
                        handler = id.value(),
                        %error,
                        "handler failed"
                    );
                },
                Err(_) => {
                    tracing::warn!(
                        topic = %message.topic,
                        handler = id.value(),
                        "handler panicked"
                    );
                },
            }
        }
    }

    fn apply(&mut self, actions: Vec<ConnectionAction>) {
        for action in actions {
            match action {
                ConnectionAction::OpenTransport => self.actions.push(MuxAction::OpenTransport),
                ConnectionAction::CloseTransport => self.actions.push(MuxAction::CloseTransport),
                ConnectionAction::SendFrame(frame) => self.transmit(frame),
                ConnectionAction::SendHeartbeat => self.actions.push(MuxAction::Heartbeat),
                ConnectionAction::Established => {
                    for action in self.registry.resubscribe_all() {
                        self.apply_registry(action);
                    }
                },
                ConnectionAction::Lost { error } => {
                    tracing::info!(%error, "network subscriptions dropped");
                    self.registry.connection_lost();
                },
                ConnectionAction::ReconnectScheduled { attempt, delay } => {
                    self.actions.push(MuxAction::ReconnectScheduled { attempt, delay });
                },
                ConnectionAction::Failed { error } => self.actions.push(MuxAction::Fatal(error)),
                ConnectionAction::SessionReset => {
                    let dropped = self.registry.clear();
                    for id in &dropped {
                        self.handlers.remove(id);
                    }
                    tracing::info!(handlers = dropped.len(), "session reset, handlers discarded");
                },
            }
        }
        self.report_status();
    }

    fn apply_registry(&mut self, action: RegistryAction) {
        let frame = match action {
            RegistryAction::NetworkSubscribe { topic, sub_id } => {
                tracing::debug!(%topic, %sub_id, "SUBSCRIBE");
                Frame::subscribe(&sub_id, &topic)
            },
            RegistryAction::NetworkUnsubscribe { topic, sub_id } => {
                tracing::debug!(%topic, %sub_id, "UNSUBSCRIBE");
                Frame::unsubscribe(&sub_id)
            },
        };
        self.transmit(frame);
    }

    fn transmit(&mut self, frame: Frame) {
        let now = self.env.now();
        self.connection.note_sent(now);
        self.actions.push(MuxAction::Transmit(frame));
    }

    fn report_status(&mut self) {
        let status = self.connection.status();
        if status != self.reported {
            self.reported = status;
            self.actions.push(MuxAction::Status(status));
        }
    }
}

impl<E: Environment> std::fmt::Debug for Multiplexer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("status", &self.connection.status())
            .field("topics", &self.registry.active_topics())
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::test_env::TestEnv;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn connected_mux() -> Multiplexer<TestEnv> {
        let mut mux = Multiplexer::new(TestEnv::default(), ConnectionConfig::default());
        mux.connect("token");
        mux.transport_opened().unwrap();
        mux.receive("CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0");
        mux.take_actions();
        mux
    }

    fn subscribes(actions: &[MuxAction]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                MuxAction::Transmit(f) if f.command == Command::Subscribe => {
                    f.header("destination").map(str::to_string)
                },
                _ => None,
            })
            .collect()
    }

    fn message(sub: &str, dest: &str, body: &str) -> String {
        format!("MESSAGE\nsubscription:{sub}\ndestination:{dest}\nmessage-id:1\n\n{body}\0")
    }

    #[test]
    fn two_subscribers_each_receive_once() {
        let topic = "/topic/room/42/game/question";
        let mut mux = connected_mux();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let _sa = mux.subscribe(topic, counting_handler(&a));
        let _sb = mux.subscribe(topic, counting_handler(&b));
        assert_eq!(subscribes(&mux.take_actions()), vec![topic.to_string()]);

        mux.receive(&message("sub-0", topic, "{}"));
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_one_keeps_the_other() {
        let topic = "/topic/room/1/chat";
        let mut mux = connected_mux();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let sa = mux.subscribe(topic, counting_handler(&a));
        let _sb = mux.subscribe(topic, counting_handler(&b));
        mux.take_actions();

        mux.unsubscribe(sa);
        assert!(mux.take_actions().is_empty());

        mux.receive(&message("sub-0", topic, "{}"));
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_handler_does_not_block_others() {
        let topic = "/topic/room/1/chat";
        let mut mux = connected_mux();
        let after = Arc::new(AtomicUsize::new(0));

        let _bad = mux.subscribe(topic, Box::new(|_| Err(HandlerError::Other("boom".into()))));
        let _panics = mux.subscribe(topic, Box::new(|_| panic!("handler bug")));
        let _good = mux.subscribe(topic, counting_handler(&after));

        mux.receive(&message("sub-0", topic, "{}"));
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn send_while_disconnected_is_false_and_silent() {
        let mut mux = Multiplexer::new(TestEnv::default(), ConnectionConfig::default());
        assert!(!mux.send("/app/chat/1", &"hello"));
        assert!(mux.take_actions().is_empty());
    }

    #[test]
    fn send_when_connected_transmits_json() {
        let mut mux = connected_mux();
        assert!(mux.send("/app/chat/1", &serde_json::json!({"msg": "hi"})));
        let actions = mux.take_actions();
        let [MuxAction::Transmit(frame)] = actions.as_slice() else {
            panic!("expected one SEND, got {actions:?}");
        };
        assert_eq!(frame.command, Command::Send);
        assert_eq!(frame.body, r#"{"msg":"hi"}"#);
    }

    #[test]
    fn subscriptions_made_offline_are_sent_before_connected_status() {
        let mut mux = Multiplexer::new(TestEnv::default(), ConnectionConfig::default());
        let _s = mux.subscribe("/topic/room/1/quiz", Box::new(|_| Ok(())));
        mux.connect("token");
        mux.transport_opened().unwrap();
        mux.take_actions();

        mux.receive("CONNECTED\nversion:1.2\n\n\0");
        let actions = mux.take_actions();
        assert_eq!(subscribes(&actions), vec!["/topic/room/1/quiz".to_string()]);
        assert_eq!(actions.last(), Some(&MuxAction::Status(ConnectionStatus::Connected)));
    }

    #[test]
    fn credential_change_discards_handlers() {
        let mut mux = connected_mux();
        let sub = mux.subscribe("/topic/room/1/quiz", Box::new(|_| Ok(())));
        mux.connect("another-token");
        assert!(mux.active_topics().is_empty());

        // Stale handle is harmless
        mux.unsubscribe(sub);
        let actions = mux.take_actions();
        assert!(actions.contains(&MuxAction::OpenTransport));
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let mut mux = connected_mux();
        mux.receive("GARBAGE\n\n\0");
        mux.receive("MESSAGE\nsubscription:sub-9\n\nno terminator");
        assert!(mux.is_connected());
        assert!(mux.take_actions().is_empty());
    }

    #[test]
    fn lost_connection_reports_disconnected_and_schedules_retry() {
        let mut mux = connected_mux();
        let _s = mux.subscribe("/topic/room/1/chat", Box::new(|_| Ok(())));
        mux.take_actions();

        mux.transport_failed("reset");
        let actions = mux.take_actions();
        assert!(actions.contains(&MuxAction::Status(ConnectionStatus::Disconnected)));
        assert!(matches!(
            actions.iter().find(|a| matches!(a, MuxAction::ReconnectScheduled { .. })),
            Some(MuxAction::ReconnectScheduled { attempt: 1, .. })
        ));
        assert!(!mux.is_network_subscribed("/topic/room/1/chat"));
        assert_eq!(mux.handler_count("/topic/room/1/chat"), 1);
    }
}
