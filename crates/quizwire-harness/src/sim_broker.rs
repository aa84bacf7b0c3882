//! In-memory STOMP broker.
//!
//! Understands just enough of the protocol to stand in for the real broker:
//! answers CONNECT, tracks SUBSCRIBE/UNSUBSCRIBE per subscription id, records
//! SEND frames and delivers published events as MESSAGE frames to every
//! matching subscription. Counts every network subscribe and unsubscribe per
//! topic so tests can assert exactly how many went over the wire.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use quizwire_client::{Multiplexer, MuxAction};
use quizwire_core::Environment;
use quizwire_proto::{Command, Frame, ServerEvent, WireMessage};

/// A SEND frame the broker received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Destination header.
    pub destination: String,
    /// JSON body.
    pub body: String,
}

/// The simulated broker. One instance serves one client link.
#[derive(Debug, Default)]
pub struct SimBroker {
    link_open: bool,
    session: bool,
    refuse_links: bool,
    reject_connect: Option<String>,
    /// Subscription id to topic
    subscriptions: BTreeMap<String, String>,
    subscribe_counts: HashMap<String, usize>,
    unsubscribe_counts: HashMap<String, usize>,
    published: Vec<Published>,
    outbound: VecDeque<String>,
    next_message_id: u64,
    connects: usize,
}

impl SimBroker {
    /// Create a broker with no link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse (or accept again) new transport links.
    pub fn set_refuse_links(&mut self, refuse: bool) {
        self.refuse_links = refuse;
    }

    /// Answer the next CONNECT with an ERROR frame carrying `message`.
    pub fn reject_next_connect(&mut self, message: impl Into<String>) {
        self.reject_connect = Some(message.into());
    }

    /// Accept a new transport link. Returns `false` if links are refused.
    pub fn accept_link(&mut self) -> bool {
        if self.refuse_links {
            return false;
        }
        self.reset();
        self.link_open = true;
        true
    }

    /// Break the link. Subscriptions die with it, as on a real broker.
    pub fn drop_link(&mut self) {
        self.reset();
    }

    /// Whether a transport link is up.
    pub fn link_open(&self) -> bool {
        self.link_open
    }

    /// Whether a STOMP session is established on the link.
    pub fn session_open(&self) -> bool {
        self.session
    }

    /// Number of CONNECT frames answered.
    pub fn connects(&self) -> usize {
        self.connects
    }

    /// Handle text the client wrote.
    pub fn receive(&mut self, text: &str) {
        if !self.link_open {
            tracing::debug!("broker ignoring write on closed link");
            return;
        }
        match WireMessage::decode(text) {
            Ok(WireMessage::Heartbeat) => {},
            Ok(WireMessage::Frame(frame)) => self.receive_frame(&frame),
            Err(error) => tracing::warn!(%error, "broker got undecodable frame"),
        }
    }

    fn receive_frame(&mut self, frame: &Frame) {
        match frame.command {
            Command::Connect | Command::Stomp => {
                self.connects += 1;
                if let Some(message) = self.reject_connect.take() {
                    let error = Frame::new(Command::Error).with_header("message", message);
                    self.outbound.push_back(error.encode());
                    return;
                }
                self.session = true;
                self.outbound.push_back(
                    Frame::new(Command::Connected)
                        .with_header("version", "1.2")
                        .with_header("heart-beat", "0,0")
                        .encode(),
                );
            },
            Command::Subscribe => {
                if let (Some(id), Some(destination)) =
                    (frame.header("id"), frame.header("destination"))
                {
                    *self.subscribe_counts.entry(destination.to_string()).or_default() += 1;
                    self.subscriptions.insert(id.to_string(), destination.to_string());
                }
            },
            Command::Unsubscribe => {
                let released = frame.header("id").and_then(|id| self.subscriptions.remove(id));
                if let Some(topic) = released {
                    *self.unsubscribe_counts.entry(topic).or_default() += 1;
                }
            },
            Command::Send => {
                self.published.push(Published {
                    destination: frame.header("destination").unwrap_or_default().to_string(),
                    body: frame.body.clone(),
                });
            },
            Command::Disconnect => {
                self.session = false;
                self.subscriptions.clear();
            },
            other => tracing::warn!(command = %other, "broker got server-side command"),
        }
    }

    /// Deliver `event` to every subscription on `topic`. Returns the number
    /// of MESSAGE frames queued.
    pub fn publish(&mut self, topic: &str, event: &ServerEvent) -> usize {
        match event.to_json() {
            Ok(body) => self.publish_raw(topic, &body),
            Err(error) => {
                tracing::warn!(%error, "event does not serialize");
                0
            },
        }
    }

    /// Deliver a raw body to every subscription on `topic`.
    pub fn publish_raw(&mut self, topic: &str, body: &str) -> usize {
        if !self.session {
            return 0;
        }
        let ids: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|(_, t)| t.as_str() == topic)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &ids {
            self.next_message_id += 1;
            let frame = Frame::new(Command::Message)
                .with_header("subscription", id.as_str())
                .with_header("destination", topic)
                .with_header("message-id", self.next_message_id.to_string())
                .with_body(body);
            self.outbound.push_back(frame.encode());
        }
        ids.len()
    }

    /// Text queued for the client.
    pub fn take_outbound(&mut self) -> Vec<String> {
        self.outbound.drain(..).collect()
    }

    /// Whether text is queued for the client.
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// SEND frames received so far.
    pub fn published(&self) -> &[Published] {
        &self.published
    }

    /// Drain the SEND frames received so far.
    pub fn take_published(&mut self) -> Vec<Published> {
        std::mem::take(&mut self.published)
    }

    /// Network SUBSCRIBE frames seen for `topic`, over the broker's life.
    pub fn subscribe_count(&self, topic: &str) -> usize {
        self.subscribe_counts.get(topic).copied().unwrap_or_default()
    }

    /// Network UNSUBSCRIBE frames seen for `topic`, over the broker's life.
    pub fn unsubscribe_count(&self, topic: &str) -> usize {
        self.unsubscribe_counts.get(topic).copied().unwrap_or_default()
    }

    /// Live subscriptions per topic.
    pub fn live_subscriptions(&self) -> BTreeMap<String, usize> {
        let mut live = BTreeMap::new();
        for topic in self.subscriptions.values() {
            *live.entry(topic.clone()).or_default() += 1;
        }
        live
    }

    /// Topics with at least one live subscription.
    pub fn live_topics(&self) -> BTreeSet<String> {
        self.subscriptions.values().cloned().collect()
    }

    /// Exchange traffic with `mux` until neither side has anything to say.
    ///
    /// Transport requests are served by this broker. Actions that are not
    /// transport I/O are returned in order.
    pub fn pump<E: Environment>(&mut self, mux: &mut Multiplexer<E>) -> Vec<MuxAction> {
        let mut other = Vec::new();
        loop {
            let actions = mux.take_actions();
            let inbound = self.take_outbound();
            if actions.is_empty() && inbound.is_empty() {
                return other;
            }

            for action in actions {
                match action {
                    MuxAction::OpenTransport => {
                        if self.accept_link() {
                            if let Err(error) = mux.transport_opened() {
                                tracing::warn!(%error, "transport_opened rejected");
                            }
                        } else {
                            mux.transport_failed("link refused");
                        }
                    },
                    MuxAction::CloseTransport => self.drop_link(),
                    MuxAction::Transmit(frame) => self.receive(&frame.encode()),
                    MuxAction::Heartbeat => self.receive(WireMessage::HEARTBEAT),
                    action => other.push(action),
                }
            }
            for text in inbound {
                mux.receive(&text);
            }
        }
    }

    fn reset(&mut self) {
        self.link_open = false;
        self.session = false;
        self.subscriptions.clear();
        self.outbound.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> SimBroker {
        let mut broker = SimBroker::new();
        assert!(broker.accept_link());
        broker.receive(&Frame::connect("token", "/", (0, 0)).encode());
        broker.take_outbound();
        broker
    }

    #[test]
    fn connect_is_answered() {
        let mut broker = SimBroker::new();
        broker.accept_link();
        broker.receive(&Frame::connect("token", "/", (0, 0)).encode());
        let out = broker.take_outbound();
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("CONNECTED\n"));
        assert!(broker.session_open());
    }

    #[test]
    fn rejected_connect_gets_error() {
        let mut broker = SimBroker::new();
        broker.accept_link();
        broker.reject_next_connect("bad token");
        broker.receive(&Frame::connect("token", "/", (0, 0)).encode());
        assert!(broker.take_outbound()[0].starts_with("ERROR\n"));
        assert!(!broker.session_open());
    }

    #[test]
    fn publish_reaches_each_subscription() {
        let mut broker = connected();
        broker.receive(&Frame::subscribe("sub-0", "/topic/a").encode());
        broker.receive(&Frame::subscribe("sub-1", "/topic/b").encode());

        assert_eq!(broker.publish_raw("/topic/a", "{}"), 1);
        let out = broker.take_outbound();
        assert!(out[0].contains("subscription:sub-0"));
        assert_eq!(broker.subscribe_count("/topic/a"), 1);
    }

    #[test]
    fn unsubscribe_and_drop_clear_subscriptions() {
        let mut broker = connected();
        broker.receive(&Frame::subscribe("sub-0", "/topic/a").encode());
        broker.receive(&Frame::unsubscribe("sub-0").encode());
        assert_eq!(broker.unsubscribe_count("/topic/a"), 1);
        assert!(broker.live_topics().is_empty());

        broker.receive(&Frame::subscribe("sub-1", "/topic/a").encode());
        broker.drop_link();
        assert!(broker.live_topics().is_empty());
        assert_eq!(broker.publish_raw("/topic/a", "{}"), 0);
    }
}
