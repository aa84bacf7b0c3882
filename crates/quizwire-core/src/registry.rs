//! Reference-counted topic subscriptions.
//!
//! Many independent consumers may listen to the same topic. The registry
//! keeps one handler set per topic and decides when the network-level
//! subscription must be created or torn down.
//!
//! # Invariants
//!
//! - While the connection is live, a topic has a network subscription if and
//!   only if its handler set is non-empty.
//! - A topic entry exists only while it has at least one handler.
//! - Handler ids are never reused, so a stale unsubscribe can never remove a
//!   newer handler.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Identifies one registered local handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Raw value, for logging.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Network-level work the registry asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryAction {
    /// Send SUBSCRIBE for `topic` under `sub_id`
    NetworkSubscribe {
        /// Topic to subscribe to
        topic: String,
        /// STOMP subscription id
        sub_id: String,
    },
    /// Send UNSUBSCRIBE for `sub_id`
    NetworkUnsubscribe {
        /// Topic being dropped
        topic: String,
        /// STOMP subscription id
        sub_id: String,
    },
}

#[derive(Debug, Default)]
struct TopicEntry {
    handlers: BTreeSet<HandlerId>,
    /// Subscription id of the live network subscription, if any
    network: Option<String>,
}

/// Topic to handler-set bookkeeping.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: BTreeMap<String, TopicEntry>,
    /// Subscription id to topic, for routing MESSAGE frames
    by_subscription: HashMap<String, String>,
    next_handler: u64,
    next_subscription: u64,
}

impl TopicRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new handler under `topic`.
    ///
    /// Returns the handler id, plus a network subscribe if the connection is
    /// `live` and the topic had no network subscription yet.
    pub fn add(&mut self, topic: &str, live: bool) -> (HandlerId, Option<RegistryAction>) {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;

        let entry = self.topics.entry(topic.to_string()).or_default();
        entry.handlers.insert(id);

        let action = if live && entry.network.is_none() {
            Some(Self::subscribe_entry(
                entry,
                topic,
                &mut self.next_subscription,
                &mut self.by_subscription,
            ))
        } else {
            None
        };

        (id, action)
    }

    /// Remove handler `id` from `topic`.
    ///
    /// Unknown topics or ids are ignored. When the last handler goes, the
    /// entry is discarded and, if `live`, a network unsubscribe is returned.
    pub fn remove(&mut self, topic: &str, id: HandlerId, live: bool) -> Option<RegistryAction> {
        let entry = self.topics.get_mut(topic)?;
        if !entry.handlers.remove(&id) || !entry.handlers.is_empty() {
            return None;
        }

        let entry = self.topics.remove(topic)?;
        let sub_id = entry.network?;
        self.by_subscription.remove(&sub_id);

        live.then(|| RegistryAction::NetworkUnsubscribe { topic: topic.to_string(), sub_id })
    }

    /// Network subscribes for every topic with handlers but no network
    /// subscription. Called when a session is established.
    pub fn resubscribe_all(&mut self) -> Vec<RegistryAction> {
        let mut actions = Vec::new();
        for (topic, entry) in &mut self.topics {
            if entry.network.is_none() && !entry.handlers.is_empty() {
                actions.push(Self::subscribe_entry(
                    entry,
                    topic,
                    &mut self.next_subscription,
                    &mut self.by_subscription,
                ));
            }
        }
        actions
    }

    /// The link dropped: every network subscription is gone, handlers stay.
    pub fn connection_lost(&mut self) {
        for entry in self.topics.values_mut() {
            entry.network = None;
        }
        self.by_subscription.clear();
    }

    /// Forget everything. Returns the ids of all handlers that were
    /// registered.
    pub fn clear(&mut self) -> Vec<HandlerId> {
        let ids = self.topics.values().flat_map(|e| e.handlers.iter().copied()).collect();
        self.topics.clear();
        self.by_subscription.clear();
        ids
    }

    /// Handlers registered for `topic`, in registration order.
    pub fn handlers(&self, topic: &str) -> Vec<HandlerId> {
        self.topics.get(topic).map(|e| e.handlers.iter().copied().collect()).unwrap_or_default()
    }

    /// Topic a STOMP subscription id belongs to.
    pub fn topic_for_subscription(&self, sub_id: &str) -> Option<&str> {
        self.by_subscription.get(sub_id).map(String::as_str)
    }

    /// Topics with at least one handler, sorted.
    pub fn active_topics(&self) -> Vec<&str> {
        self.topics.keys().map(String::as_str).collect()
    }

    /// Number of handlers for `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |e| e.handlers.len())
    }

    /// Whether `topic` currently has a network subscription.
    pub fn is_network_subscribed(&self, topic: &str) -> bool {
        self.topics.get(topic).is_some_and(|e| e.network.is_some())
    }

    /// Number of live network subscriptions.
    pub fn network_subscription_count(&self) -> usize {
        self.by_subscription.len()
    }

    fn subscribe_entry(
        entry: &mut TopicEntry,
        topic: &str,
        next_subscription: &mut u64,
        by_subscription: &mut HashMap<String, String>,
    ) -> RegistryAction {
        let sub_id = format!("sub-{next_subscription}");
        *next_subscription += 1;
        entry.network = Some(sub_id.clone());
        by_subscription.insert(sub_id.clone(), topic.to_string());
        RegistryAction::NetworkSubscribe { topic: topic.to_string(), sub_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "/topic/room/42/game/question";

    #[test]
    fn first_handler_subscribes_once() {
        let mut reg = TopicRegistry::new();
        let (_, first) = reg.add(TOPIC, true);
        let (_, second) = reg.add(TOPIC, true);

        assert!(matches!(first, Some(RegistryAction::NetworkSubscribe { .. })));
        assert_eq!(second, None);
        assert_eq!(reg.handler_count(TOPIC), 2);
    }

    #[test]
    fn last_handler_unsubscribes() {
        let mut reg = TopicRegistry::new();
        let (a, _) = reg.add(TOPIC, true);
        let (b, _) = reg.add(TOPIC, true);

        assert_eq!(reg.remove(TOPIC, a, true), None);
        assert_eq!(reg.handlers(TOPIC), vec![b]);
        assert!(matches!(
            reg.remove(TOPIC, b, true),
            Some(RegistryAction::NetworkUnsubscribe { ref sub_id, .. }) if sub_id == "sub-0"
        ));
        assert!(reg.active_topics().is_empty());
        assert_eq!(reg.topic_for_subscription("sub-0"), None);
    }

    #[test]
    fn stale_remove_is_noop() {
        let mut reg = TopicRegistry::new();
        let (a, _) = reg.add(TOPIC, true);
        assert!(reg.remove(TOPIC, a, true).is_some());
        assert_eq!(reg.remove(TOPIC, a, true), None);

        let (b, _) = reg.add(TOPIC, true);
        assert_eq!(reg.remove(TOPIC, a, true), None);
        assert_eq!(reg.handlers(TOPIC), vec![b]);
    }

    #[test]
    fn offline_subscribe_defers_network() {
        let mut reg = TopicRegistry::new();
        let (_, action) = reg.add(TOPIC, false);
        assert_eq!(action, None);
        assert!(!reg.is_network_subscribed(TOPIC));

        let actions = reg.resubscribe_all();
        assert_eq!(actions.len(), 1);
        assert!(reg.is_network_subscribed(TOPIC));
    }

    #[test]
    fn connection_lost_then_resubscribe_uses_fresh_ids() {
        let mut reg = TopicRegistry::new();
        reg.add("/topic/a", true);
        reg.add("/topic/b", true);
        assert_eq!(reg.network_subscription_count(), 2);

        reg.connection_lost();
        assert_eq!(reg.network_subscription_count(), 0);
        assert_eq!(reg.handler_count("/topic/a"), 1);

        let actions = reg.resubscribe_all();
        assert_eq!(actions.len(), 2);
        assert_eq!(reg.topic_for_subscription("sub-2"), Some("/topic/a"));
        assert_eq!(reg.topic_for_subscription("sub-0"), None);
    }

    #[test]
    fn offline_remove_of_last_handler_emits_nothing() {
        let mut reg = TopicRegistry::new();
        let (a, _) = reg.add(TOPIC, true);
        reg.connection_lost();
        assert_eq!(reg.remove(TOPIC, a, false), None);
        assert!(reg.active_topics().is_empty());
    }

    #[test]
    fn clear_returns_every_handler() {
        let mut reg = TopicRegistry::new();
        let (a, _) = reg.add("/topic/a", true);
        let (b, _) = reg.add("/topic/b", true);
        let mut ids = reg.clear();
        ids.sort();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(reg.network_subscription_count(), 0);
    }
}
