//! Property-based tests for subscription reference counting
//!
//! For any number of handlers on one topic, removed in any order, exactly one
//! network subscribe and one network unsubscribe happen.

use proptest::prelude::*;
use quizwire_core::{HandlerId, RegistryAction, TopicRegistry};

const TOPIC: &str = "/topic/room/42/chat";

fn count(actions: &[RegistryAction]) -> (usize, usize) {
    let subs =
        actions.iter().filter(|a| matches!(a, RegistryAction::NetworkSubscribe { .. })).count();
    let unsubs =
        actions.iter().filter(|a| matches!(a, RegistryAction::NetworkUnsubscribe { .. })).count();
    (subs, unsubs)
}

/// Subscribe `n` handlers, then remove them in the order given by `order`
/// (a permutation seed).
fn run(n: usize, order: &[usize]) -> Vec<RegistryAction> {
    let mut reg = TopicRegistry::new();
    let mut actions = Vec::new();
    let mut ids: Vec<HandlerId> = Vec::new();

    for _ in 0..n {
        let (id, action) = reg.add(TOPIC, true);
        ids.push(id);
        actions.extend(action);
    }

    for &pick in order {
        if ids.is_empty() {
            break;
        }
        let id = ids.remove(pick % ids.len());
        actions.extend(reg.remove(TOPIC, id, true));
    }
    for id in ids {
        actions.extend(reg.remove(TOPIC, id, true));
    }
    actions
}

proptest! {
    #[test]
    fn prop_one_subscribe_one_unsubscribe(
        n in 1usize..20,
        order in prop::collection::vec(any::<usize>(), 0..20),
    ) {
        let actions = run(n, &order);
        prop_assert_eq!(count(&actions), (1, 1));
        let first_is_subscribe =
            matches!(actions.first(), Some(RegistryAction::NetworkSubscribe { .. }));
        let last_is_unsubscribe =
            matches!(actions.last(), Some(RegistryAction::NetworkUnsubscribe { .. }));
        prop_assert!(first_is_subscribe);
        prop_assert!(last_is_unsubscribe);
    }

    #[test]
    fn prop_network_iff_handlers(
        ops in prop::collection::vec((0usize..3, any::<bool>(), any::<usize>()), 1..60),
    ) {
        let topics = ["/topic/a", "/topic/b", "/topic/c"];
        let mut reg = TopicRegistry::new();
        let mut live: Vec<(usize, HandlerId)> = Vec::new();

        for (t, add, pick) in ops {
            if add || live.is_empty() {
                let (id, _) = reg.add(topics[t], true);
                live.push((t, id));
            } else {
                let (t, id) = live.remove(pick % live.len());
                reg.remove(topics[t], id, true);
            }

            for (i, topic) in topics.iter().enumerate() {
                let has_handlers = live.iter().any(|(t, _)| *t == i);
                prop_assert_eq!(reg.is_network_subscribed(topic), has_handlers);
                prop_assert_eq!(reg.handler_count(topic) > 0, has_handlers);
            }
        }
    }

    #[test]
    fn prop_resubscribe_covers_every_live_topic(m in 0usize..10, extra in 0usize..3) {
        let mut reg = TopicRegistry::new();
        for i in 0..m {
            for _ in 0..=extra {
                reg.add(&format!("/topic/t{i}"), true);
            }
        }

        reg.connection_lost();
        let actions = reg.resubscribe_all();
        prop_assert_eq!(count(&actions), (m, 0));
        prop_assert_eq!(reg.network_subscription_count(), m);
    }
}
