//! Multiplexer behavior against the simulated broker.
//!
//! Every frame the multiplexer emits goes through [`SimBroker`], so these
//! tests count what actually crossed the wire rather than inspecting
//! actions.

#![allow(clippy::disallowed_types, reason = "Synchronous handler bookkeeping only")]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use quizwire_client::{
    ChatPipeline, ConnectionConfig, ConnectionStatus, DeliveryStatus, Handler, HandlerError,
    InboundMessage, LeavePolicy, Multiplexer, MuxAction, RoomStore,
};
use quizwire_harness::{SimBroker, SimEnv, fixtures};
use quizwire_proto::{
    Command, Frame,
    topic::{RoomFacet, room_topic},
};

fn counting_handler(counter: &Arc<AtomicUsize>) -> Handler {
    let counter = Arc::clone(counter);
    Box::new(move |_: &InboundMessage| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

fn connected(env: &SimEnv, broker: &mut SimBroker) -> Multiplexer<SimEnv> {
    let mut mux = Multiplexer::new(env.clone(), ConnectionConfig::default());
    mux.connect("token");
    broker.pump(&mut mux);
    assert_eq!(mux.status(), ConnectionStatus::Connected);
    mux
}

#[test]
fn two_subscribers_share_one_network_subscription() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    let mut mux = connected(&env, &mut broker);
    let topic = room_topic("42", RoomFacet::GameQuestion);

    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));
    let sub_a = mux.subscribe(&topic, counting_handler(&a));
    let _sub_b = mux.subscribe(&topic, counting_handler(&b));
    broker.pump(&mut mux);
    assert_eq!(broker.subscribe_count(&topic), 1);

    broker.publish(&topic, &fixtures::question(1, 3, 20));
    broker.pump(&mut mux);
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 1);

    // Dropping one of two handlers keeps the network subscription
    mux.unsubscribe(sub_a);
    broker.pump(&mut mux);
    assert_eq!(broker.unsubscribe_count(&topic), 0);

    broker.publish(&topic, &fixtures::question(2, 3, 20));
    broker.pump(&mut mux);
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 2);
}

#[test]
fn last_unsubscribe_releases_the_topic() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    let mut mux = connected(&env, &mut broker);
    let topic = room_topic("42", RoomFacet::Chat);

    let sub = mux.subscribe(&topic, Box::new(|_: &InboundMessage| Ok(())));
    broker.pump(&mut mux);
    mux.unsubscribe(sub);
    broker.pump(&mut mux);

    assert_eq!(broker.unsubscribe_count(&topic), 1);
    assert!(broker.live_topics().is_empty());
    assert!(mux.active_topics().is_empty());
}

#[test]
fn subscriptions_made_offline_go_out_on_connect() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    let mut mux = Multiplexer::new(env.clone(), ConnectionConfig::default());
    let topic = room_topic("7", RoomFacet::GameInfo);

    let _sub = mux.subscribe(&topic, Box::new(|_: &InboundMessage| Ok(())));
    assert!(!mux.is_network_subscribed(&topic));

    mux.connect("token");
    broker.pump(&mut mux);
    assert_eq!(broker.subscribe_count(&topic), 1);
    assert!(mux.is_network_subscribed(&topic));
}

#[test]
fn reconnect_resubscribes_each_topic_once() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    let mut mux = connected(&env, &mut broker);
    let received = Arc::new(AtomicUsize::new(0));

    let topics: Vec<String> = RoomFacet::ALL.iter().map(|&f| room_topic("9", f)).collect();
    let _subs: Vec<_> =
        topics.iter().map(|t| mux.subscribe(t, counting_handler(&received))).collect();
    broker.pump(&mut mux);

    broker.drop_link();
    mux.transport_failed("connection reset");
    broker.pump(&mut mux);
    assert_eq!(mux.status(), ConnectionStatus::Disconnected);
    assert!(topics.iter().all(|t| !mux.is_network_subscribed(t)));

    env.advance(ConnectionConfig::default().reconnect_delay);
    mux.tick();
    broker.pump(&mut mux);

    assert_eq!(mux.status(), ConnectionStatus::Connected);
    for topic in &topics {
        assert_eq!(broker.subscribe_count(topic), 2, "{topic}");
    }
    assert_eq!(broker.live_topics().len(), topics.len());

    broker.publish(&topics[0], &fixtures::countdown(3));
    broker.pump(&mut mux);
    assert_eq!(received.load(Ordering::SeqCst), 1);
}

#[test]
fn refused_links_exhaust_retries() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    broker.set_refuse_links(true);
    let config = ConnectionConfig { max_reconnect_attempts: 2, ..ConnectionConfig::default() };
    let mut mux = Multiplexer::new(env.clone(), config.clone());

    mux.connect("token");
    let mut fatal = broker.pump(&mut mux).into_iter().any(|a| matches!(a, MuxAction::Fatal(_)));
    for _ in 0..5 {
        env.advance(config.reconnect_delay);
        mux.tick();
        fatal |= broker.pump(&mut mux).into_iter().any(|a| matches!(a, MuxAction::Fatal(_)));
    }

    assert!(fatal);
    assert!(mux.is_failed());
    assert_eq!(mux.status(), ConnectionStatus::Disconnected);
}

#[test]
fn rejected_connect_counts_as_failure() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    broker.reject_next_connect("invalid token");
    let mut mux = Multiplexer::new(env.clone(), ConnectionConfig::default());

    mux.connect("token");
    let actions = broker.pump(&mut mux);
    assert_eq!(mux.status(), ConnectionStatus::Disconnected);
    assert!(actions.iter().any(|a| matches!(a, MuxAction::ReconnectScheduled { attempt: 1, .. })));

    env.advance(Duration::from_secs(5));
    mux.tick();
    broker.pump(&mut mux);
    assert_eq!(mux.status(), ConnectionStatus::Connected);
}

#[test]
fn chat_sent_while_disconnected_fails_without_traffic() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    let mut mux = Multiplexer::new(env.clone(), ConnectionConfig::default());
    let room = RoomStore::new(LeavePolicy::default());
    let mut chat = ChatPipeline::new("u1", Duration::from_secs(10));

    let id = chat.send_optimistic(&mut mux, "r1", &room, "hello").unwrap();

    assert_eq!(chat.entry(&id).map(|e| e.status), Some(DeliveryStatus::Failed));
    assert!(mux.take_actions().iter().all(|a| !matches!(a, MuxAction::Transmit(_))));
    broker.pump(&mut mux);
    assert!(broker.published().is_empty());
}

#[test]
fn panicking_handler_does_not_starve_the_others() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    let mut mux = connected(&env, &mut broker);
    let topic = room_topic("1", RoomFacet::Chat);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let _bad = mux.subscribe(
        &topic,
        Box::new(|_: &InboundMessage| -> Result<(), HandlerError> { panic!("handler bug") }),
    );
    let sink = Arc::clone(&seen);
    let _good = mux.subscribe(
        &topic,
        Box::new(move |m: &InboundMessage| {
            sink.lock().unwrap().push(m.body.clone());
            Ok(())
        }),
    );
    broker.pump(&mut mux);

    broker.publish(&topic, &fixtures::chat("m1", "u2", "hi", None));
    broker.pump(&mut mux);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn messages_for_a_released_subscription_are_dropped() {
    let env = SimEnv::default();
    let mut broker = SimBroker::new();
    let mut mux = connected(&env, &mut broker);
    let topic = room_topic("7", RoomFacet::GameQuestion);

    let old = mux.subscribe(&topic, Box::new(|_: &InboundMessage| Ok(())));
    broker.pump(&mut mux);
    broker.publish(&topic, &fixtures::question(1, 3, 20));
    let late = broker.take_outbound();

    mux.unsubscribe(old);
    let count = Arc::new(AtomicUsize::new(0));
    let _new = mux.subscribe(&topic, counting_handler(&count));
    broker.pump(&mut mux);

    for text in &late {
        mux.receive(text);
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);

    // Same topic, no subscription header
    let bare = Frame::new(Command::Message)
        .with_header("destination", topic.as_str())
        .with_body("{}");
    mux.receive(&bare.encode());
    assert_eq!(count.load(Ordering::SeqCst), 0);

    broker.publish(&topic, &fixtures::question(2, 3, 20));
    broker.pump(&mut mux);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
