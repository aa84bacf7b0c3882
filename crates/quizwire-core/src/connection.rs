//! Broker session state machine.
//!
//! Manages the lifecycle of the single broker connection: opening the
//! transport, the CONNECT/CONNECTED handshake, heartbeats, fixed-delay
//! reconnects and the terminal give-up after the retry cap. Uses the action
//! pattern: methods take time as input and return actions for the driver to
//! execute.
//!
//! # State Machine
//!
//! ```text
//!                   connect()             CONNECTED
//! ┌──────────────┐ ──────────> ┌────────────┐ ──────────> ┌───────────┐
//! │ Disconnected │             │ Connecting │             │ Connected │
//! └──────────────┘ <────────── └────────────┘             └───────────┘
//!        ↑  │     failure / timeout                             │
//!        │  │ reconnect_delay elapsed                           │ failure /
//!        │  └────────────────────> Connecting                   │ heartbeat
//!        └──────────────────────────────────────────────────────┘ timeout
//! ```
//!
//! After `max_reconnect_attempts` consecutive failures the connection stays
//! `Disconnected` with the terminal failed flag set until the caller invokes
//! [`Connection::connect`] again.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use quizwire_proto::{Command, Frame, WireMessage};
use serde::{Deserialize, Serialize};

use crate::error::ConnectionError;

/// Fixed delay between a failure and the next reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Consecutive reconnect attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Heartbeat interval offered in both directions.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(4);

/// Missed incoming heartbeat intervals tolerated before declaring the link dead.
pub const DEFAULT_HEARTBEAT_TOLERANCE: u32 = 2;

/// Time allowed from opening the transport to receiving CONNECTED.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a new transport to the broker and call
    /// [`Connection::transport_opened`] once it is up
    OpenTransport,

    /// Close the current transport, if any
    CloseTransport,

    /// Send this frame to the broker
    SendFrame(Frame),

    /// Send an end-of-line heartbeat
    SendHeartbeat,

    /// Session is up. Network subscriptions must be re-established before
    /// anything else observes the connected status.
    Established,

    /// The link went down. Every network subscription is gone.
    Lost {
        /// Why the link went down
        error: ConnectionError,
    },

    /// A reconnect attempt will start after `delay`
    ReconnectScheduled {
        /// 1-based attempt number
        attempt: u32,
        /// Delay before the attempt
        delay: Duration,
    },

    /// Retry cap reached. No further automatic reconnects.
    Failed {
        /// Terminal error
        error: ConnectionError,
    },

    /// The session belonging to the previous credential ended for good.
    /// Local subscriptions made under it are discarded.
    SessionReset,
}

/// Connection status as shown to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No session. Possibly waiting for a scheduled reconnect.
    Disconnected,
    /// Transport opening or CONNECT sent, waiting for CONNECTED
    Connecting,
    /// Session established
    Connected,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Fixed delay before each reconnect attempt (milliseconds in config files)
    #[serde(with = "crate::duration_ms")]
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts tolerated before giving up
    pub max_reconnect_attempts: u32,
    /// Interval we promise to send heartbeats at. Zero disables.
    #[serde(with = "crate::duration_ms")]
    pub heartbeat_outgoing: Duration,
    /// Interval we want the broker to send heartbeats at. Zero disables.
    #[serde(with = "crate::duration_ms")]
    pub heartbeat_incoming: Duration,
    /// Multiple of the incoming interval the broker may stay silent for
    pub heartbeat_tolerance: u32,
    /// Time allowed for CONNECTED to arrive after a transport opens
    #[serde(with = "crate::duration_ms")]
    pub connect_timeout: Duration,
    /// Virtual host sent in the CONNECT frame
    pub host: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_outgoing: DEFAULT_HEARTBEAT,
            heartbeat_incoming: DEFAULT_HEARTBEAT,
            heartbeat_tolerance: DEFAULT_HEARTBEAT_TOLERANCE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            host: "/".to_string(),
        }
    }
}

/// Heartbeat intervals agreed with the broker. `None` disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiatedHeartbeat {
    /// How often we must send
    pub outgoing: Option<Duration>,
    /// How often the broker will send
    pub incoming: Option<Duration>,
}

impl NegotiatedHeartbeat {
    /// Apply STOMP negotiation: each direction uses the larger of the two
    /// offers, and is disabled if either side offers zero.
    pub fn negotiate(config: &ConnectionConfig, server: (u64, u64)) -> Self {
        let (server_sends, server_wants) = server;
        Self {
            outgoing: pick(config.heartbeat_outgoing, server_wants),
            incoming: pick(config.heartbeat_incoming, server_sends),
        }
    }
}

fn pick(ours: Duration, theirs_ms: u64) -> Option<Duration> {
    if ours.is_zero() || theirs_ms == 0 {
        return None;
    }
    Some(ours.max(Duration::from_millis(theirs_ms)))
}

/// Broker connection state machine
///
/// One instance per provider scope. Owns the credential, the status, the
/// retry counter and heartbeat timing. Pure: no I/O, time is passed in.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: ConnectionConfig,
    status: ConnectionStatus,
    credential: Option<String>,
    /// Consecutive failures since the last successful CONNECTED
    failures: u32,
    /// Terminal give-up flag
    failed: bool,
    /// Whether a transport is believed open
    transport_open: bool,
    /// When the current connect attempt began
    attempt_started: Option<I>,
    /// When the last failure happened, while a reconnect is pending
    reconnect_from: Option<I>,
    heartbeat: NegotiatedHeartbeat,
    last_received: Option<I>,
    last_sent: Option<I>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a connection in [`ConnectionStatus::Disconnected`] with no
    /// credential.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            status: ConnectionStatus::Disconnected,
            credential: None,
            failures: 0,
            failed: false,
            transport_open: false,
            attempt_started: None,
            reconnect_from: None,
            heartbeat: NegotiatedHeartbeat::default(),
            last_received: None,
            last_sent: None,
        }
    }

    /// Current status
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// True once the retry cap was exceeded and no reconnect will happen.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Consecutive failures since the last successful session.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Credential of the current or last session.
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Heartbeat intervals in effect. Both `None` unless connected.
    pub fn heartbeat(&self) -> NegotiatedHeartbeat {
        self.heartbeat
    }

    /// Configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// True while a reconnect attempt is waiting for its delay to elapse.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_from.is_some()
    }

    /// Start (or keep) a session for `credential`.
    ///
    /// Idempotent for the credential already in use: while connecting,
    /// connected or waiting to reconnect this returns no actions, so
    /// concurrent callers collapse into one attempt. A different credential
    /// first tears down the old session. After a terminal failure the same
    /// credential re-initiates with a fresh retry budget.
    pub fn connect(&mut self, credential: &str, now: I) -> Vec<ConnectionAction> {
        let same = self.credential.as_deref() == Some(credential);
        let active = self.status != ConnectionStatus::Disconnected || self.reconnect_pending();

        if same && active {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if !same && self.credential.is_some() {
            tracing::info!("credential changed, tearing down previous session");
            actions.extend(self.teardown());
        }

        self.credential = Some(credential.to_string());
        self.failed = false;
        self.failures = 0;
        actions.extend(self.begin_attempt(now));
        actions
    }

    /// Explicit teardown (provider unmount). Forgets the credential.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        if self.credential.is_none() && self.status == ConnectionStatus::Disconnected {
            return Vec::new();
        }
        let actions = self.teardown();
        self.credential = None;
        self.failed = false;
        self.failures = 0;
        actions
    }

    /// The transport requested by [`ConnectionAction::OpenTransport`] is up.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if no connect attempt is in progress
    pub fn transport_opened(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        let Some(credential) = self.credential.as_deref() else {
            return Err(self.invalid("transport_opened"));
        };
        if self.status != ConnectionStatus::Connecting || self.transport_open {
            return Err(self.invalid("transport_opened"));
        }

        self.transport_open = true;
        self.last_sent = Some(now);

        let frame = Frame::connect(
            credential,
            &self.config.host,
            (millis(self.config.heartbeat_outgoing), millis(self.config.heartbeat_incoming)),
        );
        Ok(vec![ConnectionAction::SendFrame(frame)])
    }

    /// The transport failed or closed underneath us.
    ///
    /// Ignored when no session is wanted (after [`Connection::disconnect`])
    /// or while already waiting for a reconnect.
    pub fn transport_failed(&mut self, reason: &str, now: I) -> Vec<ConnectionAction> {
        if self.credential.is_none() || self.status == ConnectionStatus::Disconnected {
            return Vec::new();
        }
        self.fail(ConnectionError::Transport(reason.to_string()), now)
    }

    /// Process one inbound wire message.
    ///
    /// Returns actions for session-level frames (CONNECTED, ERROR). MESSAGE
    /// and RECEIPT frames produce no actions; routing them is the caller's
    /// job once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::UnexpectedFrame` if the frame is not valid for the
    ///   current status
    pub fn handle_message(
        &mut self,
        message: &WireMessage,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        self.last_received = Some(now);

        let frame = match message {
            WireMessage::Heartbeat => return Ok(Vec::new()),
            WireMessage::Frame(frame) => frame,
        };

        match (self.status, frame.command) {
            (ConnectionStatus::Connecting, Command::Connected) if self.transport_open => {
                self.heartbeat = NegotiatedHeartbeat::negotiate(&self.config, frame.heartbeat());
                self.status = ConnectionStatus::Connected;
                self.failures = 0;
                self.attempt_started = None;
                tracing::info!(heartbeat = ?self.heartbeat, "broker session established");
                Ok(vec![ConnectionAction::Established])
            },

            (ConnectionStatus::Connecting | ConnectionStatus::Connected, Command::Error) => {
                let reason = frame.header("message").unwrap_or("unspecified").to_string();
                tracing::warn!(%reason, "broker sent ERROR");
                Ok(self.fail(ConnectionError::Rejected(reason), now))
            },

            (ConnectionStatus::Connected, Command::Message | Command::Receipt) => Ok(Vec::new()),

            (status, command) => Err(ConnectionError::UnexpectedFrame { status, command }),
        }
    }

    /// Record that something was written to the transport.
    pub fn note_sent(&mut self, now: I) {
        self.last_sent = Some(now);
    }

    /// Process periodic maintenance: connect timeout, due reconnects,
    /// heartbeat liveness and outgoing heartbeats.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.status {
            ConnectionStatus::Connecting => {
                if let Some(started) = self.attempt_started {
                    let elapsed = now - started;
                    if elapsed > self.config.connect_timeout {
                        return self.fail(ConnectionError::ConnectTimeout { elapsed }, now);
                    }
                }
                Vec::new()
            },

            ConnectionStatus::Disconnected => match self.reconnect_from {
                Some(since) if !self.failed && now - since >= self.config.reconnect_delay => {
                    tracing::info!(attempt = self.failures, "reconnecting");
                    self.begin_attempt(now)
                },
                _ => Vec::new(),
            },

            ConnectionStatus::Connected => {
                if let (Some(interval), Some(last)) = (self.heartbeat.incoming, self.last_received)
                {
                    let silence = now - last;
                    if silence > interval * self.config.heartbeat_tolerance {
                        return self
                            .fail(ConnectionError::HeartbeatTimeout { elapsed: silence }, now);
                    }
                }

                match (self.heartbeat.outgoing, self.last_sent) {
                    (Some(interval), Some(last)) if now - last >= interval => {
                        self.last_sent = Some(now);
                        vec![ConnectionAction::SendHeartbeat]
                    },
                    _ => Vec::new(),
                }
            },
        }
    }

    fn begin_attempt(&mut self, now: I) -> Vec<ConnectionAction> {
        self.status = ConnectionStatus::Connecting;
        self.attempt_started = Some(now);
        self.reconnect_from = None;
        self.transport_open = false;
        self.last_received = Some(now);
        vec![ConnectionAction::OpenTransport]
    }

    /// Drop the link and either schedule a reconnect or give up.
    fn fail(&mut self, error: ConnectionError, now: I) -> Vec<ConnectionAction> {
        let was_connected = self.status == ConnectionStatus::Connected;
        self.status = ConnectionStatus::Disconnected;
        self.transport_open = false;
        self.attempt_started = None;
        self.heartbeat = NegotiatedHeartbeat::default();
        self.failures += 1;

        tracing::warn!(%error, failures = self.failures, was_connected, "connection lost");

        let mut actions = vec![ConnectionAction::CloseTransport, ConnectionAction::Lost {
            error: error.clone(),
        }];

        if self.failures > self.config.max_reconnect_attempts {
            self.failed = true;
            self.reconnect_from = None;
            let attempts = self.config.max_reconnect_attempts;
            tracing::error!(attempts, "reconnect attempts exhausted");
            actions.push(ConnectionAction::Failed {
                error: ConnectionError::RetriesExhausted { attempts },
            });
        } else {
            self.reconnect_from = Some(now);
            actions.push(ConnectionAction::ReconnectScheduled {
                attempt: self.failures,
                delay: self.config.reconnect_delay,
            });
        }
        actions
    }

    /// End the current session without scheduling anything.
    fn teardown(&mut self) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.status == ConnectionStatus::Connected {
            actions.push(ConnectionAction::SendFrame(Frame::disconnect()));
        }
        if self.status != ConnectionStatus::Disconnected || self.transport_open {
            actions.push(ConnectionAction::CloseTransport);
        }
        actions.push(ConnectionAction::SessionReset);

        self.status = ConnectionStatus::Disconnected;
        self.transport_open = false;
        self.attempt_started = None;
        self.reconnect_from = None;
        self.heartbeat = NegotiatedHeartbeat::default();
        actions
    }

    fn invalid(&self, operation: &'static str) -> ConnectionError {
        ConnectionError::InvalidState { status: self.status, operation }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Conn = Connection<Duration>;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn connected_frame(hb: &str) -> WireMessage {
        WireMessage::Frame(
            Frame::new(Command::Connected)
                .with_header("version", "1.2")
                .with_header("heart-beat", hb),
        )
    }

    fn establish(conn: &mut Conn, now: Duration) {
        conn.connect("token", now);
        conn.transport_opened(now).unwrap();
        let actions = conn.handle_message(&connected_frame("4000,4000"), now).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Established]);
    }

    #[test]
    fn connect_opens_transport_then_sends_connect_frame() {
        let mut conn = Conn::new(ConnectionConfig::default());
        assert_eq!(conn.connect("token", secs(0)), vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.status(), ConnectionStatus::Connecting);

        let actions = conn.transport_opened(secs(0)).unwrap();
        let [ConnectionAction::SendFrame(frame)] = actions.as_slice() else {
            panic!("expected CONNECT, got {actions:?}");
        };
        assert_eq!(frame.command, Command::Connect);
        assert_eq!(frame.header("Authorization"), Some("Bearer token"));
        assert_eq!(frame.header("heart-beat"), Some("4000,4000"));
    }

    #[test]
    fn repeated_connect_with_same_credential_is_noop() {
        let mut conn = Conn::new(ConnectionConfig::default());
        conn.connect("token", secs(0));
        assert!(conn.connect("token", secs(0)).is_empty());

        conn.transport_opened(secs(0)).unwrap();
        conn.handle_message(&connected_frame("0,0"), secs(1)).unwrap();
        assert!(conn.connect("token", secs(2)).is_empty());
    }

    #[test]
    fn credential_change_tears_down_first() {
        let mut conn = Conn::new(ConnectionConfig::default());
        establish(&mut conn, secs(0));

        let actions = conn.connect("other", secs(1));
        assert_eq!(actions, vec![
            ConnectionAction::SendFrame(Frame::disconnect()),
            ConnectionAction::CloseTransport,
            ConnectionAction::SessionReset,
            ConnectionAction::OpenTransport,
        ]);
        assert_eq!(conn.credential(), Some("other"));
    }

    #[test]
    fn heartbeat_negotiation_takes_larger_interval() {
        let config = ConnectionConfig::default();
        let hb = NegotiatedHeartbeat::negotiate(&config, (10_000, 1_000));
        assert_eq!(hb.outgoing, Some(secs(4)));
        assert_eq!(hb.incoming, Some(secs(10)));

        let off = NegotiatedHeartbeat::negotiate(&config, (0, 0));
        assert_eq!(off, NegotiatedHeartbeat::default());
    }

    #[test]
    fn outgoing_heartbeat_after_interval() {
        let mut conn = Conn::new(ConnectionConfig::default());
        establish(&mut conn, secs(0));

        assert!(conn.tick(secs(3)).is_empty());
        conn.handle_message(&WireMessage::Heartbeat, secs(3)).unwrap();
        assert_eq!(conn.tick(secs(4)), vec![ConnectionAction::SendHeartbeat]);
        assert!(conn.tick(secs(5)).is_empty());
    }

    #[test]
    fn silent_broker_triggers_reconnect() {
        let mut conn = Conn::new(ConnectionConfig::default());
        establish(&mut conn, secs(0));
        conn.note_sent(secs(9));

        let actions = conn.tick(secs(9));
        assert_eq!(actions[0], ConnectionAction::CloseTransport);
        assert!(matches!(
            &actions[1],
            ConnectionAction::Lost { error: ConnectionError::HeartbeatTimeout { .. } }
        ));
        assert_eq!(actions[2], ConnectionAction::ReconnectScheduled { attempt: 1, delay: secs(5) });
        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn reconnect_waits_fixed_delay() {
        let mut conn = Conn::new(ConnectionConfig::default());
        establish(&mut conn, secs(0));
        conn.transport_failed("reset", secs(1));

        assert!(conn.tick(secs(5)).is_empty());
        assert_eq!(conn.tick(secs(6)), vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn gives_up_after_retry_cap() {
        let config = ConnectionConfig { max_reconnect_attempts: 2, ..ConnectionConfig::default() };
        let mut conn = Conn::new(config);
        conn.connect("token", secs(0));

        let mut now = secs(0);
        for attempt in 1..=2 {
            let actions = conn.transport_failed("refused", now);
            assert!(actions.contains(&ConnectionAction::ReconnectScheduled {
                attempt,
                delay: secs(5)
            }));
            now += secs(5);
            assert_eq!(conn.tick(now), vec![ConnectionAction::OpenTransport]);
        }

        let actions = conn.transport_failed("refused", now);
        assert!(actions.contains(&ConnectionAction::Failed {
            error: ConnectionError::RetriesExhausted { attempts: 2 }
        }));
        assert!(conn.is_failed());
        assert!(conn.tick(now + secs(60)).is_empty());

        // Manual re-initiation restores the budget
        assert_eq!(conn.connect("token", now + secs(61)), vec![ConnectionAction::OpenTransport]);
        assert!(!conn.is_failed());
    }

    #[test]
    fn successful_session_resets_retry_counter() {
        let mut conn = Conn::new(ConnectionConfig::default());
        conn.connect("token", secs(0));
        conn.transport_failed("refused", secs(0));
        conn.tick(secs(5));
        assert_eq!(conn.failures(), 1);

        conn.transport_opened(secs(5)).unwrap();
        conn.handle_message(&connected_frame("0,0"), secs(5)).unwrap();
        assert_eq!(conn.failures(), 0);
    }

    #[test]
    fn connect_timeout_counts_as_failure() {
        let mut conn = Conn::new(ConnectionConfig::default());
        conn.connect("token", secs(0));
        conn.transport_opened(secs(0)).unwrap();

        assert!(conn.tick(secs(10)).is_empty());
        let actions = conn.tick(secs(11));
        assert!(matches!(
            &actions[1],
            ConnectionAction::Lost { error: ConnectionError::ConnectTimeout { .. } }
        ));
    }

    #[test]
    fn error_frame_is_a_failure() {
        let mut conn = Conn::new(ConnectionConfig::default());
        conn.connect("token", secs(0));
        conn.transport_opened(secs(0)).unwrap();

        let error = WireMessage::Frame(Frame::new(Command::Error).with_header("message", "denied"));
        let actions = conn.handle_message(&error, secs(1)).unwrap();
        assert!(actions.contains(&ConnectionAction::Lost {
            error: ConnectionError::Rejected("denied".into())
        }));
    }

    #[test]
    fn message_before_connected_is_unexpected() {
        let mut conn = Conn::new(ConnectionConfig::default());
        conn.connect("token", secs(0));
        let msg = WireMessage::Frame(Frame::new(Command::Message));
        assert!(matches!(
            conn.handle_message(&msg, secs(0)),
            Err(ConnectionError::UnexpectedFrame { command: Command::Message, .. })
        ));
    }

    #[test]
    fn transport_opened_requires_attempt() {
        let mut conn = Conn::new(ConnectionConfig::default());
        assert!(matches!(
            conn.transport_opened(secs(0)),
            Err(ConnectionError::InvalidState { operation: "transport_opened", .. })
        ));
    }

    #[test]
    fn disconnect_is_quiet_and_final() {
        let mut conn = Conn::new(ConnectionConfig::default());
        establish(&mut conn, secs(0));

        let actions = conn.disconnect();
        assert_eq!(actions.last(), Some(&ConnectionAction::SessionReset));
        assert!(conn.transport_failed("closed", secs(1)).is_empty());
        assert!(conn.tick(secs(30)).is_empty());
        assert!(conn.disconnect().is_empty());
    }

    #[test]
    fn config_deserializes_millis_with_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"reconnect_delay":2500,"max_reconnect_attempts":3}"#)
                .unwrap();
        assert_eq!(config.reconnect_delay, Duration::from_millis(2500));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.heartbeat_outgoing, DEFAULT_HEARTBEAT);
    }
}
