//! Optimistic chat pipeline.
//!
//! A message the user sends appears immediately with status
//! [`DeliveryStatus::Sending`] under a fresh correlation id. The server echoes
//! it back carrying the same id, which marks it [`DeliveryStatus::Sent`] and
//! records the server id. A synchronous send failure, a server error naming
//! the id, or the acknowledgement timeout marks it
//! [`DeliveryStatus::Failed`].
//!
//! # Invariants
//!
//! - Exactly one entry per correlation id.
//! - Status only moves `Sending -> Sent` or `Sending -> Failed`. Once settled
//!   an entry is never touched again by later events.
//! - Broadcasts from other authors are always new entries, never reconciled.

use std::{collections::HashMap, ops::Sub, time::Duration};

use quizwire_core::Environment;
use quizwire_proto::{
    payloads::{ChatBroadcast, ChatSend, ServerError},
    topic::destination,
};

use crate::{multiplexer::Multiplexer, room_store::RoomStore};

/// Default time to wait for the server echo before failing a message.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Name shown when an author cannot be resolved.
const UNKNOWN_AUTHOR: &str = "Unknown";

/// Delivery status of a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    /// Sent locally, no server confirmation yet.
    Sending,
    /// Confirmed by the server echo.
    Sent,
    /// Rejected, timed out, or never left the client.
    Failed,
}

impl DeliveryStatus {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_become(self, next: Self) -> bool {
        self == Self::Sending && next != Self::Sending
    }
}

/// One chat message as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    /// Correlation id for own messages.
    pub correlation_id: Option<String>,
    /// Server id once known.
    pub server_id: Option<String>,
    /// Author user id.
    pub author_id: String,
    /// Author display name.
    pub author_name: String,
    /// Message text.
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Delivery status. Always `Sent` for other authors' messages.
    pub status: DeliveryStatus,
}

/// The chat pipeline for one room.
#[derive(Debug)]
pub struct ChatPipeline<I> {
    user_id: String,
    ack_timeout: Duration,
    entries: Vec<ChatEntry>,
    /// Correlation id to (entry index, send time) for unsettled own entries
    pending: HashMap<String, (usize, I)>,
    /// Every correlation id ever issued, settled or not
    issued: HashMap<String, usize>,
    unread: usize,
    open: bool,
}

impl<I> ChatPipeline<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Pipeline for `user_id`.
    pub fn new(user_id: impl Into<String>, ack_timeout: Duration) -> Self {
        Self {
            user_id: user_id.into(),
            ack_timeout,
            entries: Vec::new(),
            pending: HashMap::new(),
            issued: HashMap::new(),
            unread: 0,
            open: false,
        }
    }

    /// Messages in insertion order.
    pub fn messages(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Entry for an own message.
    pub fn entry(&self, correlation_id: &str) -> Option<&ChatEntry> {
        self.issued.get(correlation_id).and_then(|&i| self.entries.get(i))
    }

    /// Messages from others received while the chat view was closed.
    pub fn unread(&self) -> usize {
        self.unread
    }

    /// Open or close the chat view. Opening marks everything read.
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
        if open {
            self.unread = 0;
        }
    }

    /// Append `text` as `Sending` and publish it through `mux`.
    ///
    /// Returns the correlation id, or `None` for blank text. If the
    /// multiplexer refuses the send, the entry is already `Failed` when this
    /// returns.
    pub fn send_optimistic<E>(
        &mut self,
        mux: &mut Multiplexer<E>,
        room_id: &str,
        room: &RoomStore,
        text: &str,
    ) -> Option<String>
    where
        E: Environment<Instant = I>,
    {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let correlation_id = self.fresh_id(mux.env());
        let now = mux.env().now();
        let index = self.entries.len();

        self.entries.push(ChatEntry {
            correlation_id: Some(correlation_id.clone()),
            server_id: None,
            author_id: self.user_id.clone(),
            author_name: resolve_name(room, &self.user_id, None),
            text: text.to_string(),
            timestamp_ms: mux.env().wall_clock_millis(),
            status: DeliveryStatus::Sending,
        });
        self.issued.insert(correlation_id.clone(), index);
        self.pending.insert(correlation_id.clone(), (index, now));

        let body = ChatSend {
            user_id: self.user_id.clone(),
            msg: text.to_string(),
            temp_id: correlation_id.clone(),
        };
        if !mux.send(&destination::chat(room_id), &body) {
            tracing::warn!(%correlation_id, "chat send refused");
            self.settle(&correlation_id, DeliveryStatus::Failed, None);
        }

        Some(correlation_id)
    }

    /// A chat broadcast arrived.
    ///
    /// Own broadcasts carrying a known correlation id reconcile that entry
    /// (once). Everything else becomes a new entry, unless its server id was
    /// already seen.
    pub fn receive(&mut self, message: ChatBroadcast, room: &RoomStore) {
        if message.user_id == self.user_id
            && let Some(temp_id) = message.temp_id.as_deref()
            && self.issued.contains_key(temp_id)
        {
            if !self.settle(temp_id, DeliveryStatus::Sent, message.id.clone()) {
                tracing::debug!(temp_id, "echo for settled message ignored");
            }
            return;
        }

        if let Some(id) = &message.id
            && self.entries.iter().any(|e| e.server_id.as_ref() == Some(id))
        {
            tracing::debug!(server_id = %id, "duplicate chat broadcast ignored");
            return;
        }

        let from_other = message.user_id != self.user_id;
        self.entries.push(ChatEntry {
            correlation_id: None,
            server_id: message.id,
            author_name: resolve_name(room, &message.user_id, message.user_name.as_deref()),
            author_id: message.user_id,
            text: message.msg,
            timestamp_ms: message.timestamp.unwrap_or_default(),
            status: DeliveryStatus::Sent,
        });
        if from_other && !self.open {
            self.unread += 1;
        }
    }

    /// The server rejected a send. Marks the matching own entry `Failed`.
    pub fn reject(&mut self, error: &ServerError) {
        let Some(temp_id) = error.temp_id.as_deref() else {
            return;
        };
        tracing::warn!(temp_id, message = %error.message, "chat message rejected");
        self.settle(temp_id, DeliveryStatus::Failed, None);
    }

    /// Fail entries still `Sending` after the acknowledgement timeout.
    ///
    /// Returns whether any entry expired.
    pub fn tick(&mut self, now: I) -> bool {
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, (_, sent_at))| now - *sent_at >= self.ack_timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            tracing::warn!(correlation_id = %id, "chat message not acknowledged in time");
            self.settle(id, DeliveryStatus::Failed, None);
        }
        !expired.is_empty()
    }

    /// Drop every message (room left).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
        self.issued.clear();
        self.unread = 0;
    }

    /// Move a pending entry to a settled status. Returns false if the entry
    /// was already settled or never existed.
    fn settle(
        &mut self,
        correlation_id: &str,
        status: DeliveryStatus,
        server_id: Option<String>,
    ) -> bool {
        let Some((index, _)) = self.pending.remove(correlation_id) else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        if !entry.status.can_become(status) {
            return false;
        }
        entry.status = status;
        if server_id.is_some() {
            entry.server_id = server_id;
        }
        true
    }

    fn fresh_id<E: Environment>(&self, env: &E) -> String {
        loop {
            let id = format!("{:016x}", env.random_u64());
            if !self.issued.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Display name for `user_id`: room roster first, then the name the server
/// sent, then a placeholder.
fn resolve_name(room: &RoomStore, user_id: &str, fallback: Option<&str>) -> String {
    room.player(user_id)
        .map(|p| p.name.clone())
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}
