//! Wire protocol for quizwire.
//!
//! The broker speaks STOMP 1.2 over a WebSocket. This crate owns the text
//! framing ([`Frame`], [`WireMessage`]), the topic and destination naming
//! convention ([`topic`]), and the JSON payloads carried in frame bodies
//! ([`payloads`]).
//!
//! Nothing here performs I/O. Encoding produces a `String` ready to be written
//! as a WebSocket text message, decoding consumes one.
//!
//! # Event envelope
//!
//! Server broadcasts are wrapped in a tagged envelope
//! (`{"kind": ..., "payload": ...}`) parsed into [`ServerEvent`]. The tag is
//! mandatory: the client never infers an event type from which fields happen
//! to be present.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod frame;
pub mod payloads;
pub mod topic;

pub use errors::{ProtocolError, Result};
pub use frame::{Command, Frame, MAX_FRAME_SIZE, WireMessage};
pub use payloads::{EventKind, ServerEvent};
pub use topic::{PlayerFacet, RoomFacet, TopicAddress};
