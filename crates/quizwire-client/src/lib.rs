//! Client sync layer for live multiplayer quiz rooms.
//!
//! Everything a quiz client needs between the broker socket and the UI:
//! one shared connection with reference-counted topic subscriptions, the
//! per-round game state machine, optimistic chat, the room roster and a
//! bounded cache of finished-match results.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO pattern as [`quizwire_core`]. The
//! [`Multiplexer`] consumes socket text and clock ticks and queues
//! [`MuxAction`]s for a driver to execute. The [`RoundMachine`] consumes
//! server events and timer firings and returns [`RoundAction`]s. Nothing in
//! the default build touches the network.
//!
//! # Components
//!
//! - [`Multiplexer`]: one broker connection shared by many subscribers
//! - [`RoundMachine`]: countdown, question, result and final-results states
//! - [`ChatPipeline`]: optimistic chat with server reconciliation
//! - [`RoomStore`]: the single writer of room and roster state
//! - [`ResultCache`]: FIFO-bounded, fetch-once cache of room results
//! - [`ClientConfig`]: configuration for all of the above
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: open a WebSocket bridged to channels
//! - [`SystemEnv`]: real clock and OS randomness
//! - [`HttpResultFetcher`]: results endpoint over HTTPS

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chat;
mod config;
mod error;
mod event;
mod multiplexer;
pub mod result_cache;
pub mod room_store;
pub mod round;

#[cfg(feature = "transport")]
mod http;
#[cfg(feature = "transport")]
mod system_env;
#[cfg(feature = "transport")]
pub mod transport;

#[cfg(test)]
mod test_env;

pub use chat::{ChatEntry, ChatPipeline, DeliveryStatus};
pub use config::ClientConfig;
pub use error::{ClientError, FetchError, HandlerError};
pub use event::{InboundMessage, MuxAction};
#[cfg(feature = "transport")]
pub use http::HttpResultFetcher;
pub use multiplexer::{Handler, Multiplexer, Subscription};
pub use quizwire_core::{ConnectionConfig, ConnectionStatus, Environment};
pub use result_cache::{ResultCache, ResultFetcher, RoomResults};
pub use room_store::{LeavePolicy, Room, RoomPatch, RoomPlayer, RoomStore, RoomUpdate};
pub use round::{RoundAction, RoundMachine, RoundSnapshot, RoundState, TimerToken};
#[cfg(feature = "transport")]
pub use system_env::SystemEnv;
