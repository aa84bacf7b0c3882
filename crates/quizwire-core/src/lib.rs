//! Sans-IO building blocks for the quizwire client.
//!
//! Everything in this crate is a pure state machine: methods take the current
//! time as input and return actions for a driver to execute. Nothing here
//! opens sockets, spawns tasks or reads the clock.
//!
//! # Components
//!
//! - [`Environment`]: time and randomness, swapped for a simulated one in tests
//! - [`Connection`]: broker session lifecycle, fixed-delay reconnect with a
//!   retry cap, STOMP heart-beat negotiation and liveness checks
//! - [`TopicRegistry`]: reference-counted topic subscriptions, exactly one
//!   network subscription per topic with live handlers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod duration_ms;
pub mod env;
pub mod error;
pub mod registry;

pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionStatus};
pub use env::Environment;
pub use error::ConnectionError;
pub use registry::{HandlerId, RegistryAction, TopicRegistry};
