//! Application layer for the quizwire client.
//!
//! A pure session state machine and a generic runtime, so the same
//! orchestration runs in the CLI and in deterministic simulation.
//!
//! # Components
//!
//! - [`Session`]: owns the multiplexer and routes events to the round
//!   machine, chat pipeline and room store
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: generic orchestration loop over a Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod driver;
mod event;
mod runtime;
mod session;
mod state;

pub use action::SessionAction;
pub use driver::{Driver, TransportEvent};
pub use event::SessionEvent;
pub use runtime::{Runtime, SharedResultCache};
pub use session::Session;
pub use state::{SessionSnapshot, TopicState};
