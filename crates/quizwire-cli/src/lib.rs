//! Terminal client for live quiz rooms.
//!
//! A thin shell over [`quizwire_app::Driver`] that reads commands from stdin
//! and writes what changed to stdout. All orchestration lives in the generic
//! [`quizwire_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod driver;
pub mod render;

pub use command::{Command, CommandError};
pub use driver::{LineDriver, LineError};
pub use render::Renderer;
