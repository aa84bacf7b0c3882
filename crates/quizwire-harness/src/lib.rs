//! Deterministic simulation harness for quizwire testing.
//!
//! A virtual clock with seeded randomness ([`SimEnv`]) and an in-memory STOMP
//! broker ([`SimBroker`]) stand in for the real world, so the same session
//! code that runs against a live server runs reproducibly in tests.
//!
//! # Two ways to drive a session
//!
//! - [`SimWorld`]: synchronous. Executes every session action in place and
//!   only exposes quiescent states. Suited to property tests.
//! - [`SimDriver`]: implements [`quizwire_app::Driver`], so the production
//!   [`quizwire_app::Runtime`] loop runs unchanged against the simulated
//!   broker.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the session
//! invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fetcher;
pub mod fixtures;
pub mod invariants;
pub mod sim_broker;
pub mod sim_driver;
pub mod sim_env;
pub mod world;

pub use fetcher::ScriptedFetcher;
pub use invariants::{
    BrokerSnapshot, ChatStatusMonotonic, ClientObserver, ClientSnapshot, Invariant,
    InvariantRegistry, InvariantResult, NetworkMatchesHandlers, RoundsIncrease, SystemSnapshot,
    TimerMatchesRound, UniqueRoster, Violation,
};
pub use sim_broker::{Published, SimBroker};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
pub use world::SimWorld;
