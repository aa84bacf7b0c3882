//! Generic runtime for session orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`Session`]: connection, room, round and chat state
//! - [`Driver`]: platform-specific I/O
//! - [`ResultCache`]: final results, fetched once per room
//!
//! Result fetches run as spawned tasks. Their outcomes are collected at the
//! start of each step, so a slow fetch never stalls ticks, socket reads or
//! user input.

use std::{collections::VecDeque, sync::Arc};

use quizwire_client::{FetchError, ResultCache, ResultFetcher, RoomResults};
use quizwire_core::Environment;
use tokio::task::JoinSet;

use crate::{Driver, Session, SessionAction, SessionEvent, TransportEvent};

/// Shared result cache handed to the runtime.
pub type SharedResultCache<E> = ResultCache<Arc<dyn ResultFetcher>, E>;

/// Generic runtime that orchestrates a Session and a Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and randomness
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    session: Session<E>,
    credential: String,
    results: Option<Arc<SharedResultCache<E>>>,
    fetches: JoinSet<(String, Result<RoomResults, FetchError>)>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a runtime that connects with `credential` when run.
    pub fn new(driver: D, session: Session<E>, credential: impl Into<String>) -> Self {
        Self {
            driver,
            session,
            credential: credential.into(),
            results: None,
            fetches: JoinSet::new(),
        }
    }

    /// Fetch final results through `cache` when a match ends.
    #[must_use]
    pub fn with_results(mut self, cache: SharedResultCache<E>) -> Self {
        self.results = Some(Arc::new(cache));
        self
    }

    /// Run the main event loop until the session quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    pub async fn run(mut self) -> Result<(), D::Error> {
        let credential = self.credential.clone();
        if !self.dispatch(SessionEvent::Connect { credential }).await? {
            loop {
                if self.step().await? {
                    break;
                }
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Process one cycle: finished fetches, one user event, one transport
    /// event, one tick.
    ///
    /// Returns `true` if the session asked to quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        while let Some(joined) = self.fetches.try_join_next() {
            let (room_code, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "result fetch task failed");
                    continue;
                },
            };
            if self.dispatch(SessionEvent::ResultsFetched { room_code, result }).await? {
                return Ok(true);
            }
        }

        if let Some(event) = self.driver.poll_event().await?
            && self.dispatch(event).await?
        {
            return Ok(true);
        }

        if let Some(incoming) = self.driver.recv_event().await {
            let event = match incoming {
                TransportEvent::Text(text) => SessionEvent::Wire(text),
                TransportEvent::Closed { reason } => SessionEvent::TransportFailed { reason },
            };
            if self.dispatch(event).await? {
                return Ok(true);
            }
        }

        self.dispatch(SessionEvent::Tick).await
    }

    /// Feed one event to the session and execute every resulting action.
    ///
    /// Returns `true` if the session asked to quit.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Result<bool, D::Error> {
        let mut pending = VecDeque::from(self.session.handle(event));

        while let Some(action) = pending.pop_front() {
            match action {
                SessionAction::OpenTransport => {
                    let event = match self.driver.open_transport().await {
                        Ok(()) => SessionEvent::TransportOpened,
                        Err(e) => SessionEvent::TransportFailed { reason: e.to_string() },
                    };
                    pending.extend(self.session.handle(event));
                },
                SessionAction::CloseTransport => self.driver.close_transport(),
                SessionAction::Send(text) => {
                    if let Err(e) = self.driver.send_text(text).await {
                        tracing::warn!(error = %e, "transport write failed");
                        let event = SessionEvent::TransportFailed { reason: e.to_string() };
                        pending.extend(self.session.handle(event));
                    }
                },
                SessionAction::FetchResults { room_code } => {
                    let Some(cache) = self.results.clone() else {
                        continue;
                    };
                    let user_id = self.session.user_id().to_string();
                    self.fetches.spawn(async move {
                        let result = cache.fetch_or_get(&room_code, &user_id).await;
                        (room_code, result)
                    });
                },
                SessionAction::Render => self.driver.render(&self.session.snapshot())?,
                SessionAction::Quit => return Ok(true),
            }
        }
        Ok(false)
    }

    /// Number of result fetches still running.
    pub fn fetches_in_flight(&self) -> usize {
        self.fetches.len()
    }

    /// The session.
    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
