//! Result fetcher answering from a script.

#![allow(clippy::disallowed_types, reason = "Synchronous script lookups only")]

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use quizwire_client::{FetchError, ResultFetcher};
use quizwire_proto::payloads::PlayerResult;

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, Result<Vec<PlayerResult>, FetchError>>,
    calls: HashMap<String, usize>,
}

/// Answers each room code with a scripted response and counts the calls.
///
/// Unscripted room codes answer with status 404.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    script: Mutex<Script>,
}

impl ScriptedFetcher {
    /// Fetcher with no scripted rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `room_code` with `players`.
    #[must_use]
    pub fn with_results(self, room_code: &str, players: Vec<PlayerResult>) -> Self {
        self.lock().responses.insert(room_code.to_string(), Ok(players));
        self
    }

    /// Answer `room_code` with `error`.
    #[must_use]
    pub fn with_error(self, room_code: &str, error: FetchError) -> Self {
        self.lock().responses.insert(room_code.to_string(), Err(error));
        self
    }

    /// Number of fetches made for `room_code`.
    pub fn calls(&self, room_code: &str) -> usize {
        self.lock().calls.get(room_code).copied().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ResultFetcher for ScriptedFetcher {
    async fn fetch(&self, room_code: &str) -> Result<Vec<PlayerResult>, FetchError> {
        let mut script = self.lock();
        *script.calls.entry(room_code.to_string()).or_default() += 1;
        script.responses.get(room_code).cloned().unwrap_or(Err(FetchError::Status { status: 404 }))
    }
}
