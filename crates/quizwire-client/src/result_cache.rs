//! Bounded cache of finished-match results.
//!
//! Results of a finished room never change, so each room code is fetched at
//! most once. The cache keeps the last `capacity` room codes in insertion
//! order and evicts the oldest insert when full, regardless of how recently
//! an entry was read.
//!
//! # Invariants
//!
//! - `order` and `entries` always hold the same set of room codes
//! - `order.len() <= capacity`
//! - A room code is in `loading` only while its fetch is outstanding
//! - Failed fetches (including timeouts) leave no entry behind
//! - A fetch started before `clear_all` never inserts after it

#![allow(clippy::disallowed_types, reason = "Lock is never held across an await point")]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use quizwire_core::Environment;
use quizwire_proto::payloads::PlayerResult;

use crate::error::{ClientError, FetchError};

/// Default number of rooms kept.
pub const DEFAULT_CAPACITY: usize = 5;

/// Default limit on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of ranked results for a finished room.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    /// Ranked results for `room_code`, best first.
    async fn fetch(&self, room_code: &str) -> Result<Vec<PlayerResult>, FetchError>;
}

#[async_trait]
impl<T: ResultFetcher + ?Sized> ResultFetcher for Arc<T> {
    async fn fetch(&self, room_code: &str) -> Result<Vec<PlayerResult>, FetchError> {
        (**self).fetch(room_code).await
    }
}

/// Cached results of one room, with the current user's placement.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomResults {
    /// Room code the results belong to.
    pub room_code: String,
    /// Ranked players, best first.
    pub players: Vec<PlayerResult>,
    /// 1-based rank of the requesting user, if they played.
    pub user_rank: Option<usize>,
    /// The requesting user's entry, if they played.
    pub current_user: Option<PlayerResult>,
    /// Wall-clock milliseconds when the fetch completed.
    pub fetched_at_ms: u64,
}

impl RoomResults {
    fn rank(
        room_code: &str,
        players: Vec<PlayerResult>,
        user_id: &str,
        fetched_at_ms: u64,
    ) -> Self {
        let index = players.iter().position(|p| p.id == user_id);
        Self {
            room_code: room_code.to_string(),
            current_user: index.and_then(|i| players.get(i).cloned()),
            user_rank: index.map(|i| i + 1),
            players,
            fetched_at_ms,
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, RoomResults>,
    order: VecDeque<String>,
    loading: HashSet<String>,
    generation: u64,
}

/// FIFO-bounded result cache.
///
/// Safe to share between tasks. The internal lock is never held across an
/// await point.
pub struct ResultCache<F, E> {
    fetcher: F,
    env: E,
    capacity: usize,
    timeout: Duration,
    state: Mutex<CacheState>,
}

impl<F: ResultFetcher, E: Environment> ResultCache<F, E> {
    /// Create an empty cache.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidConfig` if `capacity` is zero or `timeout` is
    ///   zero
    pub fn new(
        fetcher: F,
        env: E,
        capacity: usize,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        if capacity == 0 {
            return Err(ClientError::InvalidConfig(
                "result cache capacity must be at least 1".into(),
            ));
        }
        if timeout.is_zero() {
            return Err(ClientError::InvalidConfig("fetch timeout must be positive".into()));
        }
        Ok(Self { fetcher, env, capacity, timeout, state: Mutex::new(CacheState::default()) })
    }

    /// Maximum number of rooms kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rooms cached.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Whether any fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        !self.lock().loading.is_empty()
    }

    /// Cached results for `room_code`, without fetching.
    pub fn get(&self, room_code: &str) -> Option<RoomResults> {
        self.lock().entries.get(room_code).cloned()
    }

    /// Cached room codes, oldest insert first.
    pub fn codes(&self) -> Vec<String> {
        self.lock().order.iter().cloned().collect()
    }

    /// Drop every entry and disown fetches still in flight.
    pub fn clear_all(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
        state.loading.clear();
        state.generation += 1;
    }

    /// Cached results for `room_code`, fetching them once if absent.
    ///
    /// The user's rank is computed from the fetched list at insert time, so
    /// a cached entry reflects whichever `user_id` first requested it.
    ///
    /// # Errors
    ///
    /// - `FetchError::InProgress` if a fetch for the same code is outstanding
    /// - `FetchError::Timeout` if the fetcher did not answer in time
    /// - Any error the fetcher returns
    pub async fn fetch_or_get(
        &self,
        room_code: &str,
        user_id: &str,
    ) -> Result<RoomResults, FetchError> {
        let generation = {
            let mut state = self.lock();
            if let Some(cached) = state.entries.get(room_code) {
                tracing::debug!(room_code, "result cache hit");
                return Ok(cached.clone());
            }
            if !state.loading.insert(room_code.to_string()) {
                return Err(FetchError::InProgress(room_code.to_string()));
            }
            state.generation
        };
        let _loading = LoadingGuard { state: &self.state, room_code, generation };

        tracing::debug!(room_code, "fetching room results");
        let fetched = tokio::time::timeout(self.timeout, self.fetcher.fetch(room_code)).await;
        let players = match fetched {
            Ok(Ok(players)) => players,
            Ok(Err(error)) => {
                tracing::warn!(room_code, %error, "result fetch failed");
                return Err(error);
            },
            Err(_) => {
                tracing::warn!(room_code, timeout = ?self.timeout, "result fetch timed out");
                return Err(FetchError::Timeout { after: self.timeout });
            },
        };

        let results = RoomResults::rank(room_code, players, user_id, self.env.wall_clock_millis());
        self.insert(results.clone(), generation);
        Ok(results)
    }

    fn insert(&self, results: RoomResults, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(room_code = %results.room_code, "cache cleared during fetch");
            return;
        }
        let code = results.room_code.clone();
        if state.entries.insert(code.clone(), results).is_none() {
            state.order.push_back(code);
        }

        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                tracing::debug!(room_code = %oldest, "evicted room results");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F, E> std::fmt::Debug for ResultCache<F, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.capacity)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Clears the loading flag when the fetch future completes or is dropped.
struct LoadingGuard<'a> {
    state: &'a Mutex<CacheState>,
    room_code: &'a str,
    generation: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // After a clear the flag may belong to a newer fetch
        if state.generation == self.generation {
            state.loading.remove(self.room_code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::test_env::TestEnv;

    #[derive(Clone, Default)]
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    fn player(id: &str, score: i64) -> PlayerResult {
        PlayerResult {
            id: id.into(),
            name: format!("player {id}"),
            score,
            topic: None,
            accuracy: 0.5,
            streak: 1,
            avatar: None,
        }
    }

    #[async_trait]
    impl ResultFetcher for CountingFetcher {
        async fn fetch(&self, room_code: &str) -> Result<Vec<PlayerResult>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if room_code == "broken" {
                return Err(FetchError::Status { status: 500 });
            }
            Ok(vec![player("u1", 30), player("u2", 20)])
        }
    }

    struct SlowFetcher;

    #[async_trait]
    impl ResultFetcher for SlowFetcher {
        async fn fetch(&self, _room_code: &str) -> Result<Vec<PlayerResult>, FetchError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn cache(fetcher: CountingFetcher, capacity: usize) -> ResultCache<CountingFetcher, TestEnv> {
        ResultCache::new(fetcher, TestEnv::default(), capacity, DEFAULT_FETCH_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let fetcher = CountingFetcher::default();
        let cache = cache(fetcher.clone(), DEFAULT_CAPACITY);

        let first = cache.fetch_or_get("ABC", "u2").await.unwrap();
        let second = cache.fetch_or_get("ABC", "u2").await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.user_rank, Some(2));
        assert_eq!(first.current_user.as_ref().map(|p| p.id.as_str()), Some("u2"));
    }

    #[tokio::test]
    async fn absent_user_has_no_rank() {
        let cache = cache(CountingFetcher::default(), DEFAULT_CAPACITY);
        let results = cache.fetch_or_get("ABC", "spectator").await.unwrap();
        assert_eq!(results.user_rank, None);
        assert!(results.current_user.is_none());
        assert_eq!(results.players.len(), 2);
    }

    #[tokio::test]
    async fn sixth_insert_evicts_the_oldest() {
        let fetcher = CountingFetcher::default();
        let cache = cache(fetcher.clone(), 5);

        for code in ["A", "B", "C", "D", "E"] {
            cache.fetch_or_get(code, "u1").await.unwrap();
        }
        // Reading A does not protect it from eviction
        cache.fetch_or_get("A", "u1").await.unwrap();
        cache.fetch_or_get("F", "u1").await.unwrap();

        assert_eq!(cache.codes(), vec!["B", "C", "D", "E", "F"]);
        assert!(cache.get("A").is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let fetcher = CountingFetcher::default();
        let cache = cache(fetcher.clone(), DEFAULT_CAPACITY);

        let failed = Err(FetchError::Status { status: 500 });
        assert_eq!(cache.fetch_or_get("broken", "u1").await, failed);
        assert_eq!(cache.fetch_or_get("broken", "u1").await, failed);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
        assert!(!cache.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let cache =
            ResultCache::new(SlowFetcher, TestEnv::default(), 1, Duration::from_secs(10)).unwrap();

        let result = cache.fetch_or_get("ABC", "u1").await;
        assert_eq!(result, Err(FetchError::Timeout { after: Duration::from_secs(10) }));
        assert!(cache.is_empty());
        assert!(!cache.is_loading());
    }

    #[test]
    fn zero_capacity_rejected() {
        let result = ResultCache::new(
            CountingFetcher::default(),
            TestEnv::default(),
            0,
            DEFAULT_FETCH_TIMEOUT,
        );
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    struct GatedFetcher {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl ResultFetcher for GatedFetcher {
        async fn fetch(&self, _room_code: &str) -> Result<Vec<PlayerResult>, FetchError> {
            self.gate.notified().await;
            Ok(vec![player("u1", 10)])
        }
    }

    #[tokio::test]
    async fn fetch_finishing_after_clear_is_not_stored() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let fetcher = GatedFetcher { gate: gate.clone() };
        let cache = Arc::new(
            ResultCache::new(fetcher, TestEnv::default(), 2, DEFAULT_FETCH_TIMEOUT).unwrap(),
        );

        let in_flight = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch_or_get("ABC", "u1").await }
        });
        while !cache.is_loading() {
            tokio::task::yield_now().await;
        }

        cache.clear_all();
        assert!(!cache.is_loading());
        gate.notify_one();

        let results = in_flight.await.unwrap().unwrap();
        assert_eq!(results.user_rank, Some(1));
        assert!(cache.is_empty());
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn clear_all_empties_cache() {
        let cache = cache(CountingFetcher::default(), DEFAULT_CAPACITY);
        cache.fetch_or_get("A", "u1").await.unwrap();
        cache.clear_all();
        assert!(cache.is_empty());
        assert!(cache.codes().is_empty());
    }
}
