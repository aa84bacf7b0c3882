//! Property tests for the bounded result cache.
//!
//! A plain `VecDeque` model of insertion-order eviction is run alongside
//! the real cache over arbitrary request sequences.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use proptest::prelude::*;
use quizwire_client::{FetchError, ResultCache, ResultFetcher};
use quizwire_harness::{ScriptedFetcher, SimEnv, fixtures};

const CODES: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

fn scripted() -> Arc<ScriptedFetcher> {
    let mut fetcher = ScriptedFetcher::new();
    for code in CODES {
        let players = vec![fixtures::result("u1", 10), fixtures::result("u2", 5)];
        fetcher = fetcher.with_results(code, players);
    }
    Arc::new(fetcher)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(future)
}

proptest! {
    /// The cache holds the last `capacity` distinct codes in first-insert
    /// order, and each code is fetched once while it stays cached.
    #[test]
    fn prop_fifo_eviction_matches_model(
        capacity in 1usize..6,
        requests in prop::collection::vec(0usize..CODES.len(), 1..40),
    ) {
        let fetcher = scripted();
        let cache = ResultCache::new(
            Arc::clone(&fetcher),
            SimEnv::default(),
            capacity,
            Duration::from_secs(10),
        )
        .unwrap();
        let mut model: VecDeque<&str> = VecDeque::new();
        let mut expected_fetches = [0usize; CODES.len()];

        for index in requests {
            let code = CODES[index];
            let results = block_on(cache.fetch_or_get(code, "u1")).unwrap();
            prop_assert_eq!(&results.room_code, code);
            prop_assert_eq!(results.user_rank, Some(1));

            if !model.contains(&code) {
                expected_fetches[index] += 1;
                model.push_back(code);
                if model.len() > capacity {
                    model.pop_front();
                }
            }

            let codes = cache.codes();
            let expected: Vec<String> = model.iter().map(|c| c.to_string()).collect();
            prop_assert_eq!(codes, expected);
            prop_assert!(cache.len() <= capacity);
            prop_assert!(!cache.is_loading());
        }

        for (index, code) in CODES.iter().enumerate() {
            prop_assert_eq!(fetcher.calls(code), expected_fetches[index]);
        }
    }
}

#[test]
fn six_rooms_through_a_five_slot_cache_evict_the_first() {
    let cache =
        ResultCache::new(scripted(), SimEnv::default(), 5, Duration::from_secs(10)).unwrap();
    block_on(async {
        for code in &CODES[..6] {
            cache.fetch_or_get(code, "u1").await.unwrap();
        }
    });
    assert_eq!(cache.codes(), vec!["B", "C", "D", "E", "F"]);
    assert!(cache.get("A").is_none());
}

#[test]
fn failures_are_not_cached() {
    let fetcher =
        Arc::new(ScriptedFetcher::new().with_error("X", FetchError::Status { status: 500 }));
    let fetcher: Arc<dyn ResultFetcher> = fetcher;
    let cache = ResultCache::new(fetcher, SimEnv::default(), 5, Duration::from_secs(10)).unwrap();

    for _ in 0..2 {
        let error = block_on(cache.fetch_or_get("X", "u1")).unwrap_err();
        assert_eq!(error, FetchError::Status { status: 500 });
    }
    assert!(cache.is_empty());
    assert!(!cache.is_loading());
}
