//! Manual clock for unit tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use quizwire_core::Environment;

/// Clock advanced by hand, counter-based randomness.
#[derive(Clone, Default)]
pub struct TestEnv {
    millis: Arc<AtomicU64>,
    counter: Arc<AtomicU64>,
}

impl TestEnv {
    /// Move the clock forward.
    #[allow(dead_code)]
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Environment for TestEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }

    fn wall_clock_millis(&self) -> u64 {
        1_700_000_000_000 + self.millis.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = n.to_be_bytes()[i % 8];
        }
    }
}
