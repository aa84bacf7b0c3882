//! Production [`Environment`] using system time and the OS RNG.
//!
//! # Capabilities
//!
//! - Monotonic time from `std::time::Instant`
//! - Wall-clock milliseconds for message timestamps
//! - OS randomness (getrandom) for correlation ids

use quizwire_core::Environment;

/// Production environment.
///
/// # Panics
///
/// Panics if the OS RNG fails or the system clock reads before the Unix
/// epoch. Both indicate a broken host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    #[allow(clippy::expect_used)]
    fn wall_clock_millis(&self) -> u64 {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)");
        u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn time_advances() {
        let env = SystemEnv::new();
        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(env.now() > t1);
    }

    #[test]
    fn random_values_differ() {
        let env = SystemEnv::new();
        assert_ne!(env.random_u64(), env.random_u64());
    }

    #[test]
    fn wall_clock_is_recent() {
        // 2020-01-01
        assert!(SystemEnv::new().wall_clock_millis() > 1_577_836_800_000);
    }
}
