//! Environment abstraction for deterministic testing.
//!
//! Decouples client logic from system resources (time, randomness). Tests use
//! a virtual clock and seeded RNG, production uses the system clock and OS
//! entropy.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - given the same seed, a simulated environment yields the same random
///   sequence
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulated ones a
    /// virtual instant advanced by the test.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Wall-clock time in milliseconds since the Unix epoch.
    ///
    /// Only used to stamp locally created chat entries. Never used for
    /// ordering or timeouts.
    fn wall_clock_millis(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for chat correlation ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
