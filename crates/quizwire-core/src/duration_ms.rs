//! Serde adapter storing a [`Duration`] as whole milliseconds.
//!
//! Use with `#[serde(with = "quizwire_core::duration_ms")]`.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize as a `u64` millisecond count.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}

/// Deserialize from a `u64` millisecond count.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
