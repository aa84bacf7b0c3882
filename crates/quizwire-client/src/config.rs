//! Client configuration.

use std::time::Duration;

use quizwire_core::{ConnectionConfig, duration_ms};
use serde::{Deserialize, Serialize};

use crate::{
    chat::DEFAULT_ACK_TIMEOUT,
    error::ClientError,
    result_cache::{DEFAULT_CAPACITY, DEFAULT_FETCH_TIMEOUT},
    room_store::LeavePolicy,
};

/// Configuration for every client component.
///
/// Durations are expressed in milliseconds when (de)serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Broker connection behaviour.
    pub connection: ConnectionConfig,

    /// How long an own chat message may stay unacknowledged.
    #[serde(with = "duration_ms")]
    pub chat_ack_timeout: Duration,

    /// Number of finished rooms kept in the result cache.
    pub result_cache_capacity: usize,

    /// Limit on a single result fetch.
    #[serde(with = "duration_ms")]
    pub fetch_timeout: Duration,

    /// What happens to a player who leaves a game in progress.
    pub leave_policy: LeavePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            chat_ack_timeout: DEFAULT_ACK_TIMEOUT,
            result_cache_capacity: DEFAULT_CAPACITY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            leave_policy: LeavePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidConfig` naming the first offending field
    pub fn validate(&self) -> Result<(), ClientError> {
        let invalid = |msg: &str| Err(ClientError::InvalidConfig(msg.to_string()));

        if self.result_cache_capacity == 0 {
            return invalid("result_cache_capacity must be at least 1");
        }
        if self.fetch_timeout.is_zero() {
            return invalid("fetch_timeout must be positive");
        }
        if self.chat_ack_timeout.is_zero() {
            return invalid("chat_ack_timeout must be positive");
        }
        if self.connection.reconnect_delay.is_zero() {
            return invalid("connection.reconnect_delay must be positive");
        }
        if self.connection.connect_timeout.is_zero() {
            return invalid("connection.connect_timeout must be positive");
        }
        if self.connection.heartbeat_tolerance == 0 {
            return invalid("connection.heartbeat_tolerance must be at least 1");
        }
        Ok(())
    }
}
