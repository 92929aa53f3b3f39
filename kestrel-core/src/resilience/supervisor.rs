//! Reconnection supervision for one venue session
//!
//! The session task runs one connection attempt at a time and reports how
//! it ended; the supervisor decides whether to retry (after waiting out
//! the backoff) or give up. A connection that reached Active before
//! dropping earns a fresh attempt budget.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;

use super::backoff::{BackoffConfig, ExponentialBackoff};

/// How one connection attempt ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Engine-initiated shutdown; do not reconnect.
    Closed,
    /// Connection dropped. `was_active` is true when the session had
    /// completed its logon before dropping.
    Lost { was_active: bool },
}

/// Supervisor's decision after an attempt ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Backoff delay has elapsed; run another attempt.
    Retry,
    /// Clean shutdown; stop.
    Stop,
    /// Attempt budget exhausted; the venue is permanently failed.
    GiveUp,
}

/// Running tally of reconnection activity, snapshotted into engine stats.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconnectStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

/// Backoff parameters from the engine-wide reconnect settings.
pub fn backoff_config(config: &EngineConfig) -> BackoffConfig {
    BackoffConfig {
        initial_delay: config.reconnect_delay(),
        max_delay: Duration::from_secs(60),
        multiplier: 2.0,
        max_attempts: config.reconnect_attempts,
        jitter_factor: 0.1,
    }
}

/// Retry policy state for one venue session task.
#[derive(Debug)]
pub struct ReconnectSupervisor {
    venue: String,
    backoff: ExponentialBackoff,
    stats: ReconnectStats,
}

impl ReconnectSupervisor {
    pub fn new(venue: impl Into<String>, config: BackoffConfig) -> Self {
        Self {
            venue: venue.into(),
            backoff: ExponentialBackoff::new(config),
            stats: ReconnectStats::default(),
        }
    }

    /// Record the end of one connection attempt and decide what happens
    /// next. Sleeps out the backoff delay before returning `Retry`.
    pub async fn on_attempt_end(
        &mut self,
        end: Result<SessionEnd, EngineError>,
    ) -> Verdict {
        self.stats.attempts += 1;
        match end {
            Ok(SessionEnd::Closed) => {
                info!(venue = %self.venue, "session closed");
                return Verdict::Stop;
            }
            Ok(SessionEnd::Lost { was_active }) => {
                if was_active {
                    self.stats.successes += 1;
                    // A session that made it to Active earns a fresh budget
                    self.backoff.reset();
                }
                warn!(venue = %self.venue, was_active, "connection lost");
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!(venue = %self.venue, error = %e, "connection attempt failed");
            }
        }

        match self.backoff.next_delay() {
            Some(delay) => {
                info!(
                    venue = %self.venue,
                    attempt = self.backoff.attempt(),
                    ?delay,
                    "reconnecting after backoff"
                );
                tokio::time::sleep(delay).await;
                Verdict::Retry
            }
            None => {
                error!(venue = %self.venue, "reconnect attempts exhausted");
                Verdict::GiveUp
            }
        }
    }

    pub fn stats(&self) -> ReconnectStats {
        self.stats
    }
}
