//! Exponential backoff for reconnection attempts
//!
//! Delays grow geometrically from the configured base, with a small
//! random jitter so several sessions losing the same upstream do not
//! reconnect in lockstep.

use std::time::Duration;

use rand::Rng;

/// Backoff parameters, derived from the engine config.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Growth factor per retry.
    pub multiplier: f64,
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Randomization fraction, 0.0 to 1.0.
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: 3,
            jitter_factor: 0.1,
        }
    }
}

/// Backoff state for one reconnection cycle.
#[derive(Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
    current_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            attempt: 0,
            config,
        }
    }

    /// Next delay to wait before retrying, or `None` once the attempt
    /// budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        let delay = self.jittered(self.current_delay);
        self.attempt += 1;
        self.current_delay = std::cmp::min(
            Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.config.multiplier),
            self.config.max_delay,
        );
        Some(delay)
    }

    /// Attempts consumed so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Back to the initial state, after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current_delay = self.config.initial_delay;
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor == 0.0 {
            return delay;
        }
        let spread = self.config.jitter_factor;
        let factor = 1.0 + rand::thread_rng().gen_range(-spread / 2.0..=spread / 2.0);
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(max_attempts: u32) -> ExponentialBackoff {
        ExponentialBackoff::new(BackoffConfig {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts,
            jitter_factor: 0.0,
        })
    }

    #[test]
    fn delays_double_until_exhausted() {
        let mut backoff = no_jitter(3);
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(10)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(20)));
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn delay_is_capped() {
        let mut backoff = ExponentialBackoff::new(BackoffConfig {
            initial_delay: Duration::from_secs(50),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: 3,
            jitter_factor: 0.0,
        });
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn reset_restores_budget() {
        let mut backoff = no_jitter(2);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), None);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut backoff = ExponentialBackoff::new(BackoffConfig {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: 100,
            jitter_factor: 0.2,
        });
        for _ in 0..20 {
            let d = backoff.next_delay().unwrap().as_secs_f64();
            assert!(d <= 60.0 * 1.1 + f64::EPSILON);
            assert!(d >= 10.0 * 0.9);
        }
    }
}
