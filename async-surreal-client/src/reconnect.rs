// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Reconnection policies and backoff schedules. The state machine that
//! applies them lives in the session (see `session::run_reconnect_loop`).

use std::time::Duration;

/// What to do when the persistent transport reports a disconnect.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectPolicy {
    /// Stay disconnected.
    Never,
    /// Retry every `delay`, at most `max_attempts` times per outage.
    Constant {
        /// Delay between attempts.
        delay: Duration,
        /// Attempts per outage before giving up.
        max_attempts: u32,
    },
    /// Exponential backoff: attempt `n` is delayed by
    /// `min(initial_delay * multiplier^(n-1), max_delay)`.
    ExponentialBackoff {
        /// Delay before the first attempt.
        initial_delay: Duration,
        /// Upper bound for the delay.
        max_delay: Duration,
        /// Growth factor between attempts.
        multiplier: f64,
        /// Attempts per outage before giving up.
        max_attempts: u32,
    },
    /// Exponential backoff with no cap on the number of attempts.
    AlwaysReconnect {
        /// Delay before the first attempt.
        initial_delay: Duration,
        /// Upper bound for the delay.
        max_delay: Duration,
        /// Growth factor between attempts.
        multiplier: f64,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::ExponentialBackoff {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Start a fresh backoff schedule for one outage, or `None` when the
    /// policy is to never reconnect.
    pub fn new_backoff(&self) -> Option<Backoff> {
        match *self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Constant {
                delay,
                max_attempts,
            } => Some(Backoff {
                next_delay: delay,
                max_delay: delay,
                multiplier: 1.0,
                remaining: Some(max_attempts),
            }),
            ReconnectPolicy::ExponentialBackoff {
                initial_delay,
                max_delay,
                multiplier,
                max_attempts,
            } => Some(Backoff {
                next_delay: initial_delay,
                max_delay,
                multiplier,
                remaining: Some(max_attempts),
            }),
            ReconnectPolicy::AlwaysReconnect {
                initial_delay,
                max_delay,
                multiplier,
            } => Some(Backoff {
                next_delay: initial_delay,
                max_delay,
                multiplier,
                remaining: None,
            }),
        }
    }
}

/// One outage's worth of reconnect delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    remaining: Option<u32>,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let delay = self.next_delay;
        let grown = self.next_delay.mul_f64(self.multiplier);
        self.next_delay = grown.min(self.max_delay);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_has_no_backoff() {
        assert!(ReconnectPolicy::Never.new_backoff().is_none());
    }

    #[test]
    fn constant_repeats_and_stops() {
        let policy = ReconnectPolicy::Constant {
            delay: Duration::from_millis(100),
            max_attempts: 3,
        };
        let delays: Vec<_> = policy.new_backoff().unwrap().collect();
        assert_eq!(delays, vec![Duration::from_millis(100); 3]);
    }

    #[test]
    fn exponential_grows_and_caps() {
        let policy = ReconnectPolicy::ExponentialBackoff {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_attempts: 4,
        };
        let delays: Vec<_> = policy.new_backoff().unwrap().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(100),
                Duration::from_millis(100),
            ]
        );
    }

    #[test]
    fn always_reconnect_is_unbounded() {
        let policy = ReconnectPolicy::AlwaysReconnect {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            multiplier: 2.0,
        };
        let mut backoff = policy.new_backoff().unwrap();
        let first: Vec<_> = backoff.by_ref().take(4).collect();
        assert_eq!(
            first,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40),
                Duration::from_millis(40),
            ]
        );
        assert!(backoff.next().is_some());
    }
}
