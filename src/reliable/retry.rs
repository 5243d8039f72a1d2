//! Retry policy and per-delivery attempt tracking.

use std::time::Duration;

use crate::core::{DeliveryError, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS};

/// Knobs for the retry-until-acknowledged loop.
///
/// A delivery makes up to `max_attempts` sends, waiting `attempt_timeout`
/// after each one for a matching acknowledgement before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends before the delivery fails. At least 1.
    pub max_attempts: u32,
    /// How long each attempt waits for an acknowledgement.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Build a policy. `max_attempts` is clamped to at least 1 so a
    /// delivery always sends at least once.
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
        }
    }
}

/// Attempt bookkeeping for one delivery.
#[derive(Debug, Default)]
pub struct RetryState {
    attempts_made: u32,
    last_reply: Option<String>,
}

impl RetryState {
    /// Fresh state, no attempts made.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the next attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts_made += 1;
        self.attempts_made
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts_made
    }

    /// Whether the policy allows no further attempts.
    pub fn exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempts_made >= policy.max_attempts
    }

    /// Remember the most recent reply that failed to match the
    /// acknowledgement pattern, for the eventual failure report.
    pub fn note_reply(&mut self, reply: impl Into<String>) {
        self.last_reply = Some(reply.into());
    }

    /// Convert exhausted state into the delivery failure.
    pub fn into_failure(self) -> DeliveryError {
        DeliveryError::Exhausted {
            attempts: self.attempts_made,
            last_reply: self.last_reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.attempt_timeout, DEFAULT_ATTEMPT_TIMEOUT);
    }

    #[test]
    fn test_policy_clamps_zero_attempts() {
        let policy = RetryPolicy::new(0, Duration::from_millis(100));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_state_counts_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let mut state = RetryState::new();

        assert_eq!(state.begin_attempt(), 1);
        assert_eq!(state.begin_attempt(), 2);
        assert!(!state.exhausted(&policy));

        assert_eq!(state.begin_attempt(), 3);
        assert!(state.exhausted(&policy));
    }

    #[test]
    fn test_failure_carries_last_reply() {
        let mut state = RetryState::new();
        state.begin_attempt();
        state.note_reply("FIN");
        state.begin_attempt();

        match state.into_failure() {
            DeliveryError::Exhausted {
                attempts,
                last_reply,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(last_reply.as_deref(), Some("FIN"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failure_without_replies() {
        let mut state = RetryState::new();
        state.begin_attempt();

        match state.into_failure() {
            DeliveryError::Exhausted {
                attempts,
                last_reply,
            } => {
                assert_eq!(attempts, 1);
                assert!(last_reply.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
