//! Retry policies.
//!
//! The interval between attempts is constant. Each call site picks one of the named
//! policies below or builds its own.

use std::time::Duration;

use crate::errors::PolicyError;

/// How many times to invoke an operation and how long to wait between invocations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// Const constructor for call-site constants. A zero attempt count is raised to one.
    pub const fn fixed(max_attempts: u32, interval: Duration) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self {
            max_attempts,
            interval,
        }
    }

    /// Builds a policy from runtime values, rejecting a zero attempt count.
    pub fn try_new(max_attempts: u32, interval: Duration) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    /// Invoke once, never retry.
    pub const fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        DEFAULT_RETRY
    }
}

/// Default for individual requests: 30 attempts, 1 second apart.
pub const DEFAULT_RETRY: RetryPolicy = RetryPolicy::fixed(30, Duration::from_secs(1));

/// Retries for a single job status check, independent of the poll budget.
pub const STATUS_CHECK_RETRY: RetryPolicy = RetryPolicy::fixed(5, Duration::from_secs(1));

/// Polling a freshly created workspace's cloud context. The cloud project is slow to
/// become ready right after the workspace itself is created.
pub const BOOTSTRAP_POLL: RetryPolicy = RetryPolicy::fixed(120, Duration::from_secs(1));

/// Provisioning jobs that take minutes (notebooks, clusters).
pub const PROVISIONING_POLL: RetryPolicy = RetryPolicy::fixed(60, Duration::from_secs(10));

/// Short-lived jobs such as deleting a controlled resource.
pub const RESOURCE_POLL: RetryPolicy = RetryPolicy::fixed(30, Duration::from_secs(1));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_raises_zero_to_one() {
        let policy = RetryPolicy::fixed(0, Duration::from_secs(3));
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_try_new_rejects_zero() {
        assert_eq!(
            RetryPolicy::try_new(0, Duration::from_secs(1)),
            Err(PolicyError::ZeroAttempts)
        );
        let policy = RetryPolicy::try_new(4, Duration::from_millis(250)).unwrap();
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_named_policies() {
        assert_eq!(BOOTSTRAP_POLL.max_attempts(), 120);
        assert_eq!(BOOTSTRAP_POLL.interval(), Duration::from_secs(1));
        assert_eq!(PROVISIONING_POLL.interval(), Duration::from_secs(10));
        assert_eq!(RetryPolicy::default(), DEFAULT_RETRY);
        assert_eq!(RetryPolicy::once().max_attempts(), 1);
    }
}
