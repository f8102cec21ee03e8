//! Requeue-or-fail decisions for adapter failures.

use std::time::Duration;

use crate::scrape::FailureKind;

/// What to do with a job whose adapter invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put the job back in the queue, eligible after `delay`.
    Requeue { delay: Duration },
    /// Retries are exhausted; the job is done.
    Fail,
}

/// Pure policy: a function of `(retry_count, max_retries, kind)` only.
///
/// The delay grows linearly with the attempt number, so a retried job skips
/// roughly that many poll ticks instead of hammering a target that just
/// refused it. `Blocked` failures wait twice as long.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    pub fn decide(&self, retry_count: i32, max_retries: i32, kind: FailureKind) -> RetryDecision {
        if retry_count >= max_retries {
            return RetryDecision::Fail;
        }

        let attempt = (retry_count + 1) as u32;
        let mut delay = self.base_delay.saturating_mul(attempt);
        if kind == FailureKind::Blocked {
            delay = delay.saturating_mul(2);
        }

        RetryDecision::Requeue { delay }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(5))
    }

    #[test]
    fn fails_once_retries_are_exhausted() {
        assert_eq!(
            policy().decide(3, 3, FailureKind::Timeout),
            RetryDecision::Fail
        );
        assert_eq!(
            policy().decide(5, 3, FailureKind::Timeout),
            RetryDecision::Fail
        );
    }

    #[test]
    fn requeues_while_retries_remain() {
        assert_eq!(
            policy().decide(0, 3, FailureKind::Timeout),
            RetryDecision::Requeue {
                delay: Duration::from_secs(5)
            }
        );
    }

    #[test]
    fn delay_grows_with_attempt_number() {
        let first = policy().decide(0, 3, FailureKind::Timeout);
        let third = policy().decide(2, 3, FailureKind::Timeout);
        assert_eq!(
            first,
            RetryDecision::Requeue {
                delay: Duration::from_secs(5)
            }
        );
        assert_eq!(
            third,
            RetryDecision::Requeue {
                delay: Duration::from_secs(15)
            }
        );
    }

    #[test]
    fn blocked_failures_back_off_twice_as_long() {
        assert_eq!(
            policy().decide(0, 3, FailureKind::Blocked),
            RetryDecision::Requeue {
                delay: Duration::from_secs(10)
            }
        );
    }

    #[test]
    fn zero_max_retries_never_requeues() {
        assert_eq!(
            policy().decide(0, 0, FailureKind::NotFound),
            RetryDecision::Fail
        );
    }
}
