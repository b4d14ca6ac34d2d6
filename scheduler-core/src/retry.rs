//! Backoff schedules for re-dispatching a task after a transient failure.
//!
//! Carried over from the source's retry policy shape (fixed / exponential /
//! none), recalibrated here for the dispatcher's exact contract: 3 retries
//! at 1s, 2s, 4s before giving up.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    None,
    Fixed { max_attempts: u32, delay: Duration },
    ExponentialBackoff {
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    },
}

impl RetryPolicy {
    /// The dispatcher's default: attempts 1-3 delay 1s/2s/4s, attempt 4 is
    /// the last and returns no further delay.
    pub fn dispatcher_default() -> Self {
        RetryPolicy::ExponentialBackoff {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            multiplier: 2.0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::None => 1,
            RetryPolicy::Fixed { max_attempts, .. } => *max_attempts,
            RetryPolicy::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }

    /// Delay to wait before retrying after the `attempt`-th failure
    /// (1-indexed). Returns `None` once attempts are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts() {
            return None;
        }
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Fixed { delay, .. } => Some(*delay),
            RetryPolicy::ExponentialBackoff { initial_delay, max_delay, multiplier, .. } => {
                let scaled = initial_delay.as_secs_f64() * multiplier.powi(attempt as i32 - 1);
                let capped = scaled.min(max_delay.as_secs_f64());
                Some(Duration::from_secs_f64(capped))
            }
        }
    }
}
