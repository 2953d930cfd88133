//! Bounded retry with exponential backoff.
//!
//! Store metadata is eventually consistent: a table created in one call
//! may not yet be usable in the next. Operations that depend on such
//! metadata are retried a fixed number of times with a doubling delay
//! rather than polled until observed.

use std::time::Duration;

/// Retry schedule for metadata convergence.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted, sleeping with a
/// doubling delay between attempts.
///
/// `what` labels the operation in retry warnings. On exhaustion the final
/// error is returned together with the number of attempts made.
pub async fn converge<T, E, F>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, (u32, E)>
where
    E: std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let mut delay = policy.base_delay;
    let mut attempt: u32 = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= policy.max_attempts => return Err((attempt, error)),
            Err(error) => {
                eprintln!(
                    "Warning: {} failed (attempt {}/{}), retrying in {:?}: {}",
                    what, attempt, policy.max_attempts, delay, error
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}
