use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::ScoutError;

pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, initial_delay: Duration) -> Self {
        Self {
            retries,
            initial_delay,
        }
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub fn with_retry<T, F>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, ScoutError>
where
    F: FnMut() -> Result<T, ScoutError>,
{
    let mut remaining = policy.retries;
    let mut delay = policy.initial_delay;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 0 && err.is_transient() => {
                warn!(
                    delay_ms = delay.as_millis() as u64,
                    remaining,
                    error = %err,
                    "transient provider error, backing off"
                );
                sleeper.sleep(delay);
                remaining -= 1;
                delay = delay.saturating_mul(2);
            }
            Err(err) => return Err(err),
        }
    }
}
