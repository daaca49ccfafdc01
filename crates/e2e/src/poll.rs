//! Eventual assertions - retry a check until it passes or the deadline expires
//!
//! Side effects of an API call (an event landing in the log, a projection
//! catching up) are not visible immediately. [`eventually`] re-runs a check on
//! a fixed interval and, if the deadline passes first, hands back the last
//! failure unchanged so the caller sees the real mismatch.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Timing for [`eventually`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOptions {
    /// Total time budget, measured from the first attempt
    pub timeout_ms: u64,

    /// Fixed delay between attempts
    pub interval_ms: u64,
}

impl PollOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            interval_ms: interval.as_millis() as u64,
        }
    }

    pub fn from_millis(timeout_ms: u64, interval_ms: u64) -> Self {
        Self { timeout_ms, interval_ms }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Run `check` until it returns `Ok`, sleeping `options.interval()` between
/// failed attempts.
///
/// The first attempt always runs. Once `options.timeout()` has elapsed since
/// that attempt, the most recent error is returned as-is; no separate timeout
/// error exists.
pub async fn eventually<F, Fut, T, E>(options: PollOptions, mut check: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let timeout = options.timeout();
    let interval = options.interval();
    let start = Instant::now();
    let mut attempts = 0usize;

    loop {
        attempts += 1;

        let last_error = match check().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!("Check passed after {} attempts ({:?})", attempts, start.elapsed());
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        debug!("Attempt {} failed: {}", attempts, last_error);
        sleep(interval).await;

        if start.elapsed() >= timeout {
            warn!(
                "Giving up after {} attempts over {:?}: {}",
                attempts,
                start.elapsed(),
                last_error
            );
            return Err(last_error);
        }
    }
}
