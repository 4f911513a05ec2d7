use std::time::{Duration, Instant};

use super::models::ApiError;
use super::transport::HttpResponse;

/// Error codes the API uses for transient conditions that are safe to retry:
/// - 4001: system maintenance
/// - 4002: server timeout
/// - 4003: rate limit exceeded
/// - 4004: unexpected error, retry advised
pub const RETRYABLE_ERROR_CODES: [i32; 4] = [4001, 4002, 4003, 4004];

/// Default ceiling on total time spent retrying a single request
pub const DEFAULT_MAX_RETRY_TIMEOUT: Duration = Duration::from_millis(15_000);

pub const BASE_BACKOFF_MS: u64 = 1_000;
pub const MAX_JITTER_MS: u64 = 1_000;

// 2^16 seconds is already far past any sane retry ceiling
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Calculate exponential backoff with jitter for a given attempt (0-indexed)
///
/// Returns: Duration = 2^attempt seconds + random [0, 1000) ms
/// - Attempt 0: 1.0 - 2.0 seconds
/// - Attempt 1: 2.0 - 3.0 seconds
/// - Attempt 2: 4.0 - 5.0 seconds
pub fn calculate_backoff(attempt: u32) -> Duration {
    let exp = attempt.min(MAX_BACKOFF_EXPONENT);
    let base = BASE_BACKOFF_MS.saturating_mul(1u64 << exp);
    Duration::from_millis(base + rand::random_range(0..MAX_JITTER_MS))
}

/// Per-request retry bookkeeping.
///
/// Lives on the stack of a single `execute` call and is dropped with it.
#[derive(Debug)]
pub struct RetryState {
    pub attempts: u32,
    pub started: Instant,
    pub last_error: Option<ApiError>,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            last_error: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn record_failure(&mut self, error: ApiError) {
        self.attempts += 1;
        self.last_error = Some(error);
    }

    /// Record the attempt that ended the loop. `None` when its body was not a structured error.
    pub fn record_terminal(&mut self, error: Option<ApiError>) {
        self.attempts += 1;
        self.last_error = error;
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of inspecting one response inside the retry loop.
#[derive(Debug)]
pub enum RetryDecision {
    /// Success; hand the response back.
    Done(HttpResponse),
    /// Transient failure; sleep and send again.
    Retry { delay: Duration, error: ApiError },
    /// Terminal failure; surface this response to the caller.
    GiveUp {
        response: HttpResponse,
        error: Option<ApiError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_timeout: DEFAULT_MAX_RETRY_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retry_timeout: Duration) -> Self {
        Self { max_retry_timeout }
    }

    /// Delay before the next attempt, or `None` when the request must not be retried.
    ///
    /// `state.attempts` is the number of failed attempts before the current one.
    pub fn next_delay(&self, state: &RetryState, error: &ApiError) -> Option<Duration> {
        if !error.is_retryable() || self.max_retry_timeout.is_zero() {
            return None;
        }

        let delay = calculate_backoff(state.attempts);
        self.fits_budget(state.elapsed(), delay).then_some(delay)
    }

    fn fits_budget(&self, elapsed: Duration, delay: Duration) -> bool {
        elapsed.saturating_add(delay) <= self.max_retry_timeout
    }
}
