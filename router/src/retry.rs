//! Retry policy for agent calls: exponential backoff and error
//! classification.

use std::time::Duration;

use crate::error::UpstreamError;

/// Error-text fragments that mark a failure as transient.
const TRANSIENT_TERMS: [&str; 6] = [
    "timeout",
    "timed out",
    "connection",
    "connect",
    "unavailable",
    "network",
];

/// Retry configuration for agent requests.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub base_delay_ms: u64,
    /// Delay cap, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> RetryConfig {
        RetryConfig {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before the given 0-indexed attempt: zero for the first attempt,
    /// then `min(base * 2^(attempt-1), max)`.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }
        let factor = 1u64 << (attempt - 1).min(62);
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }

    /// Sleeps for the backoff delay of the given attempt.
    pub async fn wait_before_retry(&self, attempt: u32) {
        let delay_ms = self.delay_ms(attempt);
        if delay_ms > 0 {
            tracing::debug!("waiting {}ms before retry attempt {}", delay_ms, attempt + 1);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

/// Whether a failed agent call is worth retrying.
///
/// Transient: error text mentioning timeout/connection/network terms, HTTP
/// 429, or any 5xx. Permanent: any other 4xx. Ambiguous errors default to
/// non-retryable.
pub fn is_retryable(error: &UpstreamError) -> bool {
    let text = error.to_string().to_lowercase();
    if TRANSIENT_TERMS.iter().any(|term| text.contains(term)) {
        return true;
    }
    if let Some(status) = error.status() {
        if status == 429 || (500..600).contains(&status) {
            return true;
        }
        if (400..500).contains(&status) {
            return false;
        }
    }
    false
}
