//! Retry policy for ACME/DNS HTTP calls: a fixed backoff table plus jitter,
//! applied to a known set of transient status codes.

use std::time::Duration;

use rand::RngExt;

/// Status codes treated as transient and worth retrying. Everything else,
/// including other 4xx responses, is returned to the caller immediately.
pub const TRANSIENT_STATUS_CODES: &[u16] =
    &[408, 425, 429, 500, 502, 503, 504, 522, 524, 525];

/// Backoff in milliseconds by attempt index (0-based), saturating at the
/// last entry for any further attempt.
const BACKOFF_TABLE_MS: &[u64] = &[250, 1000, 2500, 4000, 6000, 9000, 12000];

const JITTER_MAX_MS: u64 = 200;

pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUS_CODES.contains(&status)
}

/// Delay before retry attempt `attempt` (0 = first retry), per the fixed
/// backoff table plus uniform jitter in `[0, 200)` ms.
pub fn backoff_delay(attempt: usize) -> Duration {
    let idx = attempt.min(BACKOFF_TABLE_MS.len() - 1);
    let base = BACKOFF_TABLE_MS[idx];
    let jitter = rand::rng().random_range(0..JITTER_MAX_MS);
    Duration::from_millis(base + jitter)
}

/// How many times a call may be retried. The directory fetch gets a longer
/// budget than everything else.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
}

impl RetryPolicy {
    pub const DEFAULT: RetryPolicy = RetryPolicy { max_retries: 3 };
    pub const DIRECTORY: RetryPolicy = RetryPolicy { max_retries: 6 };

    pub fn should_retry(&self, status: u16, attempt: usize) -> bool {
        attempt < self.max_retries && is_transient_status(status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_follows_the_table_and_saturates() {
        let d0 = backoff_delay(0).as_millis();
        let d1 = backoff_delay(1).as_millis();
        assert!((250..250 + JITTER_MAX_MS as u128).contains(&d0));
        assert!((1000..1000 + JITTER_MAX_MS as u128).contains(&d1));

        let last = backoff_delay(6).as_millis();
        let beyond = backoff_delay(50).as_millis();
        assert!((12000..12000 + JITTER_MAX_MS as u128).contains(&last));
        assert!((12000..12000 + JITTER_MAX_MS as u128).contains(&beyond));
    }

    #[test]
    fn transient_status_set_matches_spec() {
        for code in [408, 425, 429, 500, 502, 503, 504, 522, 524, 525] {
            assert!(is_transient_status(code));
        }
        for code in [200, 301, 400, 401, 403, 404] {
            assert!(!is_transient_status(code));
        }
    }

    #[test]
    fn should_retry_respects_max_retries() {
        let policy = RetryPolicy::DEFAULT;
        assert!(policy.should_retry(503, 0));
        assert!(policy.should_retry(503, 2));
        assert!(!policy.should_retry(503, 3));
        assert!(!policy.should_retry(404, 0));
    }
}
