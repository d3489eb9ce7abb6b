use std::time::Duration;

use http::header::RETRY_AFTER;
use http::HeaderMap;
use rand::Rng;

use crate::constants::DEFAULT_RETRY_DELAY;
use crate::settings::Retry;

/// How long to wait before resending a rate-limited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDirective {
    pub delay: Duration,
}

impl RetryDirective {
    /// Use the first numeric `Retry-After` value (seconds), else `default_delay`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, default_delay: Duration) -> Self {
        let delay = headers
            .get_all(RETRY_AFTER)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| value.trim().parse::<u64>().ok())
            .map_or(default_delay, Duration::from_secs);

        Self { delay }
    }
}

/// Rate-limit handling for the signed client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub default_delay: Duration,
    /// Total attempts for one request; `None` retries indefinitely.
    pub max_attempts: Option<u32>,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            default_delay: DEFAULT_RETRY_DELAY,
            max_attempts: None,
            jitter: Duration::ZERO,
        }
    }
}

impl From<&Retry> for RetryPolicy {
    fn from(settings: &Retry) -> Self {
        Self {
            default_delay: Duration::from_secs(settings.default_delay_secs),
            max_attempts: settings.max_attempts,
            jitter: Duration::from_millis(settings.jitter_ms),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempts` have been made.
    #[must_use]
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Delay for the next attempt: the server directive plus random jitter.
    #[must_use]
    pub fn backoff(&self, headers: &HeaderMap) -> Duration {
        let directive = RetryDirective::from_headers(headers, self.default_delay);
        if self.jitter.is_zero() {
            return directive.delay;
        }
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        directive.delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with(values: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(RETRY_AFTER, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_retry_after_seconds() {
        let directive = RetryDirective::from_headers(&headers_with(&["2"]), DEFAULT_RETRY_DELAY);
        assert_eq!(directive.delay, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_retry_after_uses_default() {
        let directive = RetryDirective::from_headers(&HeaderMap::new(), DEFAULT_RETRY_DELAY);
        assert_eq!(directive.delay, Duration::from_secs(15));
    }

    #[test]
    fn test_non_numeric_retry_after_is_skipped() {
        let headers = headers_with(&["Wed, 21 Oct 2015 07:28:00 GMT", "4"]);
        let directive = RetryDirective::from_headers(&headers, DEFAULT_RETRY_DELAY);
        assert_eq!(directive.delay, Duration::from_secs(4));

        let headers = headers_with(&["soon"]);
        let directive = RetryDirective::from_headers(&headers, DEFAULT_RETRY_DELAY);
        assert_eq!(directive.delay, DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_default_policy_is_unbounded() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(u32::MAX - 1));
    }

    #[test]
    fn test_capped_policy() {
        let policy = RetryPolicy {
            max_attempts: Some(3),
            ..RetryPolicy::default()
        };
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            jitter: Duration::from_millis(250),
            ..RetryPolicy::default()
        };
        let headers = headers_with(&["1"]);
        for _ in 0..50 {
            let delay = policy.backoff(&headers);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1250));
        }
    }
}
