use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// API-declared quota window (Discord `X-RateLimit-*`, Twitter
/// `x-rate-limit-*`). Keyed by endpoint family, not by URL — callers choose
/// the bucket key (e.g. the API route template).
#[derive(Debug, Clone, Default)]
pub struct RateLimitBucket {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitBucket {
    /// Updates from whichever of the known header families is present.
    /// Falls through silently if neither is — callers fall back to the
    /// generic interval policy in that case.
    pub fn update_from_headers(&mut self, headers: &HeaderMap) {
        if let Some((remaining, reset_at)) = read_pair(headers, "x-ratelimit-remaining", "x-ratelimit-reset") {
            self.remaining = Some(remaining);
            self.reset_at = Some(reset_at);
            return;
        }
        if let Some((remaining, reset_at)) = read_pair(headers, "x-rate-limit-remaining", "x-rate-limit-reset") {
            self.remaining = Some(remaining);
            self.reset_at = Some(reset_at);
        }
    }

    /// `Some(delay)` when this bucket is exhausted and a reset time is
    /// known; the generic interval policy applies otherwise.
    pub fn delay_until_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.remaining != Some(0) {
            return None;
        }
        let reset_at = self.reset_at?;
        (reset_at - now).to_std().ok()
    }
}

fn read_pair(headers: &HeaderMap, remaining_key: &str, reset_key: &str) -> Option<(u64, DateTime<Utc>)> {
    let remaining: u64 = headers.get(remaining_key)?.to_str().ok()?.parse().ok()?;
    let reset_epoch: i64 = headers.get(reset_key)?.to_str().ok()?.parse().ok()?;
    let reset_at = DateTime::from_timestamp(reset_epoch, 0)?;
    Some((remaining, reset_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn exhausted_bucket_reports_delay_until_reset() {
        let mut headers = HeaderMap::new();
        let reset_at = Utc::now() + chrono::Duration::seconds(30);
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from_str(&reset_at.timestamp().to_string()).unwrap(),
        );

        let mut bucket = RateLimitBucket::default();
        bucket.update_from_headers(&headers);

        let delay = bucket.delay_until_reset(Utc::now()).unwrap();
        assert!(delay.as_secs() <= 30 && delay.as_secs() > 0);
    }

    #[test]
    fn bucket_with_remaining_quota_has_no_forced_delay() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("5"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("9999999999"));

        let mut bucket = RateLimitBucket::default();
        bucket.update_from_headers(&headers);

        assert!(bucket.delay_until_reset(Utc::now()).is_none());
    }
}
