use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::delay::Delay;

/// Sanity ceiling applied to server-dictated `Retry-After` values, so a
/// misbehaving upstream can't park a monitor for days.
pub const HIGHEST_UPDATE_INTERVAL_CAP: Duration = Duration::from_secs(6 * 60 * 60);

pub struct IntervalContext<'a> {
    pub status: Option<u16>,
    pub headers: Option<&'a HeaderMap>,
    /// Whether the caller wants `Cache-Control: max-age` honored on success
    /// (some plugins prefer a fixed `base` instead).
    pub adjust: bool,
}

/// Computes the next polling interval per §4.4 "Adaptive update interval".
/// `current` is the endpoint's `update_interval` going into this poll;
/// `base` is its `base_update_interval`, never itself mutated.
pub fn decide_on_update_interval(
    ctx: IntervalContext,
    current: Duration,
    base: Duration,
    delay: &Delay,
) -> Duration {
    let Some(status) = ctx.status else {
        // No response: exponential growth from the current interval.
        return delay.growth_from(current);
    };

    if let Some(retry_after) = ctx.headers.and_then(parse_retry_after) {
        return retry_after.clamp(base, HIGHEST_UPDATE_INTERVAL_CAP.min(delay.cap()));
    }

    if status >= 400 {
        return delay.growth_from(current).max(current);
    }

    if ctx.adjust {
        let max_age = ctx.headers.and_then(parse_max_age).unwrap_or(base);
        let ceiling = (base * 10).min(delay.cap());
        return max_age.clamp(base, ceiling);
    }

    base
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn parse_max_age(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::CACHE_CONTROL)?.to_str().ok()?;
    raw.split(',').find_map(|token| {
        token
            .trim()
            .strip_prefix("max-age=")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn delay() -> Delay {
        Delay::new(Duration::from_secs(60), Duration::from_secs(3600), 2.0)
    }

    #[test]
    fn no_response_grows_exponentially() {
        let next = decide_on_update_interval(
            IntervalContext { status: None, headers: None, adjust: true },
            Duration::from_secs(60),
            Duration::from_secs(60),
            &delay(),
        );
        assert!(next > Duration::from_secs(60));
    }

    #[test]
    fn success_without_adjust_returns_base() {
        let next = decide_on_update_interval(
            IntervalContext { status: Some(200), headers: None, adjust: false },
            Duration::from_secs(600),
            Duration::from_secs(60),
            &delay(),
        );
        assert_eq!(next, Duration::from_secs(60));
    }

    #[test]
    fn success_never_drops_below_base_and_is_capped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=5"),
        );
        let next = decide_on_update_interval(
            IntervalContext { status: Some(200), headers: Some(&headers), adjust: true },
            Duration::from_secs(600),
            Duration::from_secs(60),
            &delay(),
        );
        assert_eq!(next, Duration::from_secs(60));

        let mut big = HeaderMap::new();
        big.insert(
            reqwest::header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=100000"),
        );
        let capped = decide_on_update_interval(
            IntervalContext { status: Some(200), headers: Some(&big), adjust: true },
            Duration::from_secs(600),
            Duration::from_secs(60),
            &delay(),
        );
        assert_eq!(capped, Duration::from_secs(600));
    }

    #[test]
    fn error_status_grows_and_never_shrinks() {
        let next = decide_on_update_interval(
            IntervalContext { status: Some(503), headers: None, adjust: true },
            Duration::from_secs(120),
            Duration::from_secs(60),
            &delay(),
        );
        assert!(next >= Duration::from_secs(120));
    }

    #[test]
    fn retry_after_is_honored_and_clamped() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, HeaderValue::from_static("30"));
        let next = decide_on_update_interval(
            IntervalContext { status: Some(429), headers: Some(&headers), adjust: true },
            Duration::from_secs(60),
            Duration::from_secs(60),
            &delay(),
        );
        assert_eq!(next, Duration::from_secs(60)); // clamped up to base
    }
}
