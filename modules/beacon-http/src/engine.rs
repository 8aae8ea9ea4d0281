use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::endpoint::EndpointState;
use crate::response::Response;
use crate::session::Session;

/// Caller-supplied retry policy for [`HttpEngine::request`]: up to
/// `retry_times` attempts separated by `retry_delay * retry_multiplier^k`
/// plus jitter, stopping on the first 2xx/3xx response (§4.4).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retry_times: u32,
    pub retry_delay: Duration,
    pub retry_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_times: 3,
            retry_delay: Duration::from_secs(2),
            retry_multiplier: 2.0,
        }
    }
}

/// Performs the request pipeline of §4.4: conditional headers, transport-
/// exception mapping, endpoint-state refresh. Stateless itself — sessions
/// and endpoint state are owned by the caller (a `beacon-monitor`
/// `HttpTaskMonitor` entity).
#[derive(Default)]
pub struct HttpEngine;

/// Adds `If-Modified-Since`/`If-None-Match` to a GET/HEAD request when the
/// caller's endpoint state has them, implementing the conditional-request
/// half of I7 as a pure, directly testable step.
fn apply_conditional_headers(headers: &mut HeaderMap, method: &Method, endpoint_state: &EndpointState) {
    if matches!(*method, Method::GET | Method::HEAD) {
        if let Some(last_modified) = &endpoint_state.last_modified {
            if let Ok(v) = HeaderValue::from_str(last_modified) {
                headers.insert(IF_MODIFIED_SINCE, v);
            }
        }
    }
    if let Some(etag) = &endpoint_state.etag {
        if let Ok(v) = HeaderValue::from_str(etag) {
            headers.insert(IF_NONE_MATCH, v);
        }
    }
}

impl HttpEngine {
    pub fn new() -> Self {
        Self
    }

    /// A single request attempt.
    pub async fn request_once(
        &self,
        session: &Session,
        method: Method,
        url: &str,
        mut headers: HeaderMap,
        endpoint_state: &EndpointState,
    ) -> Response {
        apply_conditional_headers(&mut headers, &method, endpoint_state);

        match session.client.request(method, url).headers(headers).send().await {
            Err(e) => {
                warn!(url, error = %e, "transport error, treating as no response");
                Response {
                    ok: false,
                    status: None,
                    reason: Some(e.to_string()),
                    headers: HeaderMap::new(),
                    cookies: Vec::new(),
                    text: String::new(),
                    endpoint_state: endpoint_state.clone(),
                }
            }
            Ok(resp) => {
                let status = resp.status();
                let response_headers = resp.headers().clone();
                let mut next_state = endpoint_state.clone();
                if status.as_u16() < 300 {
                    if let Some(v) = response_headers.get(LAST_MODIFIED).and_then(|v| v.to_str().ok()) {
                        next_state.last_modified = Some(v.to_string());
                    }
                    if let Some(v) = response_headers.get(ETAG).and_then(|v| v.to_str().ok()) {
                        next_state.etag = Some(v.to_string());
                    }
                }

                let ok = status.is_success() || status.is_redirection() || status == StatusCode::NOT_MODIFIED;
                if !ok {
                    debug!(url, status = status.as_u16(), "non-2xx response body buffered");
                } else {
                    debug!(url, status = status.as_u16(), "request complete");
                }

                let reason = status.canonical_reason().map(str::to_string);
                let text = resp.text().await.unwrap_or_default();
                if !ok {
                    warn!(url, status = status.as_u16(), reason = ?reason, "non-2xx response");
                }

                Response {
                    ok,
                    status: Some(status.as_u16()),
                    reason,
                    headers: response_headers,
                    cookies: Vec::new(),
                    text,
                    endpoint_state: next_state,
                }
            }
        }
    }

    /// Wraps [`HttpEngine::request_once`] with retry/back-off per `policy`.
    pub async fn request(
        &self,
        session: &Session,
        method: Method,
        url: &str,
        headers: HeaderMap,
        endpoint_state: &EndpointState,
        policy: &RetryPolicy,
    ) -> Response {
        let mut attempt = 0;
        loop {
            let response = self
                .request_once(session, method.clone(), url, headers.clone(), endpoint_state)
                .await;

            // `ok` already covers 2xx/3xx (including 304 Not Modified) per
            // §4.4's "first successful (2xx, 3xx) response" retry break.
            if response.ok || attempt >= policy.retry_times {
                return response;
            }

            let backoff = policy
                .retry_delay
                .mul_f64(policy.retry_multiplier.powi(attempt as i32));
            let jitter = Duration::from_millis(rand::rng().random_range(0..250));
            tokio::time::sleep(backoff + jitter).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditional_headers_added_for_get_with_known_state() {
        let mut headers = HeaderMap::new();
        let state = EndpointState {
            last_modified: Some("Wed, 21 Oct 2015 07:28:00 GMT".to_string()),
            etag: Some("\"abc\"".to_string()),
        };
        apply_conditional_headers(&mut headers, &Method::GET, &state);

        assert_eq!(headers.get(IF_MODIFIED_SINCE).unwrap(), "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(headers.get(IF_NONE_MATCH).unwrap(), "\"abc\"");
    }

    #[test]
    fn conditional_headers_omitted_for_post() {
        let mut headers = HeaderMap::new();
        let state = EndpointState {
            last_modified: Some("Wed, 21 Oct 2015 07:28:00 GMT".to_string()),
            etag: None,
        };
        apply_conditional_headers(&mut headers, &Method::POST, &state);

        assert!(headers.get(IF_MODIFIED_SINCE).is_none());
    }

    #[test]
    fn no_conditional_headers_on_first_poll() {
        let mut headers = HeaderMap::new();
        apply_conditional_headers(&mut headers, &Method::GET, &EndpointState::default());
        assert!(headers.is_empty());
    }
}
