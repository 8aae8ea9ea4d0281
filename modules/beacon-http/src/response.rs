use reqwest::header::HeaderMap;

use crate::endpoint::EndpointState;

/// Normalized result of a single HTTP attempt. `status: None` means a
/// transport exception occurred (connection failure, timeout, DNS) — the
/// caller treats it as "no response" rather than inspecting `ok`.
#[derive(Debug, Clone)]
pub struct Response {
    pub ok: bool,
    pub status: Option<u16>,
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub cookies: Vec<(String, String)>,
    pub text: String,
    pub endpoint_state: EndpointState,
}

impl Response {
    pub fn is_transport_failure(&self) -> bool {
        self.status.is_none()
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == Some(304)
    }
}
