use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::HttpError;

/// Sessions are keyed by (cookies_file, extra headers) so entities that
/// share auth share sockets and cookie jars (§4.4 "Session storage").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    cookies_file: Option<String>,
    headers: Vec<(String, String)>,
}

impl SessionKey {
    fn new(cookies_file: Option<&str>, default_headers: &BTreeMap<String, String>) -> Self {
        Self {
            cookies_file: cookies_file.map(str::to_string),
            headers: default_headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

pub struct Session {
    pub client: reqwest::Client,
    pub jar: Arc<reqwest::cookie::Jar>,
}

/// Caches one `reqwest::Client` per session key, so plugins that share
/// cookies/headers reuse the same connection pool instead of paying a new
/// TLS handshake per entity.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionKey, Arc<Session>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn session(
        &self,
        cookies_file: Option<&str>,
        default_headers: &BTreeMap<String, String>,
    ) -> Result<Arc<Session>, HttpError> {
        let key = SessionKey::new(cookies_file, default_headers);

        if let Some(existing) = self.sessions.read().await.get(&key) {
            return Ok(existing.clone());
        }

        let jar = Arc::new(reqwest::cookie::Jar::default());
        if let Some(path) = cookies_file {
            load_netscape_cookie_file(path, &jar)?;
        }

        let mut headers = HeaderMap::new();
        for (k, v) in default_headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| HttpError::InvalidHeaderName(k.clone(), e))?;
            let value = HeaderValue::from_str(v).map_err(|e| HttpError::InvalidHeader(k.clone(), e))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(headers)
            .build()
            .map_err(HttpError::ClientBuild)?;

        let session = Arc::new(Session { client, jar });
        self.sessions.write().await.insert(key, session.clone());
        info!(cookies_file = ?cookies_file, "created new HTTP session");
        Ok(session)
    }
}

/// Parses a Netscape-format cookie file and loads each line into `jar`.
/// Fields are `domain, flag, path, secure, expiry, name, value` tab-separated.
fn load_netscape_cookie_file(path: &str, jar: &reqwest::cookie::Jar) -> Result<(), HttpError> {
    let contents = std::fs::read_to_string(path).map_err(|e| HttpError::CookieFile(path.to_string(), e))?;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        let domain = fields[0].trim_start_matches('.');
        let name = fields[5];
        let value = fields[6];
        let cookie_str = format!("{name}={value}; Domain={domain}");
        if let Ok(url) = url::Url::parse(&format!("https://{domain}/")) {
            jar.add_cookie_str(&cookie_str, &url);
        }
    }
    Ok(())
}
