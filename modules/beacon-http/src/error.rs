use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("invalid header name '{0}': {1}")]
    InvalidHeaderName(String, reqwest::header::InvalidHeaderName),

    #[error("invalid header value for '{0}': {1}")]
    InvalidHeader(String, reqwest::header::InvalidHeaderValue),

    #[error("failed to build client: {0}")]
    ClientBuild(reqwest::Error),

    #[error("failed to read cookie file {0}: {1}")]
    CookieFile(String, std::io::Error),
}
