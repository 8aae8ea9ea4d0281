/// Per URL+method+params tuple: the conditional-request headers the HTTP
/// engine carries forward between polls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointState {
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}
