use thiserror::Error;

/// Errors produced by the data-model layer: malformed topics, malformed
/// chains, and field-level conversion failures.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("field '{0}' is not a valid RFC3339 datetime: {1}")]
    InvalidTimezoneField(String, String),

    #[error("timezone '{0}' is neither a numeric offset nor a known IANA zone name")]
    InvalidTimezone(String),

    #[error("invalid topic string '{0}', expected <direction>/<actor>/<entity>/<chain>")]
    InvalidTopic(String),

    #[error("topic direction must be 'inputs' or 'output', got '{0}'")]
    InvalidDirection(String),

    #[error("chain '{name}' must have at least 2 cards, found {found}")]
    ChainTooShort { name: String, found: usize },

    #[error("chain '{chain}' card for actor '{actor}' lists no entities")]
    ChainCardEmpty { chain: String, actor: String },

    #[error("chain '{chain}' references entity '{actor}:{entity}' more than once")]
    ChainDuplicateEntity {
        chain: String,
        actor: String,
        entity: String,
    },
}
