use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("actor '{0}' has no entity named '{1}'")]
    UnknownEntity(String, String),

    #[error(transparent)]
    Record(#[from] beacon_record::RecordError),

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
