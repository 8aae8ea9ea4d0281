use beacon_record::RecordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainCompileError {
    #[error(transparent)]
    Shape(#[from] RecordError),
}
