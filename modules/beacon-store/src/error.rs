use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create database directory {0}: {1}")]
    CreateDir(String, std::io::Error),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}
