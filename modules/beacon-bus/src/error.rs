use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to dump bus state to {0}: {1}")]
    DumpState(String, std::io::Error),

    #[error("failed to apply bus state from {0}: {1}")]
    ApplyState(String, std::io::Error),

    #[error("failed to serialize history for {0}: {1}")]
    Serialize(String, serde_json::Error),

    #[error("failed to deserialize history from {0}: {1}")]
    Deserialize(String, serde_json::Error),
}
