use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EventBusError>;
