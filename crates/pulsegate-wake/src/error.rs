use thiserror::Error;

#[derive(Debug, Error)]
pub enum WakeError {
    #[error("counter store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, WakeError>;
