use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("not connected")]
    NotConnected,

    #[error("lock held by another instance")]
    LockHeld,

    #[error("sender not allowlisted")]
    NotAllowlisted,

    #[error("no target agent could be resolved")]
    NoTargetAgent,

    #[error("session error: {0}")]
    Session(#[from] pulsegate_sessions::SessionError),

    #[error("timeout waiting for {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
