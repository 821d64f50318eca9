use thiserror::Error;

/// Errors that can occur within the scheduling subsystem (Scheduler,
/// Concurrency Gate, Pulse Executor).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid routine: {0}")]
    InvalidRoutine(String),

    #[error("Routine not found: {id}")]
    RoutineNotFound { id: String },

    #[error("Agent not found: {id}")]
    AgentNotFound { id: String },

    #[error("Manual trigger already in progress")]
    AlreadyInProgress,

    #[error("Manual trigger timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
