use thiserror::Error;

/// Upper bound on persisted error text, so upstream failures cannot grow
/// the store or leak unbounded content into the display.
pub const MAX_ERROR_LEN: usize = 200;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("invalid polish request: {0}")]
    Validation(String),
    #[error("a polish job is already running")]
    AlreadyRunning,
    #[error("polish job cancelled")]
    Cancelled,
    #[error("polish transport error: {0}")]
    Transport(String),
    #[error("store persistence error: {0}")]
    Persistence(String),
}

pub type JobResult<T> = Result<T, JobError>;

/// Truncates a message to [`MAX_ERROR_LEN`] characters on a char boundary.
pub fn truncate_error(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_LEN {
        return message.to_owned();
    }
    message.chars().take(MAX_ERROR_LEN).collect()
}
