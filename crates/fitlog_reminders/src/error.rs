//! Error types for the reminder jobs and their trigger surface.

use fitlog_client::FitLogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("backend error: {0}")]
    Backend(#[from] FitLogError),

    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<String> for ReminderError {
    fn from(err: String) -> Self {
        ReminderError::Internal(err)
    }
}

pub type ReminderResult<T> = Result<T, ReminderError>;
