/// Outcome types returned to the capture host
/// Every lifecycle callback resolves to success or one of three error kinds

use crate::db::DatabaseError;
use shared::ValidationError;
use thiserror::Error;

/// Unrecoverable condition that aborts the whole batch
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("Failed to acquire backend connection: {0}")]
    ConnectionFailed(#[source] DatabaseError),
    #[error("Backend lookup failed: {0}")]
    LookupFailed(#[source] DatabaseError),
    #[error("Invalid lifecycle transition: {event} while {state}")]
    InvalidTransition { event: &'static str, state: &'static str },
}

#[derive(Error, Debug)]
pub enum ValidatorError {
    /// Current field or document needs operator correction; the batch continues
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Current document is skipped outright; the batch continues
    #[error("Document rejected: {reason}")]
    RejectDocument { reason: String },
    /// The batch is aborted
    #[error("Fatal: {0}")]
    Fatal(#[from] FatalError),
}

impl ValidatorError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidatorError::Fatal(_))
    }
}

pub type ValidatorResult<T> = std::result::Result<T, ValidatorError>;
