//! Errors and their operational classification.

use thiserror::Error;

use super::TaskId;
use crate::ports::StoreError;

/// How an error should be handled by the caller.
///
/// - Caller: the request was malformed or targeted something that is not there.
/// - Protocol: an invariant broke (misuse or a race bug). Investigate, don't retry.
/// - Termination: graceful shutdown, not a fault.
/// - Infrastructure: the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Caller,
    Protocol,
    Termination,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum CoordError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{task_id} is not assigned to {consumer}")]
    OwnershipMismatch { task_id: TaskId, consumer: String },

    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("coordinator shut down")]
    Shutdown,

    #[error("store failure: {0}")]
    Transport(#[from] StoreError),
}

impl CoordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordError::InvalidInput(_) | CoordError::NotFound(_) => ErrorKind::Caller,
            CoordError::OwnershipMismatch { .. } | CoordError::Consistency(_) => {
                ErrorKind::Protocol
            }
            CoordError::Shutdown => ErrorKind::Termination,
            CoordError::Transport(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, CoordError::Shutdown)
    }
}

pub type Result<T> = std::result::Result<T, CoordError>;
