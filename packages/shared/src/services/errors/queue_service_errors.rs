use std::fmt;

use crate::repositories::errors::profile_repository_errors::ProfileRepositoryError;
use crate::services::errors::match_service_errors::MatchServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueServiceError {
    AlreadyQueued,
    ValidationError(String),
    ProfileNotFound(String),
    MatchService(MatchServiceError),
    RepositoryError(String),
}

impl fmt::Display for QueueServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueueServiceError::AlreadyQueued => write!(f, "Already in the matchmaking queue"),
            QueueServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            QueueServiceError::ProfileNotFound(user_id) => {
                write!(f, "Profile {} not found", user_id)
            }
            QueueServiceError::MatchService(err) => write!(f, "Match service error: {}", err),
            QueueServiceError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for QueueServiceError {}

impl From<MatchServiceError> for QueueServiceError {
    fn from(error: MatchServiceError) -> Self {
        QueueServiceError::MatchService(error)
    }
}

impl From<ProfileRepositoryError> for QueueServiceError {
    fn from(error: ProfileRepositoryError) -> Self {
        match error {
            ProfileRepositoryError::NotFound(user_id) => QueueServiceError::ProfileNotFound(user_id),
            other => QueueServiceError::RepositoryError(other.to_string()),
        }
    }
}
