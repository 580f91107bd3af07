use std::fmt;

use crate::models::match_session::{InvalidTransition, MatchStatus};
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::repositories::errors::profile_repository_errors::ProfileRepositoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchServiceError {
    ValidationError(String),
    SelfChallenge,
    OpponentNotFound,
    ProfileNotFound(String),
    MatchNotFound,
    Forbidden(String),
    InvalidState(MatchStatus),
    DuplicateActiveMatch,
    InsufficientFunds(String),
    ConcurrentModification,
    RepositoryError(String),
}

impl fmt::Display for MatchServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            MatchServiceError::SelfChallenge => write!(f, "You cannot challenge yourself"),
            MatchServiceError::OpponentNotFound => write!(f, "Opponent not found"),
            MatchServiceError::ProfileNotFound(user_id) => {
                write!(f, "Profile {} not found", user_id)
            }
            MatchServiceError::MatchNotFound => write!(f, "Match not found"),
            MatchServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            MatchServiceError::InvalidState(status) => {
                write!(f, "Operation not allowed while match is {}", status)
            }
            MatchServiceError::DuplicateActiveMatch => {
                write!(f, "An active match against this opponent already exists")
            }
            MatchServiceError::InsufficientFunds(user_id) => {
                write!(f, "Insufficient coins for {}", user_id)
            }
            MatchServiceError::ConcurrentModification => {
                write!(f, "Match was modified concurrently, retry the request")
            }
            MatchServiceError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for MatchServiceError {}

impl From<MatchRepositoryError> for MatchServiceError {
    fn from(error: MatchRepositoryError) -> Self {
        match error {
            MatchRepositoryError::NotFound => MatchServiceError::MatchNotFound,
            MatchRepositoryError::VersionConflict => MatchServiceError::ConcurrentModification,
            other => MatchServiceError::RepositoryError(other.to_string()),
        }
    }
}

impl From<ProfileRepositoryError> for MatchServiceError {
    fn from(error: ProfileRepositoryError) -> Self {
        match error {
            ProfileRepositoryError::NotFound(user_id) => MatchServiceError::ProfileNotFound(user_id),
            ProfileRepositoryError::InsufficientFunds(user_id) => {
                MatchServiceError::InsufficientFunds(user_id)
            }
            other => MatchServiceError::RepositoryError(other.to_string()),
        }
    }
}

impl From<InvalidTransition> for MatchServiceError {
    fn from(error: InvalidTransition) -> Self {
        MatchServiceError::InvalidState(error.from)
    }
}
