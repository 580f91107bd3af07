use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use shared::services::errors::{
    auth_service_errors::AuthServiceError, match_service_errors::MatchServiceError,
    queue_service_errors::QueueServiceError,
};

#[derive(Debug)]
pub enum ApiError {
    AuthService(AuthServiceError),
    MatchService(MatchServiceError),
    QueueService(QueueServiceError),
}

impl From<AuthServiceError> for ApiError {
    fn from(error: AuthServiceError) -> Self {
        ApiError::AuthService(error)
    }
}

impl From<MatchServiceError> for ApiError {
    fn from(error: MatchServiceError) -> Self {
        ApiError::MatchService(error)
    }
}

impl From<QueueServiceError> for ApiError {
    fn from(error: QueueServiceError) -> Self {
        ApiError::QueueService(error)
    }
}

fn match_status(error: &MatchServiceError) -> StatusCode {
    match error {
        MatchServiceError::ValidationError(_) | MatchServiceError::SelfChallenge => {
            StatusCode::BAD_REQUEST
        }
        MatchServiceError::OpponentNotFound
        | MatchServiceError::ProfileNotFound(_)
        | MatchServiceError::MatchNotFound => StatusCode::NOT_FOUND,
        MatchServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        MatchServiceError::InvalidState(_)
        | MatchServiceError::DuplicateActiveMatch
        | MatchServiceError::ConcurrentModification => StatusCode::CONFLICT,
        MatchServiceError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
        MatchServiceError::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthService(AuthServiceError::JwtError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::AuthService(_) => StatusCode::UNAUTHORIZED,

            ApiError::MatchService(e) => match_status(e),

            ApiError::QueueService(QueueServiceError::AlreadyQueued) => StatusCode::CONFLICT,
            ApiError::QueueService(QueueServiceError::ValidationError(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::QueueService(QueueServiceError::ProfileNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::QueueService(QueueServiceError::MatchService(e)) => match_status(e),
            ApiError::QueueService(QueueServiceError::RepositoryError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::AuthService(e) => e.to_string(),
            ApiError::MatchService(e) => e.to_string(),
            ApiError::QueueService(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self.message(), "Request failed");
            "Internal server error".to_string()
        } else {
            self.message()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
