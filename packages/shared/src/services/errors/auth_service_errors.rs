use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthServiceError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    WrongTokenType,
    JwtError(String),
}

impl fmt::Display for AuthServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthServiceError::MissingToken => write!(f, "Missing access token"),
            AuthServiceError::InvalidToken => write!(f, "Invalid JWT token"),
            AuthServiceError::ExpiredToken => write!(f, "JWT token has expired"),
            AuthServiceError::WrongTokenType => write!(f, "Token is not an access token"),
            AuthServiceError::JwtError(msg) => write!(f, "JWT error: {}", msg),
        }
    }
}

impl std::error::Error for AuthServiceError {}
