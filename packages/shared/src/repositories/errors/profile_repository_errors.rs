#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRepositoryError {
    NotFound(String),
    /// The named player cannot cover a debit in the batch.
    InsufficientFunds(String),
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for ProfileRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileRepositoryError::NotFound(user_id) => write!(f, "Profile {} not found", user_id),
            ProfileRepositoryError::InsufficientFunds(user_id) => {
                write!(f, "Profile {} has insufficient coins", user_id)
            }
            ProfileRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            ProfileRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for ProfileRepositoryError {}
