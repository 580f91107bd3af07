use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No live channel for the identity, or delivery to it just failed.
    NotConnected(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegistryError::NotConnected(user_id) => write!(f, "User {} is not connected", user_id),
        }
    }
}

impl std::error::Error for RegistryError {}
