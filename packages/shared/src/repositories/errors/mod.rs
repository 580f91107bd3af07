pub mod match_repository_errors;
pub mod profile_repository_errors;
