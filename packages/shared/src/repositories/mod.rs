pub mod errors;
pub mod match_repository;
pub mod profile_repository;
