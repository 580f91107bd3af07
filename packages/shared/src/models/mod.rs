pub mod auth;
pub mod events;
pub mod match_session;
pub mod matches;
pub mod profile;
pub mod queue;
