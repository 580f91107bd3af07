pub mod health;
pub mod matches;
pub mod players;
pub mod queue;
pub mod websocket;
