pub mod auth_service;
pub mod connection_registry;
pub mod errors;
pub mod escrow_ledger;
pub mod event_dispatcher;
pub mod expiry_service;
pub mod keyed_locks;
pub mod match_service;
pub mod matchmaking_queue;
pub mod player_service;
pub mod queue_service;
pub mod room_broadcaster;
pub mod stats_service;
