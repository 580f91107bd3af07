use std::sync::Arc;
use tracing::debug;

use crate::models::events::ServerEvent;
use crate::services::connection_registry::ConnectionRegistry;

/// Named groups of connections (one per match) with fan-out delivery.
#[derive(Clone)]
pub struct RoomBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl RoomBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        RoomBroadcaster { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Adds `user_id` to `room_id`, creating the room if needed. Returns false
    /// if the identity has no live channel, in which case nothing changes.
    pub async fn join(&self, user_id: &str, room_id: &str) -> bool {
        let joined = self.registry.state().await.join(user_id, room_id);
        debug!(user_id = %user_id, room_id = %room_id, joined, "Room join");
        joined
    }

    /// Removes `user_id` from `room_id`; the room disappears with its last member.
    pub async fn leave(&self, user_id: &str, room_id: &str) -> bool {
        let left = self.registry.state().await.leave(user_id, room_id);
        debug!(user_id = %user_id, room_id = %room_id, left, "Room leave");
        left
    }

    /// Delivers to every member except `excluding`. Members whose channel has
    /// failed are disconnected. Returns the number of deliveries.
    pub async fn send_to_room(&self, room_id: &str, event: ServerEvent, excluding: Option<&str>) -> usize {
        let mut state = self.registry.state().await;
        let targets: Vec<String> = state
            .members(room_id)
            .into_iter()
            .filter(|member| Some(member.as_str()) != excluding)
            .collect();
        state.deliver(&targets, &event)
    }

    pub async fn members(&self, room_id: &str) -> Vec<String> {
        self.registry.state().await.members(room_id)
    }

    pub async fn rooms_of(&self, user_id: &str) -> Vec<String> {
        self.registry.state().await.rooms_of(user_id)
    }

    pub async fn room_exists(&self, room_id: &str) -> bool {
        self.registry.state().await.room_exists(room_id)
    }
}
