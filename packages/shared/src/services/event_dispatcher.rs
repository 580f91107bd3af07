use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::events::ServerEvent;
use crate::services::room_broadcaster::RoomBroadcaster;

/// One unit of outbound work for the delivery task.
#[derive(Debug, Clone)]
pub enum Dispatch {
    User {
        user_id: String,
        event: ServerEvent,
    },
    Room {
        room_id: String,
        event: ServerEvent,
        excluding: Option<String>,
    },
    Join {
        user_id: String,
        room_id: String,
    },
}

/// Cheap handle used by services to queue notifications. Queuing never
/// blocks and never fails the caller.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl Notifier {
    /// A notifier plus the raw receiving end, for callers that run their own
    /// delivery loop.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Dispatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Notifier { tx }, rx)
    }

    fn queue(&self, dispatch: Dispatch) {
        if self.tx.send(dispatch).is_err() {
            warn!("Event dispatcher stopped, dropping notification");
        }
    }

    pub fn to_user(&self, user_id: &str, event: ServerEvent) {
        self.queue(Dispatch::User {
            user_id: user_id.to_string(),
            event,
        });
    }

    pub fn to_room(&self, room_id: &str, event: ServerEvent, excluding: Option<&str>) {
        self.queue(Dispatch::Room {
            room_id: room_id.to_string(),
            event,
            excluding: excluding.map(str::to_string),
        });
    }

    pub fn join_room(&self, user_id: &str, room_id: &str) {
        self.queue(Dispatch::Join {
            user_id: user_id.to_string(),
            room_id: room_id.to_string(),
        });
    }
}

pub async fn deliver(broadcaster: &RoomBroadcaster, dispatch: Dispatch) {
    match dispatch {
        Dispatch::User { user_id, event } => {
            if let Err(e) = broadcaster.registry().send(&user_id, event).await {
                debug!(error = %e, "User notification not delivered");
            }
        }
        Dispatch::Room {
            room_id,
            event,
            excluding,
        } => {
            let delivered = broadcaster
                .send_to_room(&room_id, event, excluding.as_deref())
                .await;
            debug!(room_id = %room_id, delivered, "Room notification delivered");
        }
        Dispatch::Join { user_id, room_id } => {
            broadcaster.join(&user_id, &room_id).await;
        }
    }
}

/// Starts the delivery task. It runs until every [`Notifier`] clone is dropped.
pub fn spawn_dispatcher(broadcaster: RoomBroadcaster) -> (Notifier, JoinHandle<()>) {
    let (notifier, mut rx) = Notifier::channel();
    let handle = tokio::spawn(async move {
        while let Some(dispatch) = rx.recv().await {
            deliver(&broadcaster, dispatch).await;
        }
        debug!("Event dispatcher finished");
    });
    (notifier, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::connection_registry::{ConnectionRegistry, Outgoing};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dispatcher_joins_then_broadcasts_in_order() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = RoomBroadcaster::new(registry.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("a", tx).await;

        let (notifier, handle) = spawn_dispatcher(broadcaster.clone());
        notifier.join_room("a", "m1");
        notifier.to_room("m1", ServerEvent::RoomJoined { room_id: "m1".into() }, None);
        notifier.to_user("a", ServerEvent::error("direct"));
        notifier.to_user("ghost", ServerEvent::error("nobody"));
        drop(notifier);
        handle.await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(Outgoing::Event(event)) = rx.try_recv() {
            kinds.push(serde_json::to_value(&event).unwrap()["type"].clone());
        }
        assert_eq!(kinds, vec!["online_count", "room_joined", "error"]);
        assert_eq!(broadcaster.members("m1").await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_notifier_survives_stopped_dispatcher() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);

        notifier.to_user("a", ServerEvent::error("lost"));
    }
}
