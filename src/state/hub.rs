//! Per-match broadcast channels used for realtime fan-out.

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::events::ServerEvent;

/// Broadcast hub wrapper for one match's logical channel.
pub struct EventHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    ///
    /// Delivery is at-most-once per subscriber; a lagging subscriber skips
    /// events rather than stalling the sender.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Registry of per-match hubs, created lazily on first use.
pub struct MatchChannels {
    capacity: usize,
    hubs: DashMap<Uuid, EventHub>,
}

impl MatchChannels {
    /// Build an empty registry whose hubs use the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            hubs: DashMap::new(),
        }
    }

    /// Subscribe to a match channel, creating the hub if needed.
    pub fn subscribe(&self, match_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(match_id)
            .or_insert_with(|| EventHub::new(self.capacity))
            .subscribe()
    }

    /// Broadcast an event on a match channel, creating the hub if needed.
    ///
    /// Events are sent while the caller still holds the match lock, so the
    /// per-channel ordering matches the order mutations were committed.
    pub fn broadcast(&self, match_id: Uuid, event: ServerEvent) {
        self.hubs
            .entry(match_id)
            .or_insert_with(|| EventHub::new(self.capacity))
            .broadcast(event);
    }

    /// Drop the hub of a match whose lifecycle has ended.
    pub fn remove(&self, match_id: Uuid) {
        self.hubs.remove(&match_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ServerEvent {
        ServerEvent {
            event: name.to_string(),
            data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_in_commit_order() {
        let channels = MatchChannels::new(8);
        let match_id = Uuid::new_v4();
        let mut receiver = channels.subscribe(match_id);

        channels.broadcast(match_id, event("first"));
        channels.broadcast(match_id, event("second"));

        assert_eq!(receiver.recv().await.unwrap().event, "first");
        assert_eq!(receiver.recv().await.unwrap().event, "second");
    }

    #[tokio::test]
    async fn channels_are_isolated_per_match() {
        let channels = MatchChannels::new(8);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut receiver_a = channels.subscribe(a);

        channels.broadcast(b, event("elsewhere"));
        channels.broadcast(a, event("here"));

        assert_eq!(receiver_a.recv().await.unwrap().event, "here");
    }
}
