// libs/notification-cell/src/services/presence.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct LiveConnection {
    conn_id: Uuid,
    sender: UnboundedSender<String>,
}

/// Maps a party's identity to its zero-or-one live connection. Registration
/// on connect and deregistration on disconnect are the only mutators; the
/// relay only ever resolves.
pub struct PresenceDirectory {
    connections: Arc<RwLock<HashMap<Uuid, LiveConnection>>>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Associate a fresh connection with this identity, replacing any prior
    /// one (the replaced receiver's channel closes). Returns the connection
    /// id to hand back on deregistration.
    pub async fn register(&self, party_id: Uuid) -> (Uuid, UnboundedReceiver<String>) {
        let (sender, receiver) = unbounded_channel();
        let conn_id = Uuid::new_v4();

        let mut connections = self.connections.write().await;
        connections.insert(party_id, LiveConnection { conn_id, sender });

        debug!("Registered live connection {} for party {}", conn_id, party_id);
        (conn_id, receiver)
    }

    /// Remove the identity's connection, but only if it is still the one
    /// identified by `conn_id` — a stale disconnect must not evict a newer
    /// connection that replaced it.
    pub async fn deregister(&self, party_id: Uuid, conn_id: Uuid) {
        let mut connections = self.connections.write().await;
        if connections
            .get(&party_id)
            .map(|conn| conn.conn_id == conn_id)
            .unwrap_or(false)
        {
            connections.remove(&party_id);
            debug!("Deregistered live connection {} for party {}", conn_id, party_id);
        }
    }

    pub async fn resolve(&self, party_id: Uuid) -> Option<UnboundedSender<String>> {
        let connections = self.connections.read().await;
        connections.get(&party_id).map(|conn| conn.sender.clone())
    }

    pub async fn live_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for PresenceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PresenceDirectory {
    fn clone(&self) -> Self {
        Self {
            connections: Arc::clone(&self.connections),
        }
    }
}
