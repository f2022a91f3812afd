//! Session and listener registry.
//!
//! The relay's single source of truth for fan-out: which clients are
//! connected, which listener follows which broadcaster, and each
//! broadcaster's last known playback state. An explicit object owned by
//! the server instance, constructed at startup and torn down with it —
//! never ambient module state. Mutated only on connect, disconnect,
//! `START_LISTENING`/`STOP_LISTENING`, and broadcast-state recording,
//! never inferred from fan-out traffic.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use crate::protocol::ServerMessage;
use crate::types::{PlaybackAction, UserId};

/// In-memory registry of connections and listener edges.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    /// Connected, authenticated clients and their outgoing queues.
    clients: RwLock<HashMap<UserId, mpsc::Sender<ServerMessage>>>,
    /// Listener → broadcaster edges. A listener follows at most one
    /// broadcaster, so the listener id is the key.
    edges: RwLock<HashMap<UserId, UserId>>,
    /// Last playback state seen from each broadcaster.
    last_states: RwLock<HashMap<UserId, PlaybackAction>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an authenticated client to its outgoing queue.
    ///
    /// A reconnecting client replaces its previous queue.
    pub async fn register(&self, user: UserId, tx: mpsc::Sender<ServerMessage>) {
        self.clients.write().await.insert(user, tx);
    }

    /// Remove a client and every edge that references it.
    ///
    /// Cascades: the client's own listener edge, all edges naming it as
    /// broadcaster, and its last known state are removed, so no orphaned
    /// edge survives a disconnect.
    ///
    /// `tx` identifies the connection being torn down. If the user has
    /// already reconnected (the stored queue is a different channel) the
    /// call is a no-op: the old socket's close must not unregister the
    /// new connection.
    pub async fn unregister(&self, user: &UserId, tx: &mpsc::Sender<ServerMessage>) {
        {
            let mut clients = self.clients.write().await;
            match clients.get(user) {
                Some(current) if current.same_channel(tx) => {
                    clients.remove(user);
                }
                _ => return,
            }
        }
        self.last_states.write().await.remove(user);

        let mut edges = self.edges.write().await;
        edges.remove(user);
        edges.retain(|_, broadcaster| broadcaster != user);
    }

    /// Whether a client is currently connected.
    pub async fn is_connected(&self, user: &UserId) -> bool {
        self.clients.read().await.contains_key(user)
    }

    /// Record or overwrite the listener's edge.
    ///
    /// Returns the broadcaster that was previously followed, if any.
    pub async fn start_listening(&self, listener: UserId, broadcaster: UserId) -> Option<UserId> {
        self.edges.write().await.insert(listener, broadcaster)
    }

    /// Remove the listener's edge. Idempotent.
    ///
    /// Returns whether an edge existed.
    pub async fn stop_listening(&self, listener: &UserId) -> bool {
        self.edges.write().await.remove(listener).is_some()
    }

    /// The broadcaster a listener currently follows, if any.
    pub async fn listening_to(&self, listener: &UserId) -> Option<UserId> {
        self.edges.read().await.get(listener).cloned()
    }

    /// All connected listeners of a broadcaster, with their queues.
    ///
    /// Listeners whose connections have gone away are skipped; their
    /// edges are cleaned up by the disconnect path, not here.
    pub async fn listeners_of(
        &self,
        broadcaster: &UserId,
    ) -> Vec<(UserId, mpsc::Sender<ServerMessage>)> {
        let edges = self.edges.read().await;
        let clients = self.clients.read().await;
        edges
            .iter()
            .filter(|(_, target)| *target == broadcaster)
            .filter_map(|(listener, _)| {
                clients
                    .get(listener)
                    .map(|tx| (listener.clone(), tx.clone()))
            })
            .collect()
    }

    /// Record a broadcaster's most recent playback state.
    pub async fn record_state(&self, broadcaster: &UserId, action: PlaybackAction) {
        self.last_states
            .write()
            .await
            .insert(broadcaster.clone(), action);
    }

    /// A broadcaster's last known playback state, if any.
    pub async fn last_state(&self, broadcaster: &UserId) -> Option<PlaybackAction> {
        self.last_states.read().await.get(broadcaster).cloned()
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of active listener edges.
    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }
}
