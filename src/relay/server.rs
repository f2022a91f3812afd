//! WebSocket relay server.
//!
//! A stateful rendezvous point: authenticates connections, answers
//! timing requests, tracks listener edges, and fans playback actions out
//! to listeners with a relay-clock execution deadline.
//!
//! Each connection moves through `Connecting → Authenticated → (Idle |
//! Listening | Broadcasting)`, with `Disconnected` terminal from any
//! state. Malformed frames are logged and ignored rather than tearing
//! the connection down; a failed `authenticate` closes it (fail closed).

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use super::directory::UserDirectory;
use super::registry::ListenerRegistry;
use crate::clock::{SharedClock, system_clock};
use crate::error::Result;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::{PlaybackAction, RelayConfig, ScheduledAction, UserId};

/// Per-connection state. `user_id` is set once authenticated.
#[derive(Debug, Default)]
pub(crate) struct ConnState {
    user_id: Option<UserId>,
}

/// The relay server.
pub struct RelayServer {
    config: RelayConfig,
    registry: Arc<ListenerRegistry>,
    directory: Arc<dyn UserDirectory>,
    wall_clock: SharedClock,
}

impl RelayServer {
    /// Create a relay using the system wall clock.
    #[must_use]
    pub fn new(config: RelayConfig, directory: Arc<dyn UserDirectory>) -> Self {
        Self::with_clock(config, directory, system_clock())
    }

    /// Create a relay with an explicit wall clock (used by tests).
    #[must_use]
    pub fn with_clock(
        config: RelayConfig,
        directory: Arc<dyn UserDirectory>,
        wall_clock: SharedClock,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(ListenerRegistry::new()),
            directory,
            wall_clock,
        }
    }

    /// Handle to the server's registry.
    #[must_use]
    pub fn registry(&self) -> Arc<ListenerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Run the accept loop until the shutdown signal flips.
    ///
    /// # Errors
    /// Returns an error if accepting on the listener fails.
    pub async fn run(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        tracing::info!(addr = ?listener.local_addr(), "relay server listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer) = result?;
                    tracing::debug!(%peer, "client connected");
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream).await {
                            tracing::debug!(%peer, "connection ended: {e}");
                        }
                    });
                }

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("relay server shutting down");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Drive one client connection to completion.
    async fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let ws = accept_async(stream).await?;
        let (mut ws_tx, mut ws_rx) = ws.split();

        // Outgoing frames are queued through a channel so fan-out from
        // other connections never blocks on this socket.
        let (tx, mut rx) = mpsc::channel::<ServerMessage>(self.config.send_queue);
        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let frame = match msg.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("failed to encode outgoing frame: {e}");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
        });

        let mut conn = ConnState::default();

        while let Some(frame) = ws_rx.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("websocket read error: {e}");
                    break;
                }
            };
            // T1 for timing requests: captured as close to the wire as
            // possible, before parse and dispatch.
            let received_at_ms = self.wall_clock.now_ms();

            match ClientMessage::from_frame(&text) {
                Ok(msg) => {
                    if !self.dispatch(msg, received_at_ms, &tx, &mut conn).await {
                        break;
                    }
                }
                Err(e) => {
                    // Robustness over strictness: the connection survives.
                    tracing::warn!("ignoring malformed frame: {e}");
                }
            }
        }

        if let Some(user) = conn.user_id.take() {
            self.registry.unregister(&user, &tx).await;
            tracing::info!(%user, "client disconnected");
        } else {
            tracing::debug!("unauthenticated client disconnected");
        }
        writer.abort();
        Ok(())
    }

    /// Handle one parsed message. Returns `false` to close the connection.
    pub(crate) async fn dispatch(
        &self,
        msg: ClientMessage,
        received_at_ms: f64,
        tx: &mpsc::Sender<ServerMessage>,
        conn: &mut ConnState,
    ) -> bool {
        match msg {
            ClientMessage::Authenticate { token } => {
                match self.directory.verify_token(&token).await {
                    Some(user) => {
                        self.registry.register(user.clone(), tx.clone()).await;
                        tracing::info!(%user, "client authenticated");
                        conn.user_id = Some(user);
                        true
                    }
                    None => {
                        tracing::warn!("authentication failed, closing connection");
                        false
                    }
                }
            }

            // Timing requests are answered pre-authentication as well:
            // clients sync their clocks while logging in.
            ClientMessage::NtpRequest { t0 } => {
                let t1 = received_at_ms;
                let t2 = self.wall_clock.now_ms();
                if tx
                    .send(ServerMessage::NtpResponse { t0, t1, t2 })
                    .await
                    .is_err()
                {
                    return false;
                }
                true
            }

            ClientMessage::BroadcastAction { payload } => {
                if let Some(user) = conn.user_id.clone() {
                    self.broadcast_action(&user, payload).await;
                }
                true
            }

            ClientMessage::StartListening { target_user_id } => {
                if let Some(user) = conn.user_id.clone() {
                    self.start_listening(&user, &target_user_id, tx).await;
                }
                true
            }

            ClientMessage::StopListening => {
                if let Some(user) = conn.user_id.clone() {
                    if self.registry.stop_listening(&user).await {
                        tracing::info!(listener = %user, "stopped listening");
                    }
                }
                true
            }
        }
    }

    /// Fan a playback action out to every listener of `broadcaster`.
    ///
    /// The execution deadline is strictly in the relay's future: now
    /// plus the schedule buffer, giving the action time to travel.
    pub(crate) async fn broadcast_action(&self, broadcaster: &UserId, payload: PlaybackAction) {
        self.registry.record_state(broadcaster, payload.clone()).await;

        let scheduled = ScheduledAction {
            action: payload,
            server_time_to_execute: self.wall_clock.now_ms() + self.config.schedule_buffer_ms(),
        };

        let listeners = self.registry.listeners_of(broadcaster).await;
        tracing::debug!(
            %broadcaster,
            listeners = listeners.len(),
            deadline = scheduled.server_time_to_execute,
            "fanning out action"
        );
        for (listener, tx) in listeners {
            if tx
                .send(ServerMessage::ScheduledAction(scheduled.clone()))
                .await
                .is_err()
            {
                tracing::debug!(%listener, "listener queue closed, skipping");
            }
        }
    }

    /// Record a listener edge and replay the broadcaster's current state.
    ///
    /// The edge is recorded even when the broadcaster is unknown or
    /// offline: future actions apply once they reconnect. Late joiners
    /// get one synthesized action immediately when state is known, so
    /// they see current playback without waiting for the next change.
    pub(crate) async fn start_listening(
        &self,
        listener: &UserId,
        broadcaster: &UserId,
        tx: &mpsc::Sender<ServerMessage>,
    ) {
        self.registry
            .start_listening(listener.clone(), broadcaster.clone())
            .await;
        tracing::info!(%listener, %broadcaster, "started listening");

        let state = match self.registry.last_state(broadcaster).await {
            Some(state) => Some(state),
            None => self
                .directory
                .lookup_user(broadcaster)
                .await
                .and_then(|profile| profile.now_playing),
        };

        match state {
            Some(action) => {
                let scheduled = ScheduledAction {
                    action,
                    server_time_to_execute: self.wall_clock.now_ms()
                        + self.config.schedule_buffer_ms(),
                };
                if tx
                    .send(ServerMessage::ScheduledAction(scheduled))
                    .await
                    .is_err()
                {
                    tracing::debug!(%listener, "listener queue closed during replay");
                }
            }
            None => {
                tracing::debug!(
                    %broadcaster,
                    "no known state to replay, edge recorded optimistically"
                );
            }
        }
    }
}
