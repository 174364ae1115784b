//! `Server` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → room. The
//! builder takes the three external collaborators (authenticator, target
//! provider, persistence sink) and produces a server that accepts
//! WebSocket connections and spawns one handler task per player.

use std::sync::Arc;
use std::time::Duration;

use pinpoint_protocol::{Codec, JsonCodec};
use pinpoint_room::{Coordinator, PersistenceSink, RoomConfig, TargetProvider};
use pinpoint_session::{Authenticator, ConnectionRegistry};
use pinpoint_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::PinpointError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// The coordinator sits behind one async mutex; room actors do the real
/// work in their own tasks, so the lock only covers index lookups and
/// dispatch bookkeeping.
pub(crate) struct ServerState<T, S, A, C>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec,
{
    pub(crate) coordinator: Mutex<Coordinator<T, S>>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) auth: A,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Pinpoint server.
pub struct ServerBuilder {
    bind_addr: String,
    room_defaults: RoomConfig,
    sweep_interval: Duration,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_defaults: RoomConfig::default(),
            sweep_interval: Duration::from_secs(60),
        }
    }

    /// Sets the address to bind to. Use port 0 for an OS-assigned port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the per-room defaults (capacity, idle grace, scoring).
    pub fn room_defaults(mut self, defaults: RoomConfig) -> Self {
        self.room_defaults = defaults;
        self
    }

    /// How often the idle-room eviction sweep runs.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Binds the listener and assembles the server with the given
    /// collaborators. Uses [`JsonCodec`] for the wire format.
    pub async fn build<T, S, A>(
        self,
        auth: A,
        targets: T,
        sink: S,
    ) -> Result<Server<T, S, A, JsonCodec>, PinpointError>
    where
        T: TargetProvider,
        S: PersistenceSink,
        A: Authenticator,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let registry = Arc::new(ConnectionRegistry::new());
        let coordinator = Coordinator::with_defaults(
            Arc::clone(&registry),
            targets,
            sink,
            self.room_defaults,
        );

        let state = Arc::new(ServerState {
            coordinator: Mutex::new(coordinator),
            registry,
            auth,
            codec: JsonCodec,
        });

        Ok(Server {
            transport,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Pinpoint server. Call [`run`](Self::run) to start accepting.
pub struct Server<T, S, A, C>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec,
{
    transport: WebSocketTransport,
    state: Arc<ServerState<T, S, A, C>>,
    sweep_interval: Duration,
}

impl<T, S, A, C> Server<T, S, A, C>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec + Clone,
{
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop and the idle-room sweeper until the process
    /// terminates.
    pub async fn run(mut self) -> Result<(), PinpointError> {
        tracing::info!("Pinpoint server running");

        // Eviction sweep, independent of any single room's activity.
        let sweep_state = Arc::clone(&self.state);
        let sweep_interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                let evicted = {
                    let mut coordinator = sweep_state.coordinator.lock().await;
                    coordinator.evict_idle_rooms().await
                };
                if !evicted.is_empty() {
                    tracing::debug!(count = evicted.len(), "idle sweep evicted rooms");
                }
            }
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
