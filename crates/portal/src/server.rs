//! `PortalServer` builder and server loop.
//!
//! This is the entry point for running a Portal server. It ties the layers
//! together: HTTP routes → session → room, plus the background sweep that
//! drops idle rooms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use portal_room::{RoomConfig, RoomRegistry};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{create_room, join_room, room_exists};
use crate::{PortalError, ServerConfig};

/// Shared server state passed to each request handler.
///
/// The registry is only locked to create, look up, or sweep rooms. Once a
/// session has its room handle, edits never touch this lock.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomRegistry>,
}

/// Builder for configuring and starting a Portal server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use portal::prelude::*;
///
/// # async fn demo() -> Result<(), PortalError> {
/// let server = PortalServer::builder()
///     .bind("127.0.0.1:5000")
///     .sweep_interval(Duration::from_secs(30))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PortalServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    sweep_interval: Duration,
    seed: Option<u64>,
}

impl PortalServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            room_config: defaults.room_config(),
            sweep_interval: defaults.sweep_interval(),
            seed: None,
        }
    }

    /// Starts from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new()
            .bind(&config.bind_addr())
            .room_config(config.room_config())
            .sweep_interval(config.sweep_interval())
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration applied to every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how often idle rooms are swept.
    pub fn sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }

    /// Makes room codes deterministic. Intended for tests.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Binds the listener. The server does not accept anything until
    /// [`PortalServer::run`] is called.
    pub async fn build(self) -> Result<PortalServer, PortalError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;

        let registry = match self.seed {
            Some(seed) => RoomRegistry::with_seed(self.room_config, seed),
            None => RoomRegistry::new(self.room_config),
        };

        Ok(PortalServer {
            listener,
            state: Arc::new(ServerState {
                rooms: Mutex::new(registry),
            }),
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for PortalServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Portal server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct PortalServer {
    listener: TcpListener,
    state: Arc<ServerState>,
    sweep_interval: Duration,
}

impl PortalServer {
    /// Creates a new builder.
    pub fn builder() -> PortalServerBuilder {
        PortalServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves HTTP and WebSocket traffic until the process is terminated,
    /// sweeping idle rooms in the background.
    pub async fn run(self) -> Result<(), PortalError> {
        let addr = self.local_addr()?;
        let app = router(Arc::clone(&self.state));
        let sweeper = tokio::spawn(sweep_rooms(
            Arc::clone(&self.state),
            self.sweep_interval,
        ));

        tracing::info!(%addr, "portal server running");
        let result = axum::serve(self.listener, app).await;

        sweeper.abort();
        result.map_err(PortalError::Io)
    }
}

/// Builds the HTTP routes.
pub(crate) fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/create", get(create_room).post(create_room))
        .route("/exists", get(room_exists))
        .route("/ws", get(join_room))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Periodically drops rooms that have sat empty past their grace period.
async fn sweep_rooms(state: Arc<ServerState>, every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
    // The first tick completes immediately; nothing can be idle yet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let mut rooms = state.rooms.lock().await;
        let reaped = rooms.reap_idle().await;
        if !reaped.is_empty() {
            tracing::info!(
                reaped = reaped.len(),
                remaining = rooms.room_count(),
                "swept idle rooms"
            );
        }
    }
}
