//! `SapperServer` builder and accept loop.
//!
//! Ties the layers together: transport, protocol codec, room registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use seasapper_game::GameConfig;
use seasapper_protocol::{Codec, JsonCodec, RoomClosedReason};
use seasapper_room::{RoomConfig, RoomRegistry};
use seasapper_transport::{Transport, WebSocketTransport};
use tokio::sync::{Mutex, watch};
use tokio::time::{self, Instant};

use crate::handler::handle_connection;
use crate::{ServerConfig, ServerError};

/// Shared state handed to every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) codec: C,
    /// Flips to `true` once the server starts shutting down.
    pub(crate) shutdown: watch::Receiver<bool>,
}

/// Builder for a [`SapperServer`].
///
/// ```rust,ignore
/// let server = SapperServer::builder()
///     .bind("127.0.0.1:3000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct SapperServerBuilder {
    config: ServerConfig,
}

impl SapperServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Starts from an existing config, e.g. one read by
    /// [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.addr = addr.to_owned();
        self
    }

    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    pub fn rules(mut self, rules: GameConfig) -> Self {
        self.config.room.rules = rules;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Binds the listener. Uses `JsonCodec` on the wire.
    pub async fn build(self) -> Result<SapperServer<JsonCodec>, ServerError> {
        let transport = WebSocketTransport::bind(&self.config.addr).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(self.config.room.clone())),
            codec: JsonCodec,
            shutdown: shutdown_rx,
        });

        Ok(SapperServer {
            transport,
            state,
            shutdown_tx,
            sweep_interval: self.config.sweep_interval,
        })
    }
}

impl Default for SapperServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Seasapper server. Call [`run`](Self::run) to serve.
pub struct SapperServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    shutdown_tx: watch::Sender<bool>,
    sweep_interval: Duration,
}

impl SapperServer<JsonCodec> {
    pub fn builder() -> SapperServerBuilder {
        SapperServerBuilder::new()
    }
}

impl<C> SapperServer<C>
where
    C: Codec + Send + Sync + 'static,
{
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.transport.local_addr()?)
    }

    /// Serves until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Ctrl-C received");
        })
        .await
    }

    /// Serves until `shutdown` resolves, then closes every room.
    ///
    /// Each accepted connection gets its own task. Idle rooms are swept
    /// every `sweep_interval`.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        tracing::info!(addr = %self.local_addr()?, "Seasapper server running");
        tokio::pin!(shutdown);

        let period = self.sweep_interval.max(Duration::from_secs(1));
        let mut sweep = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(conn, state).await {
                                tracing::debug!(%err, "connection ended with error");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::error!(%err, "accept failed");
                    }
                },
                _ = sweep.tick() => {
                    let mut registry = self.state.registry.lock().await;
                    let removed = registry.sweep_idle().await;
                    tracing::debug!(
                        removed,
                        active = registry.active_room_count(),
                        "idle sweep finished"
                    );
                }
                () = &mut shutdown => break,
            }
        }

        tracing::info!("shutting down");
        self.state
            .registry
            .lock()
            .await
            .shutdown_all(RoomClosedReason::Server)
            .await;
        let _ = self.shutdown_tx.send(true);
        self.transport.shutdown().await?;
        Ok(())
    }
}
