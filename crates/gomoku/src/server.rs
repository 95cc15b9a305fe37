//! `GomokuServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room service, with the
//! hub fanning notifications back out and the reaper running alongside.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gomoku_hub::{DEFAULT_QUEUE_CAPACITY, Hub};
use gomoku_protocol::JsonCodec;
use gomoku_room::{Reaper, RoomService, ServiceConfig};
use gomoku_store::RoomRepository;
use gomoku_transport::{Transport, WebSocketTransport};

use crate::GomokuError;
use crate::handler::handle_connection;

/// Shared state handed to every connection task.
pub(crate) struct ServerState<R> {
    pub(crate) service: Arc<RoomService<R, Hub>>,
    pub(crate) hub: Hub,
    pub(crate) codec: JsonCodec,
    pub(crate) handshake_timeout: Duration,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a gomoku server.
///
/// ```rust,ignore
/// let server = GomokuServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .idle_timeout(Duration::from_secs(120))
///     .build(MemoryRoomStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct GomokuServerBuilder {
    bind_addr: String,
    service_config: ServiceConfig,
    queue_capacity: usize,
    handshake_timeout: Duration,
    idle_timeout: Duration,
}

impl GomokuServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            service_config: ServiceConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Timeouts and the reaper schedule.
    pub fn service_config(mut self, config: ServiceConfig) -> Self {
        self.service_config = config;
        self
    }

    /// Outbound frames buffered per connection before notifications are
    /// dropped for it.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// How long a new connection has to send `hello`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// A connection silent for this long is closed. Clients keep it open
    /// with `ping`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and wires the service to `repo`.
    pub async fn build<R: RoomRepository>(self, repo: R) -> Result<GomokuServer<R>, GomokuError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let hub = Hub::new(self.queue_capacity);
        let service = Arc::new(RoomService::new(repo, hub.clone(), self.service_config));

        let state = Arc::new(ServerState {
            service,
            hub,
            codec: JsonCodec,
            handshake_timeout: self.handshake_timeout,
            idle_timeout: self.idle_timeout,
        });

        Ok(GomokuServer { transport, state })
    }
}

impl Default for GomokuServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound gomoku server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GomokuServer<R> {
    transport: WebSocketTransport,
    state: Arc<ServerState<R>>,
}

impl<R: RoomRepository> GomokuServer<R> {
    pub fn builder() -> GomokuServerBuilder {
        GomokuServerBuilder::new()
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, GomokuError> {
        Ok(self.transport.local_addr()?)
    }

    /// The room service, for callers that want to act outside a connection.
    pub fn service(&self) -> Arc<RoomService<R, Hub>> {
        Arc::clone(&self.state.service)
    }

    /// Runs the accept loop forever.
    pub async fn run(self) -> Result<(), GomokuError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops the
    /// reaper. Connections already accepted keep running on their tasks.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), GomokuError> {
        let reaper = Reaper::new(Arc::clone(&self.state.service)).spawn();
        tracing::info!(addr = ?self.transport.local_addr().ok(), "gomoku server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
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
                },
            }
        }

        tracing::info!("gomoku server shutting down");
        reaper.shutdown().await;
        Ok(())
    }
}
