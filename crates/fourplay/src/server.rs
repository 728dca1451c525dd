//! `FourplayServer` builder and server loop.
//!
//! This is the entry point for running the broker. It ties together all
//! the layers: transport → protocol → registry → group.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fourplay_protocol::{Codec, JsonCodec, Validation};
use fourplay_session::{Registry, RegistryConfig};
use fourplay_transport::{Transport, WebSocketTransport};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::handler::handle_connection;
use crate::FourplayError;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Codec> {
    /// The token tables. A `std` mutex: every registry operation is
    /// synchronous and the guard is never held across an `.await`.
    registry: Mutex<Registry>,
    pub(crate) codec: C,
    pub(crate) validation: Validation,
    pub(crate) handshake_timeout: Duration,
    /// Flips to `true` when the server stops; handlers then finish up.
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl<C: Codec> ServerState<C> {
    /// Locks the registry. A panic in another task while holding the lock
    /// cannot leave the tables half-updated, so poisoning is ignored.
    pub(crate) fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for configuring and starting a Fourplay server.
///
/// # Example
///
/// ```rust,ignore
/// use fourplay::prelude::*;
///
/// let server = FourplayServerBuilder::new()
///     .bind("0.0.0.0:8001")
///     .registry_config(RegistryConfig {
///         join_policy: JoinPolicy::Shared,
///         ..RegistryConfig::default()
///     })
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct FourplayServerBuilder {
    bind_addr: String,
    registry_config: RegistryConfig,
    validation: Validation,
    handshake_timeout: Duration,
    shutdown_grace: Duration,
}

impl FourplayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8001".to_string(),
            registry_config: RegistryConfig::default(),
            validation: Validation::default(),
            handshake_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the join and eviction policies.
    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Sets how strictly inbound frames are validated.
    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Sets how long a new connection may take to send its `init` frame.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets how long shutdown waits for open connections to finish.
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<FourplayServer<JsonCodec>, FourplayError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(ServerState {
            registry: Mutex::new(Registry::new(self.registry_config)),
            codec: JsonCodec,
            validation: self.validation,
            handshake_timeout: self.handshake_timeout,
            shutdown: shutdown_rx,
        });

        Ok(FourplayServer {
            transport,
            state,
            shutdown_tx,
            shutdown_grace: self.shutdown_grace,
        })
    }
}

impl Default for FourplayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Fourplay server.
///
/// Call [`run`](Self::run) or [`run_until`](Self::run_until) to start
/// accepting connections.
pub struct FourplayServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_grace: Duration,
}

impl<C: Codec> FourplayServer<C> {
    /// Creates a new builder.
    pub fn builder() -> FourplayServerBuilder {
        FourplayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), FourplayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `signal` resolves, then shuts down.
    ///
    /// Shutdown stops accepting, tells every open connection to finish
    /// (each one drains the events already queued for it, runs its
    /// cleanup and closes), and waits up to the shutdown grace period for
    /// that to happen. Connections still open after that are aborted.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), FourplayError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Fourplay server running");

        tokio::pin!(signal);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                () = &mut signal => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tasks.spawn(async move {
                            if let Err(e) = handle_connection(pending, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }

            // Reap finished handlers so the set doesn't grow forever.
            while tasks.try_join_next().is_some() {}
        }

        tracing::info!(open = tasks.len(), "shutting down");
        self.transport.shutdown().await?;
        let _ = self.shutdown_tx.send(true);

        let drained = tokio::time::timeout(self.shutdown_grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                open = tasks.len(),
                "shutdown grace period elapsed, aborting connections"
            );
            tasks.shutdown().await;
        }

        tracing::info!("Fourplay server stopped");
        Ok(())
    }
}
