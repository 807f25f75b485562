//! TCP Server
//!
//! Binds the listening socket and runs the accept loop. Every accepted
//! connection gets its own Tokio task running a
//! [`ConnectionHandler`](crate::connection::ConnectionHandler); the loop
//! goes straight back to `accept()` without waiting on it.
//!
//! ## Shutdown
//!
//! The server watches a `tokio::sync::watch` flag. Once it turns `true` the
//! accept loop stops, every handler closes at its next read (a request that
//! is already executing still gets its reply), and [`Server::run`] returns
//! after the last handler has finished.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionOptions, ConnectionStats};
use crate::storage::SlotStore;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// First pause after a failed accept
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(100);

/// Longest pause between accept retries
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// A bound, not yet running, server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    storage: Arc<SlotStore>,
    stats: Arc<ConnectionStats>,
    options: ConnectionOptions,
}

impl Server {
    /// Binds the listening socket described by `config`.
    pub async fn bind(config: &Config, storage: Arc<SlotStore>) -> Result<Self, ServerError> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self::from_listener(listener, storage, config.connection_options()))
    }

    /// Wraps an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        storage: Arc<SlotStore>,
        options: ConnectionOptions,
    ) -> Self {
        Self {
            listener,
            storage,
            stats: Arc::new(ConnectionStats::new()),
            options,
        }
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Connection statistics, shared with every handler.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the accept loop until `shutdown` turns `true`, then waits for
    /// every connection to finish.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let Server {
            listener,
            storage,
            stats,
            options,
        } = self;

        let mut connections = JoinSet::new();
        let mut backoff = ACCEPT_BACKOFF_MIN;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        backoff = ACCEPT_BACKOFF_MIN;
                        let handler = CommandHandler::new(Arc::clone(&storage));
                        connections.spawn(handle_connection(
                            stream,
                            addr,
                            handler,
                            Arc::clone(&stats),
                            options,
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        // Usually fd exhaustion; give handlers a chance to release some
                        error!(
                            error = %e,
                            retry_in_ms = backoff.as_millis() as u64,
                            "Failed to accept connection"
                        );
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(ACCEPT_BACKOFF_MAX);
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!(error = %e, "Connection task failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, no longer accepting connections");
                        break;
                    }
                }
            }
        }

        drop(listener);

        let in_flight = connections.len();
        if in_flight > 0 {
            info!(connections = in_flight, "Waiting for open connections to close");
        }
        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "Connection task failed");
            }
        }

        debug!(
            accepted = stats.connections_accepted.load(Ordering::Relaxed),
            commands = stats.commands_processed.load(Ordering::Relaxed),
            "Connections drained"
        );
    }
}
