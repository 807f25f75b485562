//! slotkv server
//!
//! Entry point: parses the command line, sets up logging, binds the
//! listener and serves until Ctrl+C or SIGTERM.

use anyhow::Context;
use slotkv::config::{Config, Invocation};
use slotkv::server::Server;
use slotkv::storage::{SlotStore, SLOT_CAPACITY, SLOT_COUNT};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn print_help() {
    println!(
        r#"
slotkv - A Tiny TCP Slot Store

USAGE:
    slotkv <PORT> [OPTIONS]

OPTIONS:
    -h, --host <HOST>               Host to bind to (default: 0.0.0.0)
    -t, --idle-timeout <SECS>       Close connections idle this long (default: 0, never)
        --max-line-length <BYTES>   Longest accepted request line (default: 4096)
    -v, --version                   Print version information
        --help                      Print this help message

EXAMPLES:
    slotkv 7000                     # Listen on all interfaces, port 7000
    slotkv 7000 --host 127.0.0.1    # Local connections only
    slotkv 7000 -t 300              # Drop clients idle for 5 minutes

CONNECTING:
    $ slotkv-cli 127.0.0.1 7000
    Send your request: get 0
    Received data = Yarara
"#
    );
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Invocation::Serve(config)) => config,
        Ok(Invocation::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Invocation::Version) => {
            println!("slotkv version {}", slotkv::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("ERROR, {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Create the store (shared across all connections)
    let storage = Arc::new(SlotStore::new());
    info!(
        slots = SLOT_COUNT,
        slot_capacity = SLOT_CAPACITY,
        "Slot store initialized"
    );

    // Bind the TCP listener
    let server = Server::bind(&config, Arc::clone(&storage))
        .await
        .context("server startup failed")?;
    info!(
        "slotkv v{} listening on {}",
        slotkv::VERSION,
        server.local_addr()?
    );

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping server...");
        let _ = shutdown_tx.send(true);
    });

    let stats = server.stats();
    server.run(shutdown_rx).await;

    let store_stats = storage.stats();
    info!(
        connections = stats.connections_accepted.load(std::sync::atomic::Ordering::Relaxed),
        gets = store_stats.gets,
        sets = store_stats.sets,
        rejected = store_stats.rejected,
        "Server shutdown complete"
    );
    Ok(())
}
