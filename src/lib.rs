//! # slotkv - A Tiny TCP Slot Store
//!
//! slotkv serves a fixed array of short text slots over TCP. Clients speak a
//! newline-delimited text protocol with two commands, `get` and `set`, and
//! leave with `q`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              slotkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │    Line     │    │          SlotStore           │ │
//! │                     │   Parser    │    │  ┌──────┐ ┌──────┐ ┌──────┐  │ │
//! │                     └─────────────┘    │  │Slot 0│ │Slot 1│ │ ...4 │  │ │
//! │                                        │  │RwLock│ │RwLock│ │      │  │ │
//! │                                        │  └──────┘ └──────┘ └──────┘  │ │
//! │                                        └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use slotkv::config::Config;
//! use slotkv::server::Server;
//! use slotkv::storage::SlotStore;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new(7000);
//!     let server = Server::bind(&config, Arc::new(SlotStore::new())).await?;
//!
//!     let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         let _ = shutdown_tx.send(true);
//!     });
//!
//!     server.run(shutdown_rx).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol
//!
//! | Client sends          | Server answers                       |
//! |-----------------------|--------------------------------------|
//! | *(connect)*           | `Connected..\n`                      |
//! | `get <i>`             | raw content of slot `i`              |
//! | `set <i> <value>`     | `Successful change!\n`               |
//! | `q` / `Q`             | the same line echoed, then close     |
//! | anything else         | `Comando no valido\n`                |
//!
//! Bad indices and oversized values get an explicit error line and the
//! connection stays open.
//!
//! ## Module Overview
//!
//! - [`protocol`]: line framing, command grammar, reply messages
//! - [`storage`]: the fixed-size, bounds-checked slot store
//! - [`commands`]: applies commands to the store
//! - [`connection`]: per-client session handling
//! - [`server`]: listener, accept loop and graceful shutdown
//! - [`config`]: command-line configuration
//! - [`client`]: async client used by `slotkv-cli`

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{Config, ConfigError, Invocation};
pub use connection::{handle_connection, ConnectionOptions, ConnectionStats};
pub use protocol::{parse_line, Command, ParseError, Reply};
pub use server::{Server, ServerError};
pub use storage::{SlotStore, StoreError};

/// Version of slotkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
