//! Command Handler
//!
//! Applies parsed [`Command`]s to the shared [`SlotStore`] and produces the
//! [`Reply`] for the client. Store errors never escape this layer: each one
//! becomes a protocol error reply and the connection carries on.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  Command    │───>│  execute()  │───>│   Reply     │      │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘      │
//! │                            │                                │
//! │                            ▼                                │
//! │                        SlotStore                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Command, Reply};
use crate::storage::{SlotStore, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Executes commands against the slot store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The shared store
    storage: Arc<SlotStore>,
}

impl CommandHandler {
    /// Creates a new command handler over the given store.
    pub fn new(storage: Arc<SlotStore>) -> Self {
        Self { storage }
    }

    /// Returns the store this handler writes to.
    pub fn storage(&self) -> &Arc<SlotStore> {
        &self.storage
    }

    /// Executes a command and returns the reply to send.
    pub fn execute(&self, command: Command) -> Reply {
        match command {
            Command::Get { index } => self.cmd_get(index),
            Command::Set { index, value } => self.cmd_set(index, &value),
            Command::Invalid { raw } => {
                debug!(line = %raw, "Invalid command");
                Reply::InvalidCommand
            }
            Command::Quit => Reply::Quit,
        }
    }

    /// GET index
    fn cmd_get(&self, index: usize) -> Reply {
        match self.storage.get(index) {
            Ok(value) => Reply::Value(value),
            Err(e) => error_reply(e),
        }
    }

    /// SET index value
    fn cmd_set(&self, index: usize, value: &str) -> Reply {
        match self.storage.set(index, value) {
            Ok(()) => Reply::Changed,
            Err(e) => error_reply(e),
        }
    }
}

/// Maps a store error to the reply the client sees.
fn error_reply(err: StoreError) -> Reply {
    debug!(error = %err, "Command rejected by store");
    match err {
        StoreError::OutOfRange { .. } => Reply::OutOfRange,
        StoreError::ValueTooLong { .. } => Reply::ValueTooLong,
        StoreError::EmbeddedNul => Reply::InvalidValue,
        // Only produced while seeding, never by get/set
        StoreError::SlotCountMismatch { .. } => Reply::InvalidCommand,
    }
}
