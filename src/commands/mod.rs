//! Command Handler Module
//!
//! This module implements the command processing layer for slotkv.
//! It receives parsed commands, executes them against the slot store,
//! and returns the reply for the client.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   SlotStore     │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `get <index>` - Return the slot's raw content
//! - `set <index> <value>` - Overwrite a slot
//! - `q` / `Q` - End the session

pub mod handler;

// Re-export the main command handler
pub use handler::CommandHandler;
