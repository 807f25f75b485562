//! Storage Module
//!
//! This module provides the shared state of slotkv: a fixed array of
//! fixed-length text slots with bounds-checked, lock-protected access.
//!
//! ## Features
//!
//! - **Fixed Size**: `SLOT_COUNT` slots, never resized
//! - **Bounds Checked**: bad indices and oversized values are errors, not corruption
//! - **Per-Slot RwLock**: readers never observe a half-written value
//!
//! ## Example
//!
//! ```
//! use slotkv::storage::{SlotStore, StoreError};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SlotStore::new());
//!
//! store.set(1, "Gato").unwrap();
//! assert_eq!(store.get(1).unwrap(), "Gato");
//!
//! assert!(matches!(store.get(7), Err(StoreError::OutOfRange { .. })));
//! ```

pub mod engine;

// Re-export commonly used types
pub use engine::{
    validate_value, SlotStore, StoreError, StoreResult, StoreStats, SEED_VALUES, SLOT_CAPACITY,
    SLOT_COUNT,
};
